//! GBM Monte Carlo pricer
//!
//! Prices a European option under constant-volatility geometric Brownian
//! motion by simulating the terminal spot directly:
//!
//! S_T = S0 * exp((r - σ²/2) T + σ √T Z)
//!
//! Variance reduction: antithetic pairing (average the payoffs of Z and -Z),
//! a control variate with known mean E[S_T] = S0 e^{rT} and a regression beta
//! estimated from a bounded pre-pass, and quasi-Monte Carlo draws from the
//! shifted Halton sequence. Greeks: pathwise delta and likelihood-ratio vega.
//!
//! Every variate is keyed by (seed, path index), so paths are simulated in
//! parallel over fixed-size blocks and reduced in block order; the result is
//! bit-identical for a given (seed, num_paths) regardless of thread count.

use rayon::prelude::*;

use crate::core::{McResult, OptionType, PricerError, PricerResult};
use crate::models::black_scholes;
use crate::rng::{box_muller, normal_pair_at, uniform_pair_at};

/// Paths per parallel work item. The reduction walks blocks in index order,
/// keeping the accumulation independent of the thread count.
const BLOCK_SIZE: usize = 8192;

/// Pre-pass cap for the control-variate regression beta.
const CV_PREPASS_CAP: usize = 200_000;

/// Salt separating the beta pre-pass stream from the main pricing stream.
const CV_PREPASS_SALT: u64 = 0x9d8f_3a2b_71c4_e605;

/// GBM Monte Carlo configuration
#[derive(Debug, Clone, Copy)]
pub struct GbmConfig {
    pub spot: f64,
    pub strike: f64,
    pub rate: f64,
    pub time: f64,
    pub vol: f64,
    pub num_paths: usize,
    pub option_type: OptionType,
    pub seed: u64,
    /// Average each payoff with its antithetic (-Z) counterpart
    pub antithetic: bool,
    /// Subtract beta * (S_T - E[S_T]) from each payoff
    pub control_variate: bool,
    /// Draw Z from the shifted Halton sequence instead of the hash stream
    pub use_qmc: bool,
    /// Estimate the regression beta from a bounded pre-pass
    pub two_pass_cv: bool,
    /// Accumulate pathwise delta and likelihood-ratio vega
    pub compute_greeks: bool,
}

impl GbmConfig {
    pub fn new(
        spot: f64,
        strike: f64,
        rate: f64,
        time: f64,
        vol: f64,
        num_paths: usize,
        option_type: OptionType,
    ) -> Self {
        Self {
            spot,
            strike,
            rate,
            time,
            vol,
            num_paths,
            option_type,
            seed: 12345,
            antithetic: true,
            control_variate: true,
            use_qmc: false,
            two_pass_cv: true,
            compute_greeks: true,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Standard normal draw for path `i`, derived purely from `seed`.
    fn draw(&self, seed: u64, i: u64) -> f64 {
        if self.use_qmc {
            let (u1, u2) = uniform_pair_at(seed, i);
            box_muller(u1, u2).0
        } else {
            normal_pair_at(seed, i, 0).0
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct GbmAccum {
    sum: f64,
    sum_sq: f64,
    delta: f64,
    delta_sq: f64,
    vega: f64,
    vega_sq: f64,
}

impl GbmAccum {
    fn merge(mut self, other: GbmAccum) -> GbmAccum {
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.delta += other.delta;
        self.delta_sq += other.delta_sq;
        self.vega += other.vega;
        self.vega_sq += other.vega_sq;
        self
    }
}

/// Price a European option under GBM.
///
/// Degenerate inputs fall back instead of failing: zero paths produce a zero
/// result, and non-positive time or volatility return the deterministic
/// (analytic) value with zero standard error. A NaN aggregate is surfaced as
/// [`PricerError::Numerical`].
pub fn price_gbm(cfg: &GbmConfig) -> PricerResult<McResult> {
    if cfg.num_paths == 0 {
        return Ok(McResult {
            seed: cfg.seed,
            num_steps: 1,
            ..Default::default()
        });
    }
    if cfg.time <= 0.0 || cfg.vol <= 0.0 {
        // Deterministic payoff; the analytic pricer covers both limits.
        return Ok(McResult {
            price: black_scholes::price(
                cfg.spot,
                cfg.strike,
                cfg.rate,
                cfg.vol,
                cfg.time,
                cfg.option_type,
            ),
            num_paths: cfg.num_paths,
            num_steps: 1,
            seed: cfg.seed,
            ..Default::default()
        });
    }

    let drift = (cfg.rate - 0.5 * cfg.vol * cfg.vol) * cfg.time;
    let vol_sqrt_t = cfg.vol * cfg.time.sqrt();
    let sqrt_t = cfg.time.sqrt();
    let expected_st = cfg.spot * (cfg.rate * cfg.time).exp();

    let payoff = |st: f64| cfg.option_type.intrinsic(st, cfg.strike);

    // Regression beta for the control variate, from a bounded pre-pass on a
    // salted stream independent of the main-pass draws (X = payoff, Y = S_T).
    let mut beta = 0.0;
    if cfg.control_variate && cfg.two_pass_cv {
        let n_pre = cfg.num_paths.min(CV_PREPASS_CAP);
        let (mut sum_x, mut sum_y, mut sum_xy, mut sum_yy) = (0.0, 0.0, 0.0, 0.0);
        for i in 0..n_pre {
            let z = cfg.draw(cfg.seed ^ CV_PREPASS_SALT, i as u64);
            let st = cfg.spot * (drift + vol_sqrt_t * z).exp();
            let x = payoff(st);
            sum_x += x;
            sum_y += st;
            sum_xy += x * st;
            sum_yy += st * st;
        }
        let n = n_pre as f64;
        let cov_xy = sum_xy / n - (sum_x / n) * (sum_y / n);
        let var_y = sum_yy / n - (sum_y / n) * (sum_y / n);
        if var_y > 1e-14 {
            beta = cov_xy / var_y;
        }
    }

    let num_blocks = cfg.num_paths.div_ceil(BLOCK_SIZE);
    let partials: Vec<GbmAccum> = (0..num_blocks)
        .into_par_iter()
        .map(|block| {
            let start = block * BLOCK_SIZE;
            let end = (start + BLOCK_SIZE).min(cfg.num_paths);
            let mut acc = GbmAccum::default();
            for i in start..end {
                let z = cfg.draw(cfg.seed, i as u64);
                let st = cfg.spot * (drift + vol_sqrt_t * z).exp();
                let mut p = payoff(st);
                if cfg.antithetic {
                    let st_anti = cfg.spot * (drift - vol_sqrt_t * z).exp();
                    p = 0.5 * (p + payoff(st_anti));
                }
                if cfg.control_variate {
                    p -= beta * (st - expected_st);
                }
                acc.sum += p;
                acc.sum_sq += p * p;

                if cfg.compute_greeks {
                    // Pathwise delta: dPayoff/dS0 = S_T/S0 when exercised
                    let d = match cfg.option_type {
                        OptionType::Call if st > cfg.strike => st / cfg.spot,
                        OptionType::Put if st < cfg.strike => -(st / cfg.spot),
                        _ => 0.0,
                    };
                    // Likelihood-ratio vega: payoff times the σ-derivative of
                    // the log terminal density, (Z² - 1)/σ - Z√T
                    let score = (z * z - 1.0) / cfg.vol - z * sqrt_t;
                    let v = payoff(st) * score;
                    acc.delta += d;
                    acc.delta_sq += d * d;
                    acc.vega += v;
                    acc.vega_sq += v * v;
                }
            }
            acc
        })
        .collect();
    let acc = partials.into_iter().fold(GbmAccum::default(), GbmAccum::merge);

    let n = cfg.num_paths as f64;
    let disc = (-cfg.rate * cfg.time).exp();
    let mean_payoff = acc.sum / n;
    let var_payoff = (acc.sum_sq / n - mean_payoff * mean_payoff).max(0.0);

    let mut result = McResult {
        price: disc * mean_payoff,
        std_error: disc * (var_payoff / n).sqrt(),
        num_paths: cfg.num_paths,
        num_steps: 1,
        seed: cfg.seed,
        ..Default::default()
    };
    if cfg.compute_greeks {
        let mean_d = acc.delta / n;
        let var_d = (acc.delta_sq / n - mean_d * mean_d).max(0.0);
        let mean_v = acc.vega / n;
        let var_v = (acc.vega_sq / n - mean_v * mean_v).max(0.0);
        result.delta = Some(disc * mean_d);
        result.delta_se = Some(disc * (var_d / n).sqrt());
        result.vega = Some(disc * mean_v);
        result.vega_se = Some(disc * (var_v / n).sqrt());
    }

    if !result.price.is_finite() || !result.std_error.is_finite() {
        return Err(PricerError::numerical(format!(
            "GBM aggregate is not finite: price={} std_error={}",
            result.price, result.std_error
        )));
    }
    Ok(result)
}
