//! Black-Scholes Model
//!
//! Closed-form European pricing and Greeks. Serves as the reference oracle
//! for the Monte Carlo pricers: the GBM control variate uses the known mean
//! `E[S_T] = S0 * exp(rT)` and the convergence tests compare against
//! `price()`.
//!
//! Degenerate inputs (`time <= 0` or `vol <= 0`) return the discounted
//! intrinsic value rather than an error, so callers can probe the boundary of
//! the parameter space without branching.

use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

use crate::core::{Greeks, OptionType};

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    let normal = Normal::new(0.0, 1.0).unwrap();
    normal.cdf(x)
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Black-Scholes d1 parameter
pub fn d1(spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
    ((spot / strike).ln() + (rate + 0.5 * vol * vol) * time) / (vol * time.sqrt())
}

/// Black-Scholes d2 parameter
pub fn d2(spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
    d1(spot, strike, rate, vol, time) - vol * time.sqrt()
}

/// Black-Scholes European option price
pub fn price(
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    time: f64,
    option_type: OptionType,
) -> f64 {
    if time <= 0.0 {
        return option_type.intrinsic(spot, strike);
    }
    if vol <= 0.0 {
        // Deterministic forward: discounted intrinsic on the forward
        let disc_strike = strike * (-rate * time).exp();
        return match option_type {
            OptionType::Call => (spot - disc_strike).max(0.0),
            OptionType::Put => (disc_strike - spot).max(0.0),
        };
    }

    let d1 = d1(spot, strike, rate, vol, time);
    let d2 = d2(spot, strike, rate, vol, time);
    let disc_strike = strike * (-rate * time).exp();

    match option_type {
        OptionType::Call => spot * norm_cdf(d1) - disc_strike * norm_cdf(d2),
        OptionType::Put => disc_strike * norm_cdf(-d2) - spot * norm_cdf(-d1),
    }
}

/// Black-Scholes delta
pub fn delta(
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    time: f64,
    option_type: OptionType,
) -> f64 {
    if vol <= 0.0 || time <= 0.0 {
        return match option_type {
            OptionType::Call => {
                if spot > strike {
                    1.0
                } else {
                    0.0
                }
            }
            OptionType::Put => {
                if spot < strike {
                    -1.0
                } else {
                    0.0
                }
            }
        };
    }
    let d1 = d1(spot, strike, rate, vol, time);
    match option_type {
        OptionType::Call => norm_cdf(d1),
        OptionType::Put => norm_cdf(d1) - 1.0,
    }
}

/// Black-Scholes gamma (identical for call and put)
pub fn gamma(spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
    if vol <= 0.0 || time <= 0.0 || spot <= 0.0 {
        return 0.0;
    }
    let d1 = d1(spot, strike, rate, vol, time);
    norm_pdf(d1) / (spot * vol * time.sqrt())
}

/// Black-Scholes vega (per unit vol move)
pub fn vega(spot: f64, strike: f64, rate: f64, vol: f64, time: f64) -> f64 {
    if vol <= 0.0 || time <= 0.0 || spot <= 0.0 {
        return 0.0;
    }
    let d1 = d1(spot, strike, rate, vol, time);
    spot * norm_pdf(d1) * time.sqrt()
}

/// Black-Scholes theta (per year)
pub fn theta(
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    time: f64,
    option_type: OptionType,
) -> f64 {
    if time <= 0.0 {
        return 0.0;
    }
    if vol <= 0.0 {
        return -rate * (-rate * time).exp() * option_type.intrinsic(spot, strike);
    }
    let sqrt_t = time.sqrt();
    let d1 = d1(spot, strike, rate, vol, time);
    let d2 = d1 - vol * sqrt_t;
    let decay = -spot * norm_pdf(d1) * vol / (2.0 * sqrt_t);
    let carry = rate * strike * (-rate * time).exp();
    match option_type {
        OptionType::Call => decay - carry * norm_cdf(d2),
        OptionType::Put => decay + carry * norm_cdf(-d2),
    }
}

/// Black-Scholes rho
pub fn rho(
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    time: f64,
    option_type: OptionType,
) -> f64 {
    if time <= 0.0 {
        return 0.0;
    }
    if vol <= 0.0 {
        return time * (-rate * time).exp() * option_type.intrinsic(spot, strike);
    }
    let d2 = d2(spot, strike, rate, vol, time);
    match option_type {
        OptionType::Call => strike * time * (-rate * time).exp() * norm_cdf(d2),
        OptionType::Put => -strike * time * (-rate * time).exp() * norm_cdf(-d2),
    }
}

/// All first-order Greeks in one call
pub fn greeks(
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    time: f64,
    option_type: OptionType,
) -> Greeks {
    Greeks::new(
        delta(spot, strike, rate, vol, time, option_type),
        gamma(spot, strike, rate, vol, time),
        theta(spot, strike, rate, vol, time, option_type),
        vega(spot, strike, rate, vol, time),
        rho(spot, strike, rate, vol, time, option_type),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_atm_call_reference_value() {
        // Standard textbook case: S=K=100, r=5%, T=1, sigma=20%
        let p = price(100.0, 100.0, 0.05, 0.2, 1.0, OptionType::Call);
        assert_relative_eq!(p, 10.4506, epsilon = 1e-3);
    }

    #[test]
    fn test_put_call_parity() {
        let (s, k, r, vol, t) = (105.0, 100.0, 0.03, 0.25, 0.75);
        let c = price(s, k, r, vol, t, OptionType::Call);
        let p = price(s, k, r, vol, t, OptionType::Put);
        assert_relative_eq!(c - p, s - k * (-r * t).exp(), epsilon = 1e-10);
    }

    #[test]
    fn test_degenerate_inputs() {
        // Expired: intrinsic
        assert_relative_eq!(price(110.0, 100.0, 0.05, 0.2, 0.0, OptionType::Call), 10.0);
        assert_relative_eq!(price(110.0, 100.0, 0.05, 0.2, -1.0, OptionType::Put), 0.0);
        // Zero vol: discounted intrinsic on the forward
        let p = price(100.0, 100.0, 0.05, 0.0, 1.0, OptionType::Call);
        assert_relative_eq!(p, 100.0 - 100.0 * (-0.05f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_delta_bounds() {
        let d_call = delta(100.0, 100.0, 0.05, 0.2, 1.0, OptionType::Call);
        let d_put = delta(100.0, 100.0, 0.05, 0.2, 1.0, OptionType::Put);
        assert!(d_call > 0.0 && d_call < 1.0);
        assert!(d_put > -1.0 && d_put < 0.0);
        // Call/put delta differ by exactly 1
        assert_relative_eq!(d_call - d_put, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vega_positive_and_symmetric() {
        let v = vega(100.0, 100.0, 0.05, 0.2, 1.0);
        assert!(v > 0.0);
        // Vega peaks near the money
        assert!(v > vega(60.0, 100.0, 0.05, 0.2, 1.0));
        assert!(v > vega(160.0, 100.0, 0.05, 0.2, 1.0));
    }

    #[test]
    fn test_greeks_bundle() {
        let g = greeks(100.0, 100.0, 0.05, 0.2, 1.0, OptionType::Call);
        assert!(g.delta > 0.5 && g.delta < 0.7);
        assert!(g.gamma > 0.0);
        assert!(g.theta < 0.0);
        assert!(g.vega > 0.0);
        assert!(g.rho > 0.0);
    }
}
