//! Market impact (simplified discrete-time Almgren–Chriss).
//!
//! ```text
//! impact_usd = lambda * (quantity_usd / volume)^2 * volatility * quantity_usd
//! ```

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactParams {
    /// Reference market volume in USD.
    pub volume: f64,
    /// Risk-aversion / impact coefficient.
    pub lambda: f64,
}

impl Default for ImpactParams {
    fn default() -> Self {
        Self {
            volume: 1e6,
            lambda: 0.01,
        }
    }
}

pub fn estimate_market_impact(quantity_usd: f64, volatility: f64, params: &ImpactParams) -> f64 {
    let participation = quantity_usd / params.volume;
    params.lambda * participation.powi(2) * volatility * quantity_usd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_closed_form() {
        // 0.01 * (1e5 / 1e6)^2 * 0.5 * 1e5 = 0.01 * 0.01 * 0.5 * 1e5 = 5
        let i = estimate_market_impact(100_000.0, 0.5, &ImpactParams::default());
        assert!((i - 5.0).abs() < 1e-9);
    }

    #[test]
    fn zero_inputs_have_zero_impact() {
        let p = ImpactParams::default();
        assert_eq!(estimate_market_impact(0.0, 0.3, &p), 0.0);
        assert_eq!(estimate_market_impact(1_000.0, 0.0, &p), 0.0);
    }

    #[test]
    fn grows_cubically_in_size() {
        let p = ImpactParams::default();
        let a = estimate_market_impact(1_000.0, 0.1, &p);
        let b = estimate_market_impact(2_000.0, 0.1, &p);

        assert!((b / a - 8.0).abs() < 1e-9);
    }
}
