//! Slippage estimate.
//!
//! A spread-proportional heuristic:
//!
//! ```text
//! spread           = |avg_ask - avg_bid|
//! liquidity_factor = min(market_depth / (quantity_usd / 1000), 1)
//! slippage_usd     = slippage_factor * liquidity_factor * spread * (quantity_usd / 1000)
//! ```
//!
//! Orders too small to register (`quantity_usd / 1000` at or below
//! `f64::EPSILON`) get the clamp value `liquidity_factor = 1` instead of a
//! division by zero.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlippageParams {
    /// Number of book levels assumed to absorb the order.
    pub market_depth: f64,
    pub slippage_factor: f64,
}

impl Default for SlippageParams {
    fn default() -> Self {
        Self {
            market_depth: 10.0,
            slippage_factor: 0.0005,
        }
    }
}

/// Fraction of the order assumed to find liquidity, in `[0, 1]`.
pub fn liquidity_factor(quantity_usd: f64, market_depth: f64) -> f64 {
    let size_k = quantity_usd / 1000.0;
    if size_k <= f64::EPSILON {
        return 1.0;
    }
    (market_depth / size_k).min(1.0)
}

/// Expected slippage in USD for a market order of `quantity_usd`.
pub fn estimate_slippage(
    quantity_usd: f64,
    avg_ask: f64,
    avg_bid: f64,
    params: &SlippageParams,
) -> f64 {
    let spread = (avg_ask - avg_bid).abs();
    let lf = liquidity_factor(quantity_usd, params.market_depth);

    params.slippage_factor * lf * spread * (quantity_usd / 1000.0)
}
