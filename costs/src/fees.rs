//! Exchange fee tiers.
//!
//! The tier table is immutable once built. The VIP discount is applied to the
//! looked-up rate on every call and is never written back, so repeated calls
//! always return the same fee.

use once_cell::sync::Lazy;
use tracing::warn;

/// Multiplier applied to the selected rate for VIP accounts (10% off).
pub const VIP_DISCOUNT: f64 = 0.90;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeRates {
    pub maker: f64,
    pub taker: f64,
}

impl FeeRates {
    pub const fn new(maker: f64, taker: f64) -> Self {
        Self { maker, taker }
    }

    pub fn rate(&self, is_maker: bool) -> f64 {
        if is_maker { self.maker } else { self.taker }
    }
}

/// Standard OKX-style spot tiers, lowest tier first.
pub static STANDARD_FEE_TIERS: Lazy<FeeTierTable> = Lazy::new(FeeTierTable::standard);

/// Ordered tier name → rates table. The first entry is the lowest tier and
/// doubles as the fallback for unknown names.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeTierTable {
    tiers: Vec<(String, FeeRates)>,
}

impl FeeTierTable {
    /// `None` if `tiers` is empty; a table needs a fallback tier.
    pub fn new(tiers: Vec<(String, FeeRates)>) -> Option<Self> {
        if tiers.is_empty() {
            return None;
        }
        Some(Self { tiers })
    }

    pub fn standard() -> Self {
        let tiers = [
            ("Tier 1", FeeRates::new(0.0008, 0.0010)),
            ("Tier 2", FeeRates::new(0.0006, 0.0008)),
            ("Tier 3", FeeRates::new(0.0005, 0.0007)),
            ("VIP 1", FeeRates::new(0.0004, 0.0006)),
            ("VIP 2", FeeRates::new(0.0003, 0.0005)),
            ("VIP 3", FeeRates::new(0.0002, 0.0004)),
        ];

        Self {
            tiers: tiers
                .into_iter()
                .map(|(name, rates)| (name.to_string(), rates))
                .collect(),
        }
    }

    pub fn default_tier(&self) -> (&str, FeeRates) {
        let (name, rates) = &self.tiers[0];
        (name.as_str(), *rates)
    }

    pub fn get(&self, tier: &str) -> Option<FeeRates> {
        self.tiers
            .iter()
            .find(|(name, _)| name == tier)
            .map(|(_, rates)| *rates)
    }

    pub fn tier_names(&self) -> impl Iterator<Item = &str> {
        self.tiers.iter().map(|(name, _)| name.as_str())
    }

    /// Rates for `tier`, falling back (with a warning) to the lowest tier.
    pub fn resolve(&self, tier: &str) -> (&str, FeeRates) {
        if let Some((name, rates)) = self.tiers.iter().find(|(name, _)| name == tier) {
            return (name.as_str(), *rates);
        }

        let (fallback, rates) = self.default_tier();
        warn!(
            requested = %tier,
            fallback = %fallback,
            "unknown fee tier; using lowest tier"
        );
        (fallback, rates)
    }

    /// Effective rate after the optional VIP discount.
    pub fn fee_rate(&self, tier: &str, is_maker: bool, is_vip: bool) -> f64 {
        let (_, rates) = self.resolve(tier);
        let base = rates.rate(is_maker);
        if is_vip { base * VIP_DISCOUNT } else { base }
    }

    pub fn fee(&self, quantity_usd: f64, tier: &str, is_maker: bool, is_vip: bool) -> f64 {
        quantity_usd * self.fee_rate(tier, is_maker, is_vip)
    }
}

/// Fee in USD for `quantity_usd` on the standard tier table.
pub fn calculate_fees(quantity_usd: f64, tier: &str, is_maker: bool, is_vip: bool) -> f64 {
    STANDARD_FEE_TIERS.fee(quantity_usd, tier, is_maker, is_vip)
}

/// VIP status is carried in the tier name (`"VIP 1"`, `"VIP 2"`, ...).
pub fn is_vip_tier(tier: &str) -> bool {
    tier.trim_start().starts_with("VIP")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn vip_maker_fee_is_discounted() {
        let fee = calculate_fees(1000.0, "VIP 1", true, true);
        assert!(close(fee, 1000.0 * 0.0004 * 0.90));
        assert!(close(fee, 0.36));
    }

    #[test]
    fn repeated_vip_calls_do_not_compound() {
        let first = calculate_fees(1000.0, "VIP 1", true, true);
        let second = calculate_fees(1000.0, "VIP 1", true, true);
        let third = calculate_fees(1000.0, "VIP 1", false, true);

        assert_eq!(first, second);
        assert!(close(third, 1000.0 * 0.0006 * 0.90));
        assert_eq!(STANDARD_FEE_TIERS.get("VIP 1"), Some(FeeRates::new(0.0004, 0.0006)));
    }

    #[test]
    fn non_vip_uses_base_rate() {
        assert!(close(calculate_fees(1000.0, "Tier 2", true, false), 0.6));
        assert!(close(calculate_fees(1000.0, "Tier 2", false, false), 0.8));
    }

    #[traced_test]
    #[test]
    fn unknown_tier_falls_back_to_lowest_and_warns() {
        let fee = calculate_fees(1000.0, "NonexistentTier", false, false);

        assert!(close(fee, 1.0));
        assert!(logs_contain("unknown fee tier"));
        assert!(logs_contain("NonexistentTier"));
    }

    #[traced_test]
    #[test]
    fn known_tier_does_not_warn() {
        calculate_fees(500.0, "Tier 3", false, false);
        assert!(!logs_contain("unknown fee tier"));
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(FeeTierTable::new(vec![]).is_none());
    }

    #[test]
    fn custom_table_falls_back_to_its_first_entry() {
        let t = FeeTierTable::new(vec![
            ("Base".into(), FeeRates::new(0.001, 0.002)),
            ("Pro".into(), FeeRates::new(0.0005, 0.001)),
        ])
        .unwrap();

        assert_eq!(t.resolve("Gold").0, "Base");
        assert!(close(t.fee(100.0, "Gold", false, false), 0.2));
        assert_eq!(t.tier_names().collect::<Vec<_>>(), vec!["Base", "Pro"]);
    }

    #[test]
    fn vip_detection_reads_tier_name() {
        assert!(is_vip_tier("VIP 1"));
        assert!(is_vip_tier("VIP 3"));
        assert!(!is_vip_tier("Tier 1"));
        assert!(!is_vip_tier("Regular"));
    }
}
