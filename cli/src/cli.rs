use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use pipeline::TickParams;

pub const MIN_QUANTITY_USD: f64 = 10.0;
pub const MAX_QUANTITY_USD: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FeeTierCli {
    Regular,
    Vip1,
    Vip2,
    Vip3,
}

impl FeeTierCli {
    /// Name of the tier in the fee table.
    pub fn tier_name(self) -> &'static str {
        match self {
            FeeTierCli::Regular => "Tier 1",
            FeeTierCli::Vip1 => "VIP 1",
            FeeTierCli::Vip2 => "VIP 2",
            FeeTierCli::Vip3 => "VIP 3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleCli {
    Maker,
    Taker,
}

#[derive(Debug, Parser)]
#[clap(name = "tradesim", version)]
pub struct Cli {
    /// Instrument to stream, e.g. BTC-USDT, ETH-USDT, SOL-USDT
    #[clap(long, env = "INST_ID", default_value = "BTC-USDT")]
    pub inst: String,

    /// Order size in USD (10 - 10000)
    #[clap(long, default_value = "100", value_parser = parse_quantity)]
    pub quantity: f64,

    /// Volatility estimate in [0, 1]
    #[clap(long, default_value = "0.05", value_parser = parse_volatility)]
    pub volatility: f64,

    #[clap(long, value_enum, default_value_t = FeeTierCli::Regular)]
    pub fee_tier: FeeTierCli,

    /// Role assumed for the fee calculation
    #[clap(long, value_enum, default_value_t = RoleCli::Taker)]
    pub role: RoleCli,

    /// Milliseconds between metric ticks
    #[clap(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_ms: u64,

    /// Write the metrics history as CSV here on shutdown
    #[clap(long)]
    pub export: Option<PathBuf>,
}

impl Cli {
    pub fn tick_params(&self) -> TickParams {
        TickParams {
            quantity_usd: self.quantity,
            volatility: self.volatility,
            fee_tier: self.fee_tier.tier_name().to_string(),
            is_maker: self.role == RoleCli::Maker,
        }
    }
}

fn parse_quantity(s: &str) -> Result<f64, String> {
    let q: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if !(MIN_QUANTITY_USD..=MAX_QUANTITY_USD).contains(&q) {
        return Err(format!(
            "quantity must be between {MIN_QUANTITY_USD} and {MAX_QUANTITY_USD} USD"
        ));
    }
    Ok(q)
}

fn parse_volatility(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if !(0.0..=1.0).contains(&v) {
        return Err("volatility must be between 0 and 1".to_string());
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("tradesim").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]).unwrap();
        let p = cli.tick_params();

        assert_eq!(p.quantity_usd, 100.0);
        assert_eq!(p.volatility, 0.05);
        assert_eq!(p.fee_tier, "Tier 1");
        assert!(!p.is_maker);
        assert!(!p.is_vip());
        assert!(cli.export.is_none());
    }

    #[test]
    fn vip_tier_and_maker_role() {
        let cli = parse(&["--fee-tier", "vip2", "--role", "maker", "--quantity", "2500"]).unwrap();
        let p = cli.tick_params();

        assert_eq!(p.fee_tier, "VIP 2");
        assert!(p.is_vip());
        assert!(p.is_maker);
        assert_eq!(p.quantity_usd, 2500.0);
    }

    #[test]
    fn out_of_range_inputs_are_rejected() {
        assert!(parse(&["--quantity", "5"]).is_err());
        assert!(parse(&["--quantity", "10001"]).is_err());
        assert!(parse(&["--volatility", "1.5"]).is_err());
        assert!(parse(&["--refresh-ms", "0"]).is_err());
        assert!(parse(&["--fee-tier", "gold"]).is_err());
    }
}
