//! Tabular export of the metrics history.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::types::MetricsRecord;

pub const CSV_HEADER: [&str; 7] = [
    "Timestamp",
    "Slippage",
    "Impact",
    "Fees",
    "Net Cost",
    "Latency (ms)",
    "Order Role",
];

/// Written in the role column when no classifier produced one.
pub const ROLE_UNAVAILABLE: &str = "Unavailable";

pub fn write_csv<W: Write>(mut out: W, records: &[MetricsRecord]) -> io::Result<()> {
    writeln!(out, "{}", CSV_HEADER.join(","))?;

    for r in records {
        let role = r
            .role
            .map(|role| role.to_string())
            .unwrap_or_else(|| ROLE_UNAVAILABLE.to_string());

        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            escape(&r.timestamp),
            r.slippage_usd,
            r.impact_usd,
            r.fee_usd,
            r.net_cost_usd,
            r.latency_ms(),
            role
        )?;
    }
    out.flush()
}

pub fn to_csv(records: &[MetricsRecord]) -> String {
    let mut buf = Vec::new();
    // Vec<u8> writes are infallible
    let _ = write_csv(&mut buf, records);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Write `records` to `path`, replacing any existing file.
pub fn export_csv(path: impl AsRef<Path>, records: &[MetricsRecord]) -> io::Result<()> {
    let file = File::create(path)?;
    write_csv(BufWriter::new(file), records)
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use costs::OrderRole;

    fn rec(ts: &str, role: Option<OrderRole>) -> MetricsRecord {
        MetricsRecord {
            timestamp: ts.into(),
            ts_ms: 0,
            slippage_usd: 0.5,
            impact_usd: 0.25,
            fee_usd: 1.0,
            net_cost_usd: 1.75,
            latency_secs: 0.5,
            role,
        }
    }

    #[test]
    fn header_only_for_empty_history() {
        assert_eq!(
            to_csv(&[]),
            "Timestamp,Slippage,Impact,Fees,Net Cost,Latency (ms),Order Role\n"
        );
    }

    #[test]
    fn rows_carry_latency_in_ms_and_role() {
        let csv = to_csv(&[rec("1700", Some(OrderRole::Taker)), rec("1701", None)]);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "1700,0.5,0.25,1,1.75,500,Taker");
        assert_eq!(lines[2], "1701,0.5,0.25,1,1.75,500,Unavailable");
    }

    #[test]
    fn awkward_timestamps_are_quoted() {
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("17\r00"), "\"17\r00\"");
        assert_eq!(escape("1700"), "1700");
    }
}
