//! CSV export of the history table.

use anyhow::{Context, Result};
use limbu_core::{DailyRecord, MonthKey};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    id: &'a str,
    date: String,
    lemonade_glasses: u32,
    lemonade_rate: f64,
    lemons_used: f64,
    lemon_price: f64,
    ice_kg: f64,
    ice_price: f64,
    sugar_kg: f64,
    sugar_price: f64,
    snacks: String,
    total_revenue: f64,
    total_cost: f64,
    net_profit: f64,
}

impl<'a> From<&'a DailyRecord> for HistoryRow<'a> {
    fn from(r: &'a DailyRecord) -> Self {
        let snacks = r
            .snacks
            .iter()
            .map(|s| format!("{} x{} @{}/{}", s.name, s.qty, s.buying_price_per_unit, s.price_per_unit))
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            id: &r.id,
            date: r.date.format("%Y-%m-%d").to_string(),
            lemonade_glasses: r.lemonade_glass_qty,
            lemonade_rate: r.lemonade_rate_per_glass,
            lemons_used: r.lemons_used_qty,
            lemon_price: r.lemon_price_per_unit,
            ice_kg: r.ice_used_kg,
            ice_price: r.ice_price_per_kg,
            sugar_kg: r.sugar_used_kg,
            sugar_price: r.sugar_price_per_kg,
            snacks,
            total_revenue: r.total_revenue,
            total_cost: r.total_cost,
            net_profit: r.net_profit,
        }
    }
}

/// Records in history order: newest date first, optionally limited to a month.
pub fn history_rows(records: &[DailyRecord], month: Option<MonthKey>) -> Vec<&DailyRecord> {
    let mut rows: Vec<&DailyRecord> = records
        .iter()
        .filter(|r| month.is_none_or(|m| m.contains(r.date)))
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    rows
}

/// Write history rows as CSV. Returns the number of data rows written.
pub fn write_history_csv<W: Write>(w: W, records: &[DailyRecord], month: Option<MonthKey>) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(w);
    let rows = history_rows(records, month);
    for r in &rows {
        wtr.serialize(HistoryRow::from(*r)).context("write csv row")?;
    }
    wtr.flush().context("flush csv")?;
    Ok(rows.len())
}

pub fn export_history_csv(path: impl AsRef<Path>, records: &[DailyRecord], month: Option<MonthKey>) -> Result<usize> {
    let path = path.as_ref();
    let f = std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    write_history_csv(f, records, month).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use limbu_core::{default_catalog, EntryDefaults, EntryDraft};

    fn record(date: &str, glasses: u32, chocolates: u32) -> DailyRecord {
        let mut d = EntryDraft::new(date.parse().unwrap(), &default_catalog(), EntryDefaults::default());
        d.lemonade_qty = glasses;
        d.snack_mut("Chocolates").unwrap().qty = chocolates;
        d.to_record()
    }

    #[test]
    fn test_csv_newest_first_with_header() {
        let records = vec![record("2024-05-01", 10, 0), record("2024-05-03", 12, 2)];
        let mut buf = Vec::new();
        let n = write_history_csv(&mut buf, &records, None).unwrap();
        assert_eq!(n, 2);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("id,date,lemonade_glasses"));
        assert!(lines[1].contains(",2024-05-03,12,"));
        assert!(lines[1].contains("Chocolates x2 @5/10"));
        assert!(lines[2].contains(",2024-05-01,10,"));
    }

    #[test]
    fn test_csv_month_filter() {
        let records = vec![record("2024-04-30", 1, 0), record("2024-05-01", 2, 0)];
        let mut buf = Vec::new();
        let n = write_history_csv(&mut buf, &records, Some("2024-04".parse().unwrap())).unwrap();
        assert_eq!(n, 1);
        assert!(String::from_utf8(buf).unwrap().contains("2024-04-30"));
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let n = export_history_csv(&path, &[record("2024-05-01", 3, 1)], None).unwrap();
        assert_eq!(n, 1);
        assert!(std::fs::read_to_string(&path).unwrap().contains("2024-05-01"));
    }
}
