//! Monthly rollups for the dashboard.
//!
//! Everything here is a pure function of (records, month): filter by month,
//! build the per-day series, fold snack lines per item, sum the series.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::month::MonthKey;
use crate::record::DailyRecord;

/// One bar in the per-day chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayPoint {
    /// Day of month (1..=31)
    pub day: u32,
    pub date: NaiveDate,
    pub revenue: f64,
    pub profit: f64,
    pub cost: f64,
    pub lemonade_qty: u32,
}

/// Month-to-date totals for one snack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnackRollup {
    pub name: String,
    pub qty: u64,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
}

impl SnackRollup {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            qty: 0,
            revenue: 0.0,
            cost: 0.0,
            profit: 0.0,
        }
    }

    /// Profit as a share of revenue, if anything was sold
    pub fn margin(&self) -> Option<f64> {
        (self.revenue != 0.0).then(|| self.profit / self.revenue)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub month: MonthKey,
    pub days: Vec<DayPoint>,
    pub snacks: Vec<SnackRollup>,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
}

impl MonthlyReport {
    /// False when no record fell in the month. A month of all-zero records
    /// still has data.
    pub fn has_data(&self) -> bool {
        !self.days.is_empty()
    }

    pub fn lemonade_glasses(&self) -> u64 {
        self.days.iter().map(|d| d.lemonade_qty as u64).sum()
    }

    /// Snack rollups ordered by profit, best first
    pub fn snacks_by_profit(&self) -> Vec<&SnackRollup> {
        let mut v: Vec<&SnackRollup> = self.snacks.iter().collect();
        v.sort_by(|a, b| b.profit.total_cmp(&a.profit));
        v
    }
}

/// Records dated in `month`, in input order.
pub fn filter_month(records: &[DailyRecord], month: MonthKey) -> Vec<&DailyRecord> {
    records.iter().filter(|r| month.contains(r.date)).collect()
}

/// Per-day series for `month`, ascending by date. Same-date duplicates keep
/// their input order.
pub fn daily_series(records: &[DailyRecord], month: MonthKey) -> Vec<DayPoint> {
    let mut in_month = filter_month(records, month);
    in_month.sort_by_key(|r| r.date);

    in_month
        .into_iter()
        .map(|r| DayPoint {
            day: r.date.day(),
            date: r.date,
            revenue: r.total_revenue,
            profit: r.net_profit,
            cost: r.total_cost,
            lemonade_qty: r.lemonade_glass_qty,
        })
        .collect()
}

/// Fold every snack line sold in `month` into one rollup per name, in order of
/// first appearance.
pub fn snack_rollups(records: &[DailyRecord], month: MonthKey) -> Vec<SnackRollup> {
    let mut out: Vec<SnackRollup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in filter_month(records, month) {
        for snack in &record.snacks {
            let i = *index.entry(snack.name.clone()).or_insert_with(|| {
                out.push(SnackRollup::empty(&snack.name));
                out.len() - 1
            });

            let revenue = snack.revenue();
            let cost = snack.cost();
            let acc = &mut out[i];
            acc.qty += snack.qty as u64;
            acc.revenue += revenue;
            acc.cost += cost;
            acc.profit += revenue - cost;
        }
    }

    out
}

pub fn aggregate_month(records: &[DailyRecord], month: MonthKey) -> MonthlyReport {
    let days = daily_series(records, month);
    let snacks = snack_rollups(records, month);

    let total_revenue = days.iter().map(|d| d.revenue).sum();
    let total_cost = days.iter().map(|d| d.cost).sum();
    let total_profit = days.iter().map(|d| d.profit).sum();

    MonthlyReport {
        month,
        days,
        snacks,
        total_revenue,
        total_cost,
        total_profit,
    }
}

/// Distinct months that have at least one record, newest first.
pub fn months_with_data(records: &[DailyRecord]) -> Vec<MonthKey> {
    let mut months: Vec<MonthKey> = records.iter().map(|r| MonthKey::of(r.date)).collect();
    months.sort_unstable_by(|a, b| b.cmp(a));
    months.dedup();
    months
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Financials, SnackItem};

    fn record(id: &str, date: &str, glasses: u32, snacks: Vec<SnackItem>) -> DailyRecord {
        let mut r = DailyRecord {
            id: id.to_string(),
            date: date.parse().unwrap(),
            lemonade_glass_qty: glasses,
            lemonade_rate_per_glass: 20.0,
            lemons_used_qty: glasses as f64 / 2.0,
            lemon_price_per_unit: 5.0,
            ice_used_kg: 1.0,
            ice_price_per_kg: 20.0,
            sugar_used_kg: 0.0,
            sugar_price_per_kg: 40.0,
            snacks,
            total_revenue: 0.0,
            total_cost: 0.0,
            net_profit: 0.0,
        };
        let f = r.compute_financials();
        r.apply_financials(f);
        r
    }

    fn may() -> MonthKey {
        "2024-05".parse().unwrap()
    }

    #[test]
    fn test_filter_only_selected_month() {
        let records = vec![
            record("a", "2024-05-03", 10, vec![]),
            record("b", "2024-04-30", 10, vec![]),
            record("c", "2024-05-01", 10, vec![]),
            record("d", "2025-05-01", 10, vec![]),
        ];
        let ids: Vec<&str> = filter_month(&records, may()).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_series_sorted_ascending_and_stable() {
        let records = vec![
            record("late", "2024-05-20", 5, vec![]),
            record("dup-1", "2024-05-02", 1, vec![]),
            record("early", "2024-05-01", 3, vec![]),
            record("dup-2", "2024-05-02", 2, vec![]),
        ];
        let series = daily_series(&records, may());
        let days: Vec<u32> = series.iter().map(|d| d.day).collect();
        assert_eq!(days, vec![1, 2, 2, 20]);
        assert_eq!(series[1].lemonade_qty, 1);
        assert_eq!(series[2].lemonade_qty, 2);
    }

    #[test]
    fn test_series_independent_of_input_order() {
        let mut records = vec![
            record("a", "2024-05-09", 4, vec![]),
            record("b", "2024-05-01", 7, vec![]),
            record("c", "2024-05-15", 2, vec![]),
        ];
        let forward = daily_series(&records, may());
        records.reverse();
        assert_eq!(daily_series(&records, may()), forward);
    }

    #[test]
    fn test_snack_rollup_sums_across_days() {
        let item = || vec![SnackItem::new("ItemA", 3, 2.0, 5.0)];
        let records = vec![
            record("a", "2024-05-01", 0, item()),
            record("b", "2024-05-02", 0, item()),
        ];
        let rollups = snack_rollups(&records, may());
        assert_eq!(rollups.len(), 1);
        let a = &rollups[0];
        assert_eq!(a.qty, 6);
        assert_eq!(a.revenue, 30.0);
        assert_eq!(a.cost, 12.0);
        assert_eq!(a.profit, 18.0);
    }

    #[test]
    fn test_snack_rollup_first_appearance_order() {
        let records = vec![
            record("a", "2024-05-02", 0, vec![SnackItem::new("Gutkha", 1, 1.0, 2.0)]),
            record(
                "b",
                "2024-05-01",
                0,
                vec![
                    SnackItem::new("Chocolates", 2, 5.0, 10.0),
                    SnackItem::new("Gutkha", 1, 1.0, 2.0),
                ],
            ),
        ];
        let names: Vec<String> = snack_rollups(&records, may()).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Gutkha", "Chocolates"]);
    }

    #[test]
    fn test_totals_sum_series() {
        let records = vec![
            record("a", "2024-05-01", 10, vec![]),
            record("b", "2024-05-02", 20, vec![SnackItem::new("Chocolates", 2, 5.0, 10.0)]),
            record("other", "2024-06-01", 99, vec![]),
        ];
        let report = aggregate_month(&records, may());
        assert_eq!(report.total_revenue, 200.0 + 420.0);
        assert_eq!(report.total_cost, (25.0 + 20.0) + (50.0 + 20.0 + 10.0));
        assert_eq!(report.total_profit, report.total_revenue - report.total_cost);
        assert_eq!(report.lemonade_glasses(), 30);
    }

    #[test]
    fn test_empty_month_differs_from_zero_month() {
        let zero = vec![record("z", "2024-05-01", 0, vec![])];
        let mut zero_record = zero[0].clone();
        zero_record.ice_used_kg = 0.0;
        zero_record.apply_financials(Financials::default());

        let empty = aggregate_month(&[], may());
        assert!(!empty.has_data());
        assert_eq!(empty.total_revenue, 0.0);
        assert_eq!(empty.total_cost, 0.0);
        assert_eq!(empty.total_profit, 0.0);
        assert!(empty.days.is_empty());
        assert!(empty.snacks.is_empty());

        let zeroed = aggregate_month(&[zero_record], may());
        assert!(zeroed.has_data());
        assert_eq!(zeroed.total_profit, 0.0);
    }

    #[test]
    fn test_months_with_data_newest_first() {
        let records = vec![
            record("a", "2024-04-03", 1, vec![]),
            record("b", "2024-05-01", 1, vec![]),
            record("c", "2024-04-09", 1, vec![]),
        ];
        let months: Vec<String> = months_with_data(&records).iter().map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2024-05", "2024-04"]);
    }

    #[test]
    fn test_snacks_by_profit() {
        let records = vec![record(
            "a",
            "2024-05-01",
            0,
            vec![
                SnackItem::new("Gutkha", 10, 1.0, 2.0),
                SnackItem::new("Chocolates", 2, 5.0, 30.0),
            ],
        )];
        let report = aggregate_month(&records, may());
        let best = report.snacks_by_profit();
        assert_eq!(best[0].name, "Chocolates");
        assert_eq!(best[0].margin(), Some(50.0 / 60.0));
    }
}
