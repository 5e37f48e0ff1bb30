//! Plain-text rendering of the dashboard, history and entry summary.

use limbu_core::{DailyRecord, EntryDraft, Financials, MonthlyReport};
use limbu_ledger::history_rows;
use std::fmt::Write;

const BAR_WIDTH: usize = 30;

/// `₹1040`, `₹12.50`, `-₹40`
pub fn money(v: f64, currency: &str) -> String {
    let sign = if v < 0.0 { "-" } else { "" };
    let a = v.abs();
    if a.fract() == 0.0 {
        format!("{sign}{currency}{a:.0}")
    } else {
        format!("{sign}{currency}{a:.2}")
    }
}

/// Quantity without a trailing `.0`
pub fn qty(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v}")
    }
}

fn bar(value: f64, max: f64, glyph: char) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let n = ((value / max) * BAR_WIDTH as f64).round() as usize;
    std::iter::repeat_n(glyph, n.max(1)).collect()
}

pub fn render_dashboard(report: &MonthlyReport, currency: &str) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "# Monthly Overview: {}\n", report.month.label());

    let _ = writeln!(s, "Net Sales:  {}", money(report.total_revenue, currency));
    let _ = writeln!(s, "Total Cost: {}", money(report.total_cost, currency));
    let _ = writeln!(s, "Net Profit: {}", money(report.total_profit, currency));
    let _ = writeln!(s, "Lemonade:   {} glasses\n", report.lemonade_glasses());

    let _ = writeln!(s, "## Daily sales vs profit\n");
    if !report.has_data() {
        let _ = writeln!(s, "No data for selected month.\n");
    } else {
        let max = report
            .days
            .iter()
            .map(|d| d.revenue.max(d.profit))
            .fold(0.0_f64, f64::max);
        for d in &report.days {
            let _ = writeln!(
                s,
                "Day {:>2} | sales  {:<width$} {}",
                d.day,
                bar(d.revenue, max, '█'),
                money(d.revenue, currency),
                width = BAR_WIDTH
            );
            let _ = writeln!(
                s,
                "       | profit {:<width$} {}",
                bar(d.profit, max, '▒'),
                money(d.profit, currency),
                width = BAR_WIDTH
            );
        }
        let _ = writeln!(s);
    }

    let _ = writeln!(s, "## Snack performance\n");
    if report.snacks.is_empty() {
        let _ = writeln!(s, "No snack sales this month.");
    } else {
        let _ = writeln!(
            s,
            "{:<16} {:>5} {:>10} {:>10} {:>10}",
            "Item", "Qty", "Revenue", "Cost", "Profit"
        );
        for r in report.snacks_by_profit() {
            let _ = writeln!(
                s,
                "{:<16} {:>5} {:>10} {:>10} {:>10}",
                r.name,
                r.qty,
                money(r.revenue, currency),
                money(r.cost, currency),
                money(r.profit, currency)
            );
        }
    }

    s
}

fn snack_summary(r: &DailyRecord) -> String {
    if r.snacks.is_empty() {
        return "No Snacks".to_string();
    }
    r.snacks
        .iter()
        .map(|s| format!("{} x{}", s.name, s.qty))
        .collect::<Vec<_>>()
        .join(", ")
}

fn ingredient_summary(r: &DailyRecord, currency: &str) -> String {
    let mut parts = vec![
        format!("Lemons {} pcs ({})", qty(r.lemons_used_qty), money(r.lemon_price_per_unit, currency)),
        format!("Ice {} kg ({})", qty(r.ice_used_kg), money(r.ice_price_per_kg, currency)),
    ];
    if r.sugar_used_kg != 0.0 {
        parts.push(format!(
            "Sugar {} kg ({})",
            qty(r.sugar_used_kg),
            money(r.sugar_price_per_kg, currency)
        ));
    }
    parts.join(" | ")
}

/// History table, newest first.
pub fn render_history(records: &[DailyRecord], currency: &str, limit: Option<usize>) -> String {
    let rows = history_rows(records, None);
    if rows.is_empty() {
        return "No records yet. Start by adding a daily entry.\n".to_string();
    }

    let mut s = String::new();
    for r in rows.iter().take(limit.unwrap_or(usize::MAX)) {
        let _ = writeln!(s, "{}  [{}]", r.date.format("%a %d %b %Y"), r.short_id());
        let _ = writeln!(
            s,
            "  Lemonade: {} glasses @ {}",
            r.lemonade_glass_qty,
            money(r.lemonade_rate_per_glass, currency)
        );
        let _ = writeln!(s, "  Snacks:   {}", snack_summary(r));
        let _ = writeln!(s, "  Costs:    {}", ingredient_summary(r, currency));
        let _ = writeln!(
            s,
            "  Revenue {}  Cost {}  Profit {}\n",
            money(r.total_revenue, currency),
            money(r.total_cost, currency),
            money(r.net_profit, currency)
        );
    }
    s
}

pub fn render_financials(f: &Financials, currency: &str) -> String {
    format!(
        "Revenue {}  Cost {}  Net Profit {}",
        money(f.total_revenue, currency),
        money(f.total_cost, currency),
        money(f.net_profit, currency)
    )
}

/// What is about to be saved from the entry form.
pub fn render_draft(draft: &EntryDraft, currency: &str) -> String {
    let mut s = String::new();
    let title = if draft.is_edit() { "Edit Entry" } else { "Daily Entry" };
    let _ = writeln!(s, "# {} for {}", title, draft.date);
    let _ = writeln!(
        s,
        "Lemonade: {} glasses @ {}",
        draft.lemonade_qty,
        money(draft.lemonade_rate, currency)
    );
    let _ = writeln!(
        s,
        "Lemons {} @ {} | Ice {} kg @ {} | Sugar {} kg @ {}",
        qty(draft.lemons_used),
        money(draft.lemon_price, currency),
        qty(draft.ice_used),
        money(draft.ice_price, currency),
        qty(draft.sugar_used),
        money(draft.sugar_price, currency)
    );
    for snack in draft.snacks.iter().filter(|s| s.qty > 0) {
        let _ = writeln!(
            s,
            "{} x{} (buy {}, sell {})",
            snack.name,
            snack.qty,
            money(snack.buying_price_per_unit, currency),
            money(snack.price_per_unit, currency)
        );
    }
    let _ = writeln!(s, "{}", render_financials(&draft.financials(), currency));
    s
}
