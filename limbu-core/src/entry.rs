//! Entry draft: the in-progress state of the daily entry form.
//!
//! The draft always carries one snack line per catalog item, so a form can
//! render a fixed grid. Lines left at qty 0 are dropped when the record is
//! built.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{DailyRecord, Financials, SnackItem};

/// Unit prices a fresh form starts with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryDefaults {
    pub lemonade_rate: f64,
    pub lemon_price: f64,
    pub ice_price: f64,
    pub sugar_price: f64,
    pub snack_sell_price: f64,
    pub snack_buy_price: f64,
}

impl Default for EntryDefaults {
    fn default() -> Self {
        Self {
            lemonade_rate: 20.0,
            lemon_price: 5.0,
            ice_price: 20.0,
            sugar_price: 40.0,
            snack_sell_price: 10.0,
            snack_buy_price: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    /// Set when editing an existing record
    pub id: Option<String>,
    pub date: NaiveDate,

    pub lemonade_qty: u32,
    pub lemonade_rate: f64,

    pub lemons_used: f64,
    pub lemon_price: f64,
    pub ice_used: f64,
    pub ice_price: f64,
    pub sugar_used: f64,
    pub sugar_price: f64,

    pub snacks: Vec<SnackItem>,

    defaults: EntryDefaults,
}

impl EntryDraft {
    pub fn new(date: NaiveDate, catalog: &[String], defaults: EntryDefaults) -> Self {
        Self {
            id: None,
            date,
            lemonade_qty: 0,
            lemonade_rate: defaults.lemonade_rate,
            lemons_used: 0.0,
            lemon_price: defaults.lemon_price,
            ice_used: 0.0,
            ice_price: defaults.ice_price,
            sugar_used: 0.0,
            sugar_price: defaults.sugar_price,
            snacks: blank_snacks(catalog, defaults),
            defaults,
        }
    }

    /// Pre-populate the form from a stored record.
    ///
    /// Snacks follow catalog order. A catalog item the record never sold gets
    /// default prices; a stored ingredient price of zero falls back to the
    /// default, matching how older records without prices were edited.
    pub fn from_record(record: &DailyRecord, catalog: &[String], defaults: EntryDefaults) -> Self {
        let snacks = catalog
            .iter()
            .map(|name| {
                record
                    .snacks
                    .iter()
                    .find(|s| &s.name == name)
                    .cloned()
                    .unwrap_or_else(|| {
                        SnackItem::new(name.clone(), 0, defaults.snack_buy_price, defaults.snack_sell_price)
                    })
            })
            .collect();

        Self {
            id: Some(record.id.clone()),
            date: record.date,
            lemonade_qty: record.lemonade_glass_qty,
            lemonade_rate: record.lemonade_rate_per_glass,
            lemons_used: record.lemons_used_qty,
            lemon_price: non_zero_or(record.lemon_price_per_unit, defaults.lemon_price),
            ice_used: record.ice_used_kg,
            ice_price: non_zero_or(record.ice_price_per_kg, defaults.ice_price),
            sugar_used: record.sugar_used_kg,
            sugar_price: non_zero_or(record.sugar_price_per_kg, defaults.sugar_price),
            snacks,
            defaults,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.id.is_some()
    }

    pub fn snack_mut(&mut self, name: &str) -> Option<&mut SnackItem> {
        self.snacks.iter_mut().find(|s| s.name == name)
    }

    /// Live totals for the form footer.
    pub fn financials(&self) -> Financials {
        let lemonade = self.lemonade_qty as f64 * self.lemonade_rate;
        let snack_revenue: f64 = self.snacks.iter().map(SnackItem::revenue).sum();

        let ingredients = self.lemons_used * self.lemon_price
            + self.ice_used * self.ice_price
            + self.sugar_used * self.sugar_price;
        let snack_cost: f64 = self.snacks.iter().map(SnackItem::cost).sum();

        Financials::new(lemonade + snack_revenue, ingredients + snack_cost)
    }

    /// Build the record to save. Edits keep their id; fresh entries get a new one.
    pub fn to_record(&self) -> DailyRecord {
        let f = self.financials();
        DailyRecord {
            id: self
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            date: self.date,
            lemonade_glass_qty: self.lemonade_qty,
            lemonade_rate_per_glass: self.lemonade_rate,
            lemons_used_qty: self.lemons_used,
            lemon_price_per_unit: self.lemon_price,
            ice_used_kg: self.ice_used,
            ice_price_per_kg: self.ice_price,
            sugar_used_kg: self.sugar_used,
            sugar_price_per_kg: self.sugar_price,
            snacks: self.snacks.iter().filter(|s| s.qty > 0).cloned().collect(),
            total_revenue: f.total_revenue,
            total_cost: f.total_cost,
            net_profit: f.net_profit,
        }
    }

    /// Clear the quantities after a fresh save. Date and ingredient prices stay.
    pub fn reset(&mut self) {
        self.id = None;
        self.lemonade_qty = 0;
        self.lemons_used = 0.0;
        self.ice_used = 0.0;
        self.sugar_used = 0.0;
        let catalog: Vec<String> = self.snacks.iter().map(|s| s.name.clone()).collect();
        self.snacks = blank_snacks(&catalog, self.defaults);
    }
}

fn blank_snacks(catalog: &[String], defaults: EntryDefaults) -> Vec<SnackItem> {
    catalog
        .iter()
        .map(|name| SnackItem::new(name.clone(), 0, defaults.snack_buy_price, defaults.snack_sell_price))
        .collect()
}

fn non_zero_or(v: f64, fallback: f64) -> f64 {
    if v == 0.0 { fallback } else { v }
}
