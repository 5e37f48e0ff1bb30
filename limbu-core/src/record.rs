//! Daily record types for the stall: lemonade sales, ingredient costs and snacks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Snacks the stall sells unless the config says otherwise.
pub const SNACK_CATALOG: [&str; 4] = ["Balaji Wafers", "Gutkha", "Tambaku Pudi", "Chocolates"];

/// The default catalog as owned strings.
pub fn default_catalog() -> Vec<String> {
    SNACK_CATALOG.iter().map(|s| s.to_string()).collect()
}

/// One snack line sold on a given day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnackItem {
    pub name: String,
    pub qty: u32,
    /// Cost price per unit
    #[serde(default)]
    pub buying_price_per_unit: f64,
    /// Selling price per unit
    pub price_per_unit: f64,
}

impl SnackItem {
    pub fn new(name: impl Into<String>, qty: u32, buy: f64, sell: f64) -> Self {
        Self {
            name: name.into(),
            qty,
            buying_price_per_unit: buy,
            price_per_unit: sell,
        }
    }

    pub fn revenue(&self) -> f64 {
        self.qty as f64 * self.price_per_unit
    }

    pub fn cost(&self) -> f64 {
        self.qty as f64 * self.buying_price_per_unit
    }

    pub fn profit(&self) -> f64 {
        self.revenue() - self.cost()
    }
}

/// Revenue, cost and profit for a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    pub total_revenue: f64,
    pub total_cost: f64,
    pub net_profit: f64,
}

impl Financials {
    pub fn new(total_revenue: f64, total_cost: f64) -> Self {
        Self {
            total_revenue,
            total_cost,
            net_profit: total_revenue - total_cost,
        }
    }
}

/// One day's sales/cost/profit entry.
///
/// The derived totals are computed when the record is built and stored next to
/// the raw inputs. Keys match the stall's existing JSON blob, so older files
/// keep loading: fields added later default to zero when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "StoredRecord")]
pub struct DailyRecord {
    pub id: String,
    pub date: NaiveDate,

    pub lemonade_glass_qty: u32,
    pub lemonade_rate_per_glass: f64,

    pub lemons_used_qty: f64,
    pub lemon_price_per_unit: f64,
    pub ice_used_kg: f64,
    pub ice_price_per_kg: f64,
    pub sugar_used_kg: f64,
    pub sugar_price_per_kg: f64,

    pub snacks: Vec<SnackItem>,

    pub total_revenue: f64,
    pub total_cost: f64,
    pub net_profit: f64,
}

/// Read-side shape of a stored record; `netProfit` may be missing in old blobs.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    id: String,
    date: NaiveDate,
    #[serde(default)]
    lemonade_glass_qty: u32,
    #[serde(default)]
    lemonade_rate_per_glass: f64,
    #[serde(default)]
    lemons_used_qty: f64,
    #[serde(default)]
    lemon_price_per_unit: f64,
    #[serde(default)]
    ice_used_kg: f64,
    #[serde(default)]
    ice_price_per_kg: f64,
    #[serde(default)]
    sugar_used_kg: f64,
    #[serde(default)]
    sugar_price_per_kg: f64,
    #[serde(default)]
    snacks: Vec<SnackItem>,
    #[serde(default)]
    total_revenue: f64,
    #[serde(default)]
    total_cost: f64,
    net_profit: Option<f64>,
}

impl From<StoredRecord> for DailyRecord {
    fn from(s: StoredRecord) -> Self {
        Self {
            id: s.id,
            date: s.date,
            lemonade_glass_qty: s.lemonade_glass_qty,
            lemonade_rate_per_glass: s.lemonade_rate_per_glass,
            lemons_used_qty: s.lemons_used_qty,
            lemon_price_per_unit: s.lemon_price_per_unit,
            ice_used_kg: s.ice_used_kg,
            ice_price_per_kg: s.ice_price_per_kg,
            sugar_used_kg: s.sugar_used_kg,
            sugar_price_per_kg: s.sugar_price_per_kg,
            snacks: s.snacks,
            total_revenue: s.total_revenue,
            total_cost: s.total_cost,
            net_profit: s.net_profit.unwrap_or(s.total_revenue - s.total_cost),
        }
    }
}

impl DailyRecord {
    /// Revenue from lemonade glasses alone
    pub fn lemonade_revenue(&self) -> f64 {
        self.lemonade_glass_qty as f64 * self.lemonade_rate_per_glass
    }

    /// Lemon + ice + sugar spend
    pub fn ingredient_cost(&self) -> f64 {
        self.lemons_used_qty * self.lemon_price_per_unit
            + self.ice_used_kg * self.ice_price_per_kg
            + self.sugar_used_kg * self.sugar_price_per_kg
    }

    /// Recompute the totals from the raw inputs.
    pub fn compute_financials(&self) -> Financials {
        let snack_revenue: f64 = self.snacks.iter().map(SnackItem::revenue).sum();
        let snack_cost: f64 = self.snacks.iter().map(SnackItem::cost).sum();
        Financials::new(
            self.lemonade_revenue() + snack_revenue,
            self.ingredient_cost() + snack_cost,
        )
    }

    /// The totals as stored with the record.
    pub fn financials(&self) -> Financials {
        Financials {
            total_revenue: self.total_revenue,
            total_cost: self.total_cost,
            net_profit: self.net_profit,
        }
    }

    pub fn apply_financials(&mut self, f: Financials) {
        self.total_revenue = f.total_revenue;
        self.total_cost = f.total_cost;
        self.net_profit = f.net_profit;
    }

    /// Short id for tables and prompts
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }

    /// Name of the first amount that is NaN or infinite. JSON has no spelling
    /// for those, so such a record would not read back.
    pub fn non_finite_field(&self) -> Option<String> {
        let amounts = [
            ("lemonadeRatePerGlass", self.lemonade_rate_per_glass),
            ("lemonsUsedQty", self.lemons_used_qty),
            ("lemonPricePerUnit", self.lemon_price_per_unit),
            ("iceUsedKg", self.ice_used_kg),
            ("icePricePerKg", self.ice_price_per_kg),
            ("sugarUsedKg", self.sugar_used_kg),
            ("sugarPricePerKg", self.sugar_price_per_kg),
            ("totalRevenue", self.total_revenue),
            ("totalCost", self.total_cost),
            ("netProfit", self.net_profit),
        ];
        if let Some((name, _)) = amounts.iter().find(|(_, v)| !v.is_finite()) {
            return Some(name.to_string());
        }
        self.snacks.iter().find_map(|s| {
            if !s.buying_price_per_unit.is_finite() {
                Some(format!("snacks[{}].buyingPricePerUnit", s.name))
            } else if !s.price_per_unit.is_finite() {
                Some(format!("snacks[{}].pricePerUnit", s.name))
            } else {
                None
            }
        })
    }
}
