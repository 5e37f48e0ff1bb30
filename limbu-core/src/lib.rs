//! limbu-core: record types, entry drafts and monthly rollups for a lemonade stall

pub mod aggregate;
pub mod entry;
pub mod insight;
pub mod month;
pub mod record;
pub mod view;

pub use aggregate::{
    aggregate_month, daily_series, filter_month, months_with_data, snack_rollups, DayPoint,
    MonthlyReport, SnackRollup,
};
pub use entry::{EntryDefaults, EntryDraft};
pub use insight::{build_prompt, business_insights, recent_records, ServiceError, Summarizer};
pub use month::{MonthKey, MonthParseError};
pub use record::{default_catalog, DailyRecord, Financials, SnackItem, SNACK_CATALOG};
pub use view::{AfterSave, Router, ViewState};
