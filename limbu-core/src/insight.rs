//! Business insights from a hosted text-generation model.
//!
//! The model is reached through [`Summarizer`]; this module only picks the
//! records, builds the prompt and maps failures to fixed messages. Nothing
//! here returns an error to the caller.

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::month::MonthKey;
use crate::record::DailyRecord;

/// At most this many records go into one prompt.
pub const MAX_PROMPT_RECORDS: usize = 30;

pub const FALLBACK_SERVICE_ERROR: &str =
    "Error connecting to AI advisor. Please check your connection.";
pub const FALLBACK_EMPTY_RESPONSE: &str = "Unable to generate insights at this time.";
pub const NO_DATA_MESSAGE: &str = "Add data to get insights.";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no API credential configured for {0}")]
    MissingCredential(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Text in, text out.
pub trait Summarizer {
    fn summarize(&self, prompt: &str) -> Result<String, ServiceError>;
}

impl<S: Summarizer + ?Sized> Summarizer for &S {
    fn summarize(&self, prompt: &str) -> Result<String, ServiceError> {
        (**self).summarize(prompt)
    }
}

/// Up to [`MAX_PROMPT_RECORDS`] records of `month`, newest first.
pub fn recent_records(records: &[DailyRecord], month: MonthKey) -> Vec<&DailyRecord> {
    let mut picked: Vec<&DailyRecord> = records.iter().filter(|r| month.contains(r.date)).collect();
    picked.sort_by(|a, b| b.date.cmp(&a.date));
    picked.truncate(MAX_PROMPT_RECORDS);
    picked
}

pub fn build_prompt(records: &[&DailyRecord], currency: &str) -> serde_json::Result<String> {
    let data = serde_json::to_string(records)?;
    Ok(format!(
        "You are a business consultant for a small Indian street stall selling 'Limbu Sarbat' (lemonade) and snacks.\n\
\n\
Here is the daily financial data (JSON) including sales, costs (lemon, ice, sugar, snack buying prices) and profit:\n\
{data}\n\
\n\
Please provide a brief, actionable analysis in 3 bullet points:\n\
1. Profitability: are margins healthy? (total revenue vs total cost)\n\
2. Snack performance: which snacks have good margins (selling price - buying price) and should be pushed?\n\
3. Growth tip: how can we increase net profit based on this data?\n\
\n\
Keep the tone encouraging and simple. Use the currency symbol {currency}."
    ))
}

/// Ask the model about `month`. Always returns displayable text.
pub fn business_insights<S: Summarizer>(
    summarizer: &S,
    records: &[DailyRecord],
    month: MonthKey,
    currency: &str,
) -> String {
    let picked = recent_records(records, month);
    if picked.is_empty() {
        return NO_DATA_MESSAGE.to_string();
    }

    let prompt = match build_prompt(&picked, currency) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "serialize records for insight prompt");
            return FALLBACK_SERVICE_ERROR.to_string();
        }
    };
    debug!(%month, records = picked.len(), "requesting insights");

    match summarizer.summarize(&prompt) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            warn!(%month, "insight service returned empty text");
            FALLBACK_EMPTY_RESPONSE.to_string()
        }
        Err(e) => {
            error!(error = %e, "insight service failed");
            FALLBACK_SERVICE_ERROR.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryDefaults, EntryDraft};
    use crate::record::default_catalog;
    use chrono::NaiveDate;
    use std::cell::RefCell;

    struct FakeSummarizer {
        reply: Result<String, String>,
        prompts: RefCell<Vec<String>>,
    }

    impl FakeSummarizer {
        fn ok(s: &str) -> Self {
            Self { reply: Ok(s.to_string()), prompts: RefCell::new(vec![]) }
        }

        fn failing() -> Self {
            Self { reply: Err("connection refused".to_string()), prompts: RefCell::new(vec![]) }
        }
    }

    impl Summarizer for FakeSummarizer {
        fn summarize(&self, prompt: &str) -> Result<String, ServiceError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.reply.clone().map_err(ServiceError::Transport)
        }
    }

    fn records_for(year: i32, month: u32, days: std::ops::RangeInclusive<u32>) -> Vec<DailyRecord> {
        days.map(|d| {
            let date = NaiveDate::from_ymd_opt(year, month, d).unwrap();
            let mut draft = EntryDraft::new(date, &default_catalog(), EntryDefaults::default());
            draft.lemonade_qty = d;
            draft.to_record()
        })
        .collect()
    }

    fn may() -> MonthKey {
        "2024-05".parse().unwrap()
    }

    #[test]
    fn test_recent_records_caps_at_30_newest_first() {
        let mut records = records_for(2024, 5, 1..=31);
        records.extend(records_for(2024, 4, 1..=5));
        let picked = recent_records(&records, may());
        assert_eq!(picked.len(), MAX_PROMPT_RECORDS);
        assert_eq!(picked[0].date.to_string(), "2024-05-31");
        assert_eq!(picked[29].date.to_string(), "2024-05-02");
    }

    #[test]
    fn test_prompt_carries_json_records_and_currency() {
        let records = records_for(2024, 5, 1..=2);
        let picked: Vec<&DailyRecord> = records.iter().collect();
        let prompt = build_prompt(&picked, "₹").unwrap();
        assert!(prompt.contains("\"lemonadeGlassQty\":1"));
        assert!(prompt.contains("Profitability"));
        assert!(prompt.contains("Snack performance"));
        assert!(prompt.contains("Growth tip"));
        assert!(prompt.contains("₹"));
    }

    #[test]
    fn test_passes_text_through() {
        let fake = FakeSummarizer::ok("  - margins look healthy\n");
        let out = business_insights(&fake, &records_for(2024, 5, 1..=3), may(), "₹");
        assert_eq!(out, "- margins look healthy");
        assert_eq!(fake.prompts.borrow().len(), 1);
    }

    #[test]
    fn test_failure_returns_fallback() {
        let fake = FakeSummarizer::failing();
        let out = business_insights(&fake, &records_for(2024, 5, 1..=3), may(), "₹");
        assert_eq!(out, FALLBACK_SERVICE_ERROR);
    }

    #[test]
    fn test_empty_reply_returns_fallback() {
        let fake = FakeSummarizer::ok("   ");
        let out = business_insights(&fake, &records_for(2024, 5, 1..=3), may(), "₹");
        assert_eq!(out, FALLBACK_EMPTY_RESPONSE);
    }

    #[test]
    fn test_no_records_skips_service() {
        let fake = FakeSummarizer::ok("unused");
        let out = business_insights(&fake, &records_for(2024, 4, 1..=3), may(), "₹");
        assert_eq!(out, NO_DATA_MESSAGE);
        assert!(fake.prompts.borrow().is_empty());
    }
}
