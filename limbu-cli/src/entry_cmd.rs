use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::Args;
use limbu_core::{AfterSave, DailyRecord, EntryDraft, Router};
use limbu_ledger::{RecordStore, Upserted};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use tracing::info;

use crate::config::Config;
use crate::render;

#[derive(Debug, Clone, Default, Args)]
pub struct EntryArgs {
    /// Day of the entry (YYYY-MM-DD); defaults to today at the stall
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Lemonade glasses sold
    #[arg(long)]
    pub glasses: Option<u32>,
    /// Price per glass
    #[arg(long)]
    pub rate: Option<f64>,

    #[arg(long)]
    pub lemons: Option<f64>,
    #[arg(long)]
    pub lemon_price: Option<f64>,
    /// Ice used, kg
    #[arg(long)]
    pub ice: Option<f64>,
    #[arg(long)]
    pub ice_price: Option<f64>,
    /// Sugar used, kg
    #[arg(long)]
    pub sugar: Option<f64>,
    #[arg(long)]
    pub sugar_price: Option<f64>,

    /// Snack sold, NAME=QTY or NAME=QTY@BUY/SELL (repeatable)
    #[arg(long = "snack", value_name = "NAME=QTY[@BUY/SELL]")]
    pub snacks: Vec<SnackArg>,

    /// Edit an existing record by id or unique id prefix
    #[arg(long, value_name = "ID")]
    pub edit: Option<String>,

    /// Prompt for every field
    #[arg(short, long)]
    pub interactive: bool,
}

/// One `--snack` flag.
#[derive(Debug, Clone, PartialEq)]
pub struct SnackArg {
    pub name: String,
    pub qty: u32,
    pub buy: Option<f64>,
    pub sell: Option<f64>,
}

impl FromStr for SnackArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, rest) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=QTY[@BUY/SELL], got {s:?}"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err("snack name is empty".to_string());
        }

        let (qty, prices) = match rest.split_once('@') {
            Some((q, p)) => (q, Some(p)),
            None => (rest, None),
        };
        let qty = qty
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("bad snack quantity {:?}", qty.trim()))?;

        let (buy, sell) = match prices {
            None => (None, None),
            Some(p) => {
                let (b, s) = p
                    .split_once('/')
                    .ok_or_else(|| format!("expected BUY/SELL after @, got {p:?}"))?;
                (Some(parse_amount(b)?), Some(parse_amount(s)?))
            }
        };

        Ok(Self {
            name: name.to_string(),
            qty,
            buy,
            sell,
        })
    }
}

fn parse_amount(s: &str) -> Result<f64, String> {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(format!("expected a non-negative number, got {:?}", s.trim())),
    }
}

impl fmt::Display for SnackArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.qty)?;
        if let (Some(b), Some(s)) = (self.buy, self.sell) {
            write!(f, "@{b}/{s}")?;
        }
        Ok(())
    }
}

/// Find a record by full id or by a prefix matching exactly one record.
pub fn resolve_id(records: &[DailyRecord], needle: &str) -> Result<DailyRecord> {
    let needle = needle.trim();
    if needle.is_empty() {
        bail!("empty record id");
    }
    if let Some(r) = records.iter().find(|r| r.id == needle) {
        return Ok(r.clone());
    }
    let hits: Vec<&DailyRecord> = records.iter().filter(|r| r.id.starts_with(needle)).collect();
    match hits.as_slice() {
        [one] => Ok((*one).clone()),
        [] => Err(anyhow!("no record with id {needle}")),
        many => Err(anyhow!(
            "id prefix {needle} matches {} records; use more characters",
            many.len()
        )),
    }
}

/// Copy the flags that were given onto the draft.
pub fn apply_args(draft: &mut EntryDraft, args: &EntryArgs) -> Result<()> {
    if let Some(d) = args.date {
        draft.date = d;
    }
    if let Some(v) = args.glasses {
        draft.lemonade_qty = v;
    }
    set_amount(&mut draft.lemonade_rate, args.rate, "rate")?;
    set_amount(&mut draft.lemons_used, args.lemons, "lemons")?;
    set_amount(&mut draft.lemon_price, args.lemon_price, "lemon-price")?;
    set_amount(&mut draft.ice_used, args.ice, "ice")?;
    set_amount(&mut draft.ice_price, args.ice_price, "ice-price")?;
    set_amount(&mut draft.sugar_used, args.sugar, "sugar")?;
    set_amount(&mut draft.sugar_price, args.sugar_price, "sugar-price")?;

    for arg in &args.snacks {
        let known: Vec<String> = draft.snacks.iter().map(|s| s.name.clone()).collect();
        let Some(name) = known.iter().find(|n| n.eq_ignore_ascii_case(&arg.name)).cloned() else {
            bail!("unknown snack {:?}; catalog is: {}", arg.name, known.join(", "));
        };
        if let Some(item) = draft.snack_mut(&name) {
            item.qty = arg.qty;
            if let Some(b) = arg.buy {
                item.buying_price_per_unit = b;
            }
            if let Some(s) = arg.sell {
                item.price_per_unit = s;
            }
        }
    }
    Ok(())
}

fn set_amount(slot: &mut f64, v: Option<f64>, flag: &str) -> Result<()> {
    if let Some(v) = v {
        if !v.is_finite() || v < 0.0 {
            bail!("--{flag} must be a non-negative number");
        }
        *slot = v;
    }
    Ok(())
}

/// Ask until `parse` accepts the answer. Blank input, or end of input, keeps
/// `current`.
fn ask<R, T>(input: &mut R, label: &str, current: T, parse: impl Fn(&str) -> Result<T, String>) -> Result<T>
where
    R: BufRead,
    T: fmt::Display + Copy,
{
    loop {
        print!("{label} [{current}]: ");
        io::stdout().flush().ok();
        let mut s = String::new();
        input.read_line(&mut s)?;
        let s = s.trim();
        if s.is_empty() {
            return Ok(current);
        }
        match parse(s) {
            Ok(v) => return Ok(v),
            Err(e) => println!("  {e}"),
        }
    }
}

fn parse_plain<T: FromStr>(s: &str) -> Result<T, String> {
    s.parse().map_err(|_| format!("not a valid value: {s}"))
}

fn prompt_draft<R: BufRead>(input: &mut R, draft: &mut EntryDraft, currency: &str) -> Result<()> {
    let title = if draft.is_edit() { "Edit Entry" } else { "Daily Entry" };
    println!("{title} (blank keeps the value shown)\n");

    draft.date = ask(input, "Date", draft.date, parse_plain)?;

    println!("\nLemonade");
    draft.lemonade_qty = ask(input, "  Glasses sold", draft.lemonade_qty, parse_plain)?;
    draft.lemonade_rate = ask(
        input,
        &format!("  Rate per glass ({currency})"),
        draft.lemonade_rate,
        parse_amount,
    )?;

    println!("\nIngredients");
    draft.lemons_used = ask(input, "  Lemons used (pcs)", draft.lemons_used, parse_amount)?;
    draft.lemon_price = ask(input, "  Price per lemon", draft.lemon_price, parse_amount)?;
    draft.ice_used = ask(input, "  Ice used (kg)", draft.ice_used, parse_amount)?;
    draft.ice_price = ask(input, "  Ice price per kg", draft.ice_price, parse_amount)?;
    draft.sugar_used = ask(input, "  Sugar used (kg)", draft.sugar_used, parse_amount)?;
    draft.sugar_price = ask(input, "  Sugar price per kg", draft.sugar_price, parse_amount)?;

    println!("\nSnacks");
    for item in draft.snacks.iter_mut() {
        item.qty = ask(input, &format!("  {} qty", item.name), item.qty, parse_plain)?;
        if item.qty > 0 {
            item.buying_price_per_unit = ask(input, "    buy price", item.buying_price_per_unit, parse_amount)?;
            item.price_per_unit = ask(input, "    sell price", item.price_per_unit, parse_amount)?;
        }
    }
    println!();
    Ok(())
}

pub fn run_entry(cfg: &Config, store: &mut dyn RecordStore, args: &EntryArgs) -> Result<()> {
    let catalog = cfg.catalog();
    let currency = cfg.stall.currency.as_str();
    let mut router = Router::new();

    let mut draft = match &args.edit {
        Some(needle) => {
            let record = resolve_id(&store.list(), needle)?;
            let draft = EntryDraft::from_record(&record, &catalog, cfg.defaults);
            router.edit(record);
            draft
        }
        None => EntryDraft::new(cfg.today()?, &catalog, cfg.defaults),
    };

    apply_args(&mut draft, args)?;
    if args.interactive {
        prompt_draft(&mut io::stdin().lock(), &mut draft, currency)?;
    }

    print!("{}", render::render_draft(&draft, currency));

    let record = draft.to_record();
    let date = record.date;
    let outcome = store
        .upsert(record)
        .with_context(|| format!("save entry for {date}"))?;
    info!(%date, ?outcome, "entry saved");

    if outcome == Upserted::ReplacedSameDate {
        println!("Replaced the existing entry for {date}.");
    }

    match router.saved() {
        AfterSave::ShowHistory => {
            println!("Entry updated.\n");
            print!("{}", render::render_history(&store.list(), currency, Some(10)));
        }
        AfterSave::ResetForm => {
            println!("Entry saved.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use limbu_core::{default_catalog, EntryDefaults};
    use limbu_ledger::MemoryStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn draft() -> EntryDraft {
        EntryDraft::new(day(1), &default_catalog(), EntryDefaults::default())
    }

    #[test]
    fn test_snack_arg_parse() {
        let a: SnackArg = "Chocolates=3".parse().unwrap();
        assert_eq!(a.qty, 3);
        assert_eq!(a.buy, None);

        let b: SnackArg = "Balaji Wafers=6@5/10".parse().unwrap();
        assert_eq!(b.name, "Balaji Wafers");
        assert_eq!((b.buy, b.sell), (Some(5.0), Some(10.0)));
        assert_eq!(b.to_string(), "Balaji Wafers=6@5/10");

        assert!("Chocolates".parse::<SnackArg>().is_err());
        assert!("Chocolates=x".parse::<SnackArg>().is_err());
        assert!("Chocolates=2@5".parse::<SnackArg>().is_err());
        assert!("=2".parse::<SnackArg>().is_err());
    }

    #[test]
    fn test_apply_args_sets_only_given_fields() {
        let mut d = draft();
        let args = EntryArgs {
            glasses: Some(40),
            lemons: Some(20.0),
            snacks: vec!["chocolates=6".parse().unwrap()],
            ..Default::default()
        };
        apply_args(&mut d, &args).unwrap();
        assert_eq!(d.lemonade_qty, 40);
        assert_eq!(d.lemonade_rate, 20.0);
        assert_eq!(d.snack_mut("Chocolates").unwrap().qty, 6);
        assert_eq!(d.financials().net_profit, 800.0 + 60.0 - 100.0 - 30.0);
    }

    #[test]
    fn test_apply_args_rejects_unknown_snack() {
        let mut d = draft();
        let args = EntryArgs {
            snacks: vec!["Samosa=2".parse().unwrap()],
            ..Default::default()
        };
        let err = apply_args(&mut d, &args).unwrap_err();
        assert!(err.to_string().contains("unknown snack"));
    }

    #[test]
    fn test_apply_args_rejects_negative_amount() {
        let mut d = draft();
        let args = EntryArgs {
            ice: Some(-1.0),
            ..Default::default()
        };
        assert!(apply_args(&mut d, &args).is_err());
    }

    #[test]
    fn test_resolve_id_exact_and_prefix() {
        let mut a = draft().to_record();
        a.id = "abc123".to_string();
        let mut b = draft().to_record();
        b.id = "abd456".to_string();
        let records = vec![a, b];

        assert_eq!(resolve_id(&records, "abc123").unwrap().id, "abc123");
        assert_eq!(resolve_id(&records, "abd").unwrap().id, "abd456");
        assert!(resolve_id(&records, "ab").is_err());
        assert!(resolve_id(&records, "zzz").is_err());
        assert!(resolve_id(&records, "").is_err());
    }

    #[test]
    fn test_run_entry_edit_keeps_id() {
        let mut cfg = Config::default();
        cfg.stall.timezone = "UTC".to_string();

        let mut first = draft();
        first.lemonade_qty = 10;
        let saved = first.to_record();
        let mut store = MemoryStore::with_records(vec![saved.clone()]);

        let args = EntryArgs {
            edit: Some(saved.id[..8].to_string()),
            glasses: Some(25),
            ..Default::default()
        };
        run_entry(&cfg, &mut store, &args).unwrap();

        let all = store.list();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, saved.id);
        assert_eq!(all[0].lemonade_glass_qty, 25);
    }

    #[test]
    fn test_run_entry_same_date_replaces() {
        let cfg = Config::default();
        let mut store = MemoryStore::new();
        let args = EntryArgs {
            date: Some(day(9)),
            glasses: Some(5),
            ..Default::default()
        };
        run_entry(&cfg, &mut store, &args).unwrap();
        let args = EntryArgs {
            glasses: Some(7),
            ..args
        };
        run_entry(&cfg, &mut store, &args).unwrap();

        let all = store.list();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].lemonade_glass_qty, 7);
    }

    #[test]
    fn test_amount_parse_rejects_nan_inf_and_negative() {
        assert_eq!(parse_amount(" 12.5 "), Ok(12.5));
        assert_eq!(parse_amount("0"), Ok(0.0));
        for bad in ["nan", "NaN", "inf", "-inf", "infinity", "-2", "abc", ""] {
            assert!(parse_amount(bad).is_err(), "{bad} should be refused");
        }
        assert!("Chocolates=2@nan/10".parse::<SnackArg>().is_err());
        assert!("Chocolates=2@5/inf".parse::<SnackArg>().is_err());
    }

    #[test]
    fn test_ask_repeats_until_amount_is_valid() {
        let mut input = io::Cursor::new("nan\ninf\n-2\n12.5\n");
        let v = ask(&mut input, "Rate", 20.0, parse_amount).unwrap();
        assert_eq!(v, 12.5);
    }

    #[test]
    fn test_ask_blank_or_eof_keeps_current() {
        let mut blank = io::Cursor::new("\n");
        assert_eq!(ask(&mut blank, "Rate", 20.0, parse_amount).unwrap(), 20.0);

        let mut eof = io::Cursor::new("nan\n");
        assert_eq!(ask(&mut eof, "Rate", 20.0, parse_amount).unwrap(), 20.0);
    }

    #[test]
    fn test_interactive_draft_saves_only_finite_amounts() {
        // date kept, 30 glasses, rate "nan" refused then kept, 15 lemons,
        // ice price "inf" refused then 60; everything after runs to end of input.
        let mut input = io::Cursor::new("\n30\nnan\n\n15\n\n\ninf\n60\n");
        let mut d = draft();
        prompt_draft(&mut input, &mut d, "Rs").unwrap();

        assert_eq!(d.date, day(1));
        assert_eq!(d.lemonade_qty, 30);
        assert_eq!(d.lemonade_rate, 20.0);
        assert_eq!(d.lemons_used, 15.0);
        assert_eq!(d.ice_price, 60.0);

        let record = d.to_record();
        assert_eq!(record.non_finite_field(), None);
        let mut store = MemoryStore::new();
        store.upsert(record).unwrap();
        assert_eq!(store.list().len(), 1);
    }
}
