use anyhow::Result;
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use limbu_core::{
    aggregate_month, business_insights, AfterSave, DailyRecord, EntryDefaults, EntryDraft, MonthKey,
    MonthlyReport, Router, Summarizer, ViewState,
};
use limbu_ledger::{history_rows, RecordStore};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use tracing::{info, warn};

use crate::config::Config;
use crate::render::{money, qty};

/// One editable line of the entry form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    Glasses,
    Rate,
    Lemons,
    LemonPrice,
    Ice,
    IcePrice,
    Sugar,
    SugarPrice,
    SnackQty(usize),
    SnackBuy(usize),
    SnackSell(usize),
}

/// Text buffers behind the entry form. Parsed into the draft on every change
/// so the footer totals stay live.
#[derive(Debug, Clone)]
pub struct FormState {
    fields: Vec<Field>,
    values: Vec<String>,
    selected: usize,
}

impl FormState {
    pub fn from_draft(d: &EntryDraft) -> Self {
        let mut fields = vec![
            Field::Date,
            Field::Glasses,
            Field::Rate,
            Field::Lemons,
            Field::LemonPrice,
            Field::Ice,
            Field::IcePrice,
            Field::Sugar,
            Field::SugarPrice,
        ];
        for i in 0..d.snacks.len() {
            fields.extend([Field::SnackQty(i), Field::SnackBuy(i), Field::SnackSell(i)]);
        }
        let values = fields.iter().map(|f| current_value(d, *f)).collect();
        Self {
            fields,
            values,
            selected: 1,
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn up(&mut self) {
        self.selected = self.selected.checked_sub(1).unwrap_or(self.fields.len() - 1);
    }

    pub fn down(&mut self) {
        self.selected = (self.selected + 1) % self.fields.len();
    }

    pub fn push(&mut self, c: char) {
        let accept = match self.fields[self.selected] {
            Field::Date => c.is_ascii_digit() || c == '-',
            Field::Glasses | Field::SnackQty(_) => c.is_ascii_digit(),
            _ => c.is_ascii_digit() || c == '.',
        };
        if accept {
            self.values[self.selected].push(c);
        }
    }

    pub fn pop(&mut self) {
        self.values[self.selected].pop();
    }

    /// Write every buffer into `d`. Blank numbers count as zero.
    pub fn apply(&self, d: &mut EntryDraft) -> Result<(), String> {
        for (field, raw) in self.fields.iter().zip(&self.values) {
            let raw = raw.trim();
            let name = label(d, *field);
            match *field {
                Field::Date => {
                    d.date = raw
                        .parse::<NaiveDate>()
                        .map_err(|_| format!("{name}: expected YYYY-MM-DD"))?;
                }
                Field::Glasses => d.lemonade_qty = parse_count(raw, &name)?,
                Field::Rate => d.lemonade_rate = parse_amount(raw, &name)?,
                Field::Lemons => d.lemons_used = parse_amount(raw, &name)?,
                Field::LemonPrice => d.lemon_price = parse_amount(raw, &name)?,
                Field::Ice => d.ice_used = parse_amount(raw, &name)?,
                Field::IcePrice => d.ice_price = parse_amount(raw, &name)?,
                Field::Sugar => d.sugar_used = parse_amount(raw, &name)?,
                Field::SugarPrice => d.sugar_price = parse_amount(raw, &name)?,
                Field::SnackQty(i) => d.snacks[i].qty = parse_count(raw, &name)?,
                Field::SnackBuy(i) => d.snacks[i].buying_price_per_unit = parse_amount(raw, &name)?,
                Field::SnackSell(i) => d.snacks[i].price_per_unit = parse_amount(raw, &name)?,
            }
        }
        Ok(())
    }
}

fn current_value(d: &EntryDraft, f: Field) -> String {
    match f {
        Field::Date => d.date.to_string(),
        Field::Glasses => d.lemonade_qty.to_string(),
        Field::Rate => qty(d.lemonade_rate),
        Field::Lemons => qty(d.lemons_used),
        Field::LemonPrice => qty(d.lemon_price),
        Field::Ice => qty(d.ice_used),
        Field::IcePrice => qty(d.ice_price),
        Field::Sugar => qty(d.sugar_used),
        Field::SugarPrice => qty(d.sugar_price),
        Field::SnackQty(i) => d.snacks[i].qty.to_string(),
        Field::SnackBuy(i) => qty(d.snacks[i].buying_price_per_unit),
        Field::SnackSell(i) => qty(d.snacks[i].price_per_unit),
    }
}

fn label(d: &EntryDraft, f: Field) -> String {
    match f {
        Field::Date => "Date".to_string(),
        Field::Glasses => "Lemonade glasses".to_string(),
        Field::Rate => "Rate per glass".to_string(),
        Field::Lemons => "Lemons used (pcs)".to_string(),
        Field::LemonPrice => "Price per lemon".to_string(),
        Field::Ice => "Ice used (kg)".to_string(),
        Field::IcePrice => "Ice price per kg".to_string(),
        Field::Sugar => "Sugar used (kg)".to_string(),
        Field::SugarPrice => "Sugar price per kg".to_string(),
        Field::SnackQty(i) => format!("{} qty", d.snacks[i].name),
        Field::SnackBuy(i) => format!("{} buy", d.snacks[i].name),
        Field::SnackSell(i) => format!("{} sell", d.snacks[i].name),
    }
}

fn parse_count(raw: &str, name: &str) -> Result<u32, String> {
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse().map_err(|_| format!("{name}: expected a whole number"))
}

fn parse_amount(raw: &str, name: &str) -> Result<f64, String> {
    if raw.is_empty() {
        return Ok(0.0);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(format!("{name}: expected a number")),
    }
}

pub struct App {
    router: Router,
    draft: EntryDraft,
    form: FormState,
    catalog: Vec<String>,
    defaults: EntryDefaults,
    currency: String,
    today: NaiveDate,

    records: Vec<DailyRecord>,
    month: MonthKey,
    insights: Option<String>,
    insights_pending: bool,

    history: TableState,
    confirm_delete: Option<String>,
    status: Option<String>,
}

impl App {
    pub fn new(cfg: &Config, records: Vec<DailyRecord>) -> Result<Self> {
        let today = cfg.today()?;
        let catalog = cfg.catalog();
        let draft = EntryDraft::new(today, &catalog, cfg.defaults);
        let form = FormState::from_draft(&draft);
        Ok(Self {
            router: Router::new(),
            draft,
            form,
            catalog,
            defaults: cfg.defaults,
            currency: cfg.stall.currency.clone(),
            today,
            records,
            month: MonthKey::of(today),
            insights: None,
            insights_pending: false,
            history: TableState::default(),
            confirm_delete: None,
            status: None,
        })
    }

    pub fn view(&self) -> ViewState {
        self.router.view()
    }

    fn fresh_form(&mut self) {
        self.draft = EntryDraft::new(self.today, &self.catalog, self.defaults);
        self.form = FormState::from_draft(&self.draft);
    }

    fn refresh(&mut self, store: &dyn RecordStore) {
        self.records = store.list();
        let n = history_rows(&self.records, None).len();
        match self.history.selected() {
            _ if n == 0 => self.history.select(None),
            Some(i) if i >= n => self.history.select(Some(n - 1)),
            None => self.history.select(Some(0)),
            _ => {}
        }
    }

    fn go(&mut self, to: ViewState) {
        let was_edit = self.draft.is_edit();
        if self.router.navigate(to) {
            if to == ViewState::Entry && was_edit {
                self.fresh_form();
            }
            self.confirm_delete = None;
            self.status = None;
        }
    }

    fn selected_record(&self) -> Option<DailyRecord> {
        let rows = history_rows(&self.records, None);
        self.history.selected().and_then(|i| rows.get(i).map(|r| (*r).clone()))
    }

    fn save(&mut self, store: &mut dyn RecordStore) {
        let mut next = self.draft.clone();
        if let Err(e) = self.form.apply(&mut next) {
            self.status = Some(e);
            return;
        }
        let record = next.to_record();
        let date = record.date;
        match store.upsert(record) {
            Ok(outcome) => {
                info!(%date, ?outcome, "entry saved");
                self.refresh(store);
                match self.router.saved() {
                    AfterSave::ResetForm => {
                        next.reset();
                        self.draft = next;
                        self.form = FormState::from_draft(&self.draft);
                        self.status = Some(format!("Saved entry for {date}."));
                    }
                    AfterSave::ShowHistory => {
                        self.fresh_form();
                        self.status = Some(format!("Updated entry for {date}."));
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "save failed");
                self.status = Some(format!("Save failed: {e}"));
            }
        }
    }

    /// Handle one key press. Returns true when the app should exit.
    pub fn on_key(&mut self, key: KeyEvent, store: &mut dyn RecordStore) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        if let Some(id) = self.confirm_delete.clone() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    match store.remove_by_id(&id) {
                        Ok(_) => self.status = Some("Entry deleted.".to_string()),
                        Err(e) => self.status = Some(format!("Delete failed: {e}")),
                    }
                    self.refresh(store);
                }
                _ => self.status = None,
            }
            self.confirm_delete = None;
            return false;
        }

        match key.code {
            KeyCode::Esc => return true,
            KeyCode::Tab => self.go(self.view().next()),
            KeyCode::BackTab => self.go(self.view().prev()),
            KeyCode::F(1) => self.go(ViewState::Entry),
            KeyCode::F(2) => self.go(ViewState::Dashboard),
            KeyCode::F(3) => self.go(ViewState::History),
            code => match self.view() {
                ViewState::Entry => match code {
                    KeyCode::Up => self.form.up(),
                    KeyCode::Down => self.form.down(),
                    KeyCode::Backspace => self.form.pop(),
                    KeyCode::Enter => self.save(store),
                    KeyCode::Char(c) => self.form.push(c),
                    _ => {}
                },
                ViewState::Dashboard => match code {
                    KeyCode::Char('q') => return true,
                    KeyCode::Left => {
                        self.month = self.month.prev();
                        self.insights = None;
                    }
                    KeyCode::Right => {
                        self.month = self.month.next();
                        self.insights = None;
                    }
                    KeyCode::Char('a') => {
                        self.insights = Some("Analyzing your business...".to_string());
                        self.insights_pending = true;
                    }
                    _ => {}
                },
                ViewState::History => match code {
                    KeyCode::Char('q') => return true,
                    KeyCode::Up => self.history.select_previous(),
                    KeyCode::Down => {
                        let n = history_rows(&self.records, None).len();
                        if self.history.selected().is_none_or(|i| i + 1 < n) {
                            self.history.select_next();
                        }
                    }
                    KeyCode::Char('e') => {
                        if let Some(r) = self.selected_record() {
                            self.draft = EntryDraft::from_record(&r, &self.catalog, self.defaults);
                            self.form = FormState::from_draft(&self.draft);
                            self.router.edit(r);
                        }
                    }
                    KeyCode::Char('d') => {
                        if let Some(r) = self.selected_record() {
                            self.status = Some(format!("Delete entry for {}? (y/n)", r.date));
                            self.confirm_delete = Some(r.id);
                        }
                    }
                    _ => {}
                },
            },
        }
        false
    }

    /// Run a queued insights request. Called after a frame is drawn so the
    /// "Analyzing" text is visible while the request blocks.
    pub fn run_pending<S: Summarizer>(&mut self, summarizer: &S) {
        if !self.insights_pending {
            return;
        }
        self.insights_pending = false;
        self.insights = Some(business_insights(summarizer, &self.records, self.month, &self.currency));
    }
}

pub fn run_tui<S: Summarizer>(cfg: &Config, store: &mut dyn RecordStore, summarizer: &S) -> Result<()> {
    let mut app = App::new(cfg, store.list())?;
    app.refresh(store);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = tui_loop(&mut terminal, &mut app, store, summarizer);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn tui_loop<S: Summarizer>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    store: &mut dyn RecordStore,
    summarizer: &S,
) -> Result<()> {
    loop {
        let title = view_title(app);
        terminal.draw(|f| draw(f, app, &title))?;
        app.run_pending(summarizer);

        if event::poll(std::time::Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.on_key(key, store) {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn view_title(app: &App) -> String {
    match app.view() {
        ViewState::Entry if app.draft.is_edit() => "Edit Entry".to_string(),
        ViewState::Entry => "Daily Entry".to_string(),
        ViewState::Dashboard => format!("Monthly Overview: {}", app.month.label()),
        ViewState::History => "History".to_string(),
    }
}

fn draw(f: &mut Frame, app: &mut App, title: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "LimbuTrack ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(title.to_string(), Style::default().fg(Color::Cyan)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    match app.view() {
        ViewState::Entry => draw_entry(f, app, chunks[1]),
        ViewState::Dashboard => draw_dashboard(f, app, chunks[1]),
        ViewState::History => draw_history(f, app, chunks[1]),
    }

    let selected = ViewState::ALL.iter().position(|v| *v == app.view()).unwrap_or(0);
    let nav = Tabs::new(ViewState::ALL.iter().map(|v| v.title()))
        .select(selected)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD));
    f.render_widget(nav, chunks[2]);

    let hint = match app.view() {
        ViewState::Entry => "Up/Down field  type to edit  Enter save  Tab switch  Esc quit",
        ViewState::Dashboard => "Left/Right month  a insights  Tab switch  q quit",
        ViewState::History => "Up/Down select  e edit  d delete  Tab switch  q quit",
    };
    let status = app.status.as_deref().unwrap_or(hint);
    f.render_widget(
        Paragraph::new(status.to_string()).style(Style::default().fg(Color::Gray)),
        chunks[3],
    );
}

fn draw_entry(f: &mut Frame, app: &mut App, area: Rect) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(area);

    let rows: Vec<Row> = app
        .form
        .fields
        .iter()
        .zip(&app.form.values)
        .map(|(field, value)| Row::new(vec![Cell::from(label(&app.draft, *field)), Cell::from(value.clone())]))
        .collect();
    let mut state = TableState::default().with_selected(Some(app.form.selected()));
    let table = Table::new(rows, [Constraint::Length(24), Constraint::Min(10)])
        .block(Block::default().borders(Borders::ALL).title("entry"))
        .row_highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow))
        .highlight_symbol("> ");
    f.render_stateful_widget(table, parts[0], &mut state);

    let mut preview = app.draft.clone();
    let footer = match app.form.apply(&mut preview) {
        Ok(()) => {
            let t = preview.financials();
            let profit_color = if t.net_profit < 0.0 { Color::Red } else { Color::Green };
            Line::from(vec![
                Span::raw(format!("Revenue {}   ", money(t.total_revenue, &app.currency))),
                Span::raw(format!("Cost {}   ", money(t.total_cost, &app.currency))),
                Span::styled(
                    format!("Net Profit {}", money(t.net_profit, &app.currency)),
                    Style::default().fg(profit_color).add_modifier(Modifier::BOLD),
                ),
            ])
        }
        Err(e) => Line::from(Span::styled(e, Style::default().fg(Color::Red))),
    };
    f.render_widget(
        Paragraph::new(footer).block(Block::default().borders(Borders::ALL).title("totals")),
        parts[1],
    );
}

fn card(title: &str, value: f64, currency: &str, color: Color) -> Paragraph<'static> {
    Paragraph::new(Line::from(Span::styled(
        money(value, currency),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::ALL).title(title.to_string()))
}

fn draw_dashboard(f: &mut Frame, app: &mut App, area: Rect) {
    let report = aggregate_month(&app.records, app.month);
    let cur = app.currency.as_str();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(8),
            Constraint::Length(7),
        ])
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(rows[0]);
    f.render_widget(card("Net Sales", report.total_revenue, cur, Color::Cyan), cards[0]);
    f.render_widget(card("Total Cost", report.total_cost, cur, Color::Red), cards[1]);
    let profit_color = if report.total_profit < 0.0 { Color::Red } else { Color::Green };
    f.render_widget(card("Net Profit", report.total_profit, cur, profit_color), cards[2]);

    draw_chart(f, &report, rows[1]);
    draw_snacks(f, &report, cur, rows[2]);

    let text = app
        .insights
        .clone()
        .unwrap_or_else(|| "Press a for AI insights on this month.".to_string());
    f.render_widget(
        Paragraph::new(Text::from(text))
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("AI business insights")),
        rows[3],
    );
}

fn draw_chart(f: &mut Frame, report: &MonthlyReport, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("daily sales vs profit");
    if !report.has_data() {
        f.render_widget(
            Paragraph::new("No data for selected month.").block(block),
            area,
        );
        return;
    }

    // Bars cannot go below zero; a loss day shows an empty profit bar.
    let mut chart = BarChart::default().block(block).bar_width(3).bar_gap(0).group_gap(2);
    for d in &report.days {
        let bars = [
            Bar::default()
                .value(d.revenue.max(0.0).round() as u64)
                .text_value(String::new())
                .style(Style::default().fg(Color::Cyan)),
            Bar::default()
                .value(d.profit.max(0.0).round() as u64)
                .text_value(String::new())
                .style(Style::default().fg(Color::Green)),
        ];
        chart = chart.data(BarGroup::default().label(Line::from(d.day.to_string())).bars(&bars));
    }
    f.render_widget(chart, area);
}

fn draw_snacks(f: &mut Frame, report: &MonthlyReport, cur: &str, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("snack performance");
    if report.snacks.is_empty() {
        f.render_widget(Paragraph::new("No snack sales this month.").block(block), area);
        return;
    }
    let rows: Vec<Row> = report
        .snacks_by_profit()
        .into_iter()
        .map(|s| {
            Row::new(vec![
                s.name.clone(),
                s.qty.to_string(),
                money(s.revenue, cur),
                money(s.cost, cur),
                money(s.profit, cur),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Min(16),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["Item", "Qty", "Revenue", "Cost", "Profit"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block);
    f.render_widget(table, area);
}

fn draw_history(f: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("history");
    let rows_src = history_rows(&app.records, None);
    if rows_src.is_empty() {
        f.render_widget(
            Paragraph::new("No records yet. Start by adding a daily entry.").block(block),
            area,
        );
        return;
    }
    let cur = app.currency.as_str();
    let rows: Vec<Row> = rows_src
        .iter()
        .map(|r| {
            let snacks = if r.snacks.is_empty() {
                "No Snacks".to_string()
            } else {
                r.snacks
                    .iter()
                    .map(|s| format!("{} x{}", s.name, s.qty))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let profit_style = if r.net_profit < 0.0 {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Green)
            };
            Row::new(vec![
                Cell::from(r.date.format("%a %d %b").to_string()),
                Cell::from(r.lemonade_glass_qty.to_string()),
                Cell::from(snacks),
                Cell::from(money(r.total_revenue, cur)),
                Cell::from(money(r.total_cost, cur)),
                Cell::from(money(r.net_profit, cur)).style(profit_style),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(7),
            Constraint::Min(20),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["Date", "Glasses", "Snacks", "Revenue", "Cost", "Profit"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block)
    .row_highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow))
    .highlight_symbol("> ");
    f.render_stateful_widget(table, area, &mut app.history);
}

#[cfg(test)]
mod tests {
    use super::*;
    use limbu_core::{default_catalog, ServiceError};
    use limbu_ledger::MemoryStore;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn cfg() -> Config {
        let mut c = Config::default();
        c.stall.timezone = "UTC".to_string();
        c
    }

    fn draft() -> EntryDraft {
        EntryDraft::new(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            &default_catalog(),
            EntryDefaults::default(),
        )
    }

    fn type_str(app: &mut App, store: &mut dyn RecordStore, s: &str) {
        for c in s.chars() {
            app.on_key(key(KeyCode::Char(c)), store);
        }
    }

    struct Canned(&'static str);

    impl Summarizer for Canned {
        fn summarize(&self, _prompt: &str) -> Result<String, ServiceError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_form_round_trips_draft() {
        let d = draft();
        let form = FormState::from_draft(&d);
        assert_eq!(form.fields.len(), 9 + 3 * 4);
        let mut out = d.clone();
        form.apply(&mut out).unwrap();
        assert_eq!(out, d);
    }

    #[test]
    fn test_form_rejects_bad_input() {
        let mut form = FormState::from_draft(&draft());
        form.values[0] = "2024-13-01".to_string();
        let err = form.apply(&mut draft()).unwrap_err();
        assert!(err.starts_with("Date"));
    }

    #[test]
    fn test_form_push_filters_characters() {
        let mut form = FormState::from_draft(&draft());
        form.values[1].clear();
        form.push('4');
        form.push('.');
        form.push('x');
        form.push('2');
        assert_eq!(form.values[1], "42");

        let mut d = draft();
        form.apply(&mut d).unwrap();
        assert_eq!(d.lemonade_qty, 42);
    }

    #[test]
    fn test_blank_number_is_zero() {
        let mut form = FormState::from_draft(&draft());
        form.values[2].clear();
        let mut d = draft();
        form.apply(&mut d).unwrap();
        assert_eq!(d.lemonade_rate, 0.0);
    }

    #[test]
    fn test_save_then_edit_returns_to_history() {
        let mut store = MemoryStore::new();
        let mut app = App::new(&cfg(), vec![]).unwrap();

        // Glasses field is selected first.
        app.on_key(key(KeyCode::Backspace), &mut store);
        type_str(&mut app, &mut store, "30");
        app.on_key(key(KeyCode::Enter), &mut store);

        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].lemonade_glass_qty, 30);
        assert_eq!(app.view(), ViewState::Entry);
        assert_eq!(app.draft.lemonade_qty, 0);

        app.on_key(key(KeyCode::F(3)), &mut store);
        assert_eq!(app.view(), ViewState::History);
        app.on_key(key(KeyCode::Char('e')), &mut store);
        assert_eq!(app.view(), ViewState::Entry);
        assert!(app.draft.is_edit());

        app.on_key(key(KeyCode::Char('5')), &mut store);
        app.on_key(key(KeyCode::Enter), &mut store);
        assert_eq!(app.view(), ViewState::History);
        let all = store.list();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].lemonade_glass_qty, 305);
        assert!(!app.draft.is_edit());
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let r = draft().to_record();
        let mut store = MemoryStore::with_records(vec![r]);
        let mut app = App::new(&cfg(), store.list()).unwrap();
        app.refresh(&store);

        app.on_key(key(KeyCode::F(3)), &mut store);
        app.on_key(key(KeyCode::Char('d')), &mut store);
        app.on_key(key(KeyCode::Char('n')), &mut store);
        assert_eq!(store.list().len(), 1);

        app.on_key(key(KeyCode::Char('d')), &mut store);
        app.on_key(key(KeyCode::Char('y')), &mut store);
        assert!(store.list().is_empty());
        assert_eq!(app.history.selected(), None);
    }

    #[test]
    fn test_nav_to_entry_drops_edit() {
        let r = draft().to_record();
        let mut store = MemoryStore::with_records(vec![r]);
        let mut app = App::new(&cfg(), store.list()).unwrap();
        app.refresh(&store);

        app.on_key(key(KeyCode::F(3)), &mut store);
        app.on_key(key(KeyCode::Char('e')), &mut store);
        assert!(app.draft.is_edit());
        app.on_key(key(KeyCode::F(2)), &mut store);
        app.on_key(key(KeyCode::F(1)), &mut store);
        assert!(!app.draft.is_edit());
        assert!(app.router.editing().is_none());
    }

    #[test]
    fn test_insights_run_after_request() {
        let mut store = MemoryStore::new();
        let mut app = App::new(&cfg(), vec![]).unwrap();
        app.on_key(key(KeyCode::F(2)), &mut store);
        app.on_key(key(KeyCode::Char('a')), &mut store);
        app.run_pending(&Canned("unused"));
        assert_eq!(app.insights.as_deref(), Some(limbu_core::insight::NO_DATA_MESSAGE));

        app.on_key(key(KeyCode::Left), &mut store);
        assert!(app.insights.is_none());
    }

    #[test]
    fn test_q_types_in_entry_but_quits_elsewhere() {
        let mut store = MemoryStore::new();
        let mut app = App::new(&cfg(), vec![]).unwrap();
        assert!(!app.on_key(key(KeyCode::Char('q')), &mut store));
        app.on_key(key(KeyCode::Tab), &mut store);
        assert!(app.on_key(key(KeyCode::Char('q')), &mut store));
    }
}
