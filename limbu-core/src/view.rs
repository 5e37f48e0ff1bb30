//! View routing between the entry form, dashboard and history.
//!
//! No transition is guarded today; the table exists so a guard can be added in
//! one place instead of being spread over the UI.

use serde::{Deserialize, Serialize};

use crate::record::DailyRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewState {
    #[serde(rename = "ENTRY")]
    Entry,
    #[serde(rename = "DASHBOARD")]
    Dashboard,
    #[serde(rename = "HISTORY")]
    History,
}

/// Allowed transitions, `TRANSITIONS[from][to]`, in `ViewState::ALL` order.
const TRANSITIONS: [[bool; 3]; 3] = [
    // to:  Entry  Dashboard History
    [true, true, true], // from Entry
    [true, true, true], // from Dashboard
    [true, true, true], // from History
];

impl ViewState {
    /// Bottom navigation order
    pub const ALL: [ViewState; 3] = [ViewState::Entry, ViewState::Dashboard, ViewState::History];

    fn index(self) -> usize {
        match self {
            ViewState::Entry => 0,
            ViewState::Dashboard => 1,
            ViewState::History => 2,
        }
    }

    pub fn can_transition(self, to: ViewState) -> bool {
        TRANSITIONS[self.index()][to.index()]
    }

    pub fn title(self) -> &'static str {
        match self {
            ViewState::Entry => "Entry",
            ViewState::Dashboard => "Dashboard",
            ViewState::History => "History",
        }
    }

    pub fn next(self) -> ViewState {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> ViewState {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// What the entry form should do after a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterSave {
    /// Fresh entry: stay on the form and clear it
    ResetForm,
    /// Edit finished: the router moved to History
    ShowHistory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Router {
    view: ViewState,
    editing: Option<DailyRecord>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            view: ViewState::Entry,
            editing: None,
        }
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn editing(&self) -> Option<&DailyRecord> {
        self.editing.as_ref()
    }

    /// Bottom-nav navigation. Picking Entry from the bar starts a fresh form.
    /// Returns false if the table forbids the move.
    pub fn navigate(&mut self, to: ViewState) -> bool {
        if !self.view.can_transition(to) {
            return false;
        }
        if to == ViewState::Entry {
            self.editing = None;
        }
        self.view = to;
        true
    }

    /// Open the entry form pre-populated with `record`.
    pub fn edit(&mut self, record: DailyRecord) -> bool {
        if !self.view.can_transition(ViewState::Entry) {
            return false;
        }
        self.editing = Some(record);
        self.view = ViewState::Entry;
        true
    }

    /// Record that the entry form saved successfully.
    pub fn saved(&mut self) -> AfterSave {
        if self.editing.take().is_some() {
            self.view = ViewState::History;
            AfterSave::ShowHistory
        } else {
            AfterSave::ResetForm
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryDefaults, EntryDraft};
    use crate::record::default_catalog;

    fn some_record() -> DailyRecord {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        EntryDraft::new(date, &default_catalog(), EntryDefaults::default()).to_record()
    }

    #[test]
    fn test_every_view_reachable_from_every_view() {
        for from in ViewState::ALL {
            for to in ViewState::ALL {
                assert!(from.can_transition(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn test_edit_then_save_goes_to_history() {
        let mut r = Router::new();
        r.navigate(ViewState::History);
        assert!(r.edit(some_record()));
        assert_eq!(r.view(), ViewState::Entry);
        assert!(r.editing().is_some());

        assert_eq!(r.saved(), AfterSave::ShowHistory);
        assert_eq!(r.view(), ViewState::History);
        assert!(r.editing().is_none());
    }

    #[test]
    fn test_fresh_save_stays_on_entry() {
        let mut r = Router::new();
        assert_eq!(r.saved(), AfterSave::ResetForm);
        assert_eq!(r.view(), ViewState::Entry);
    }

    #[test]
    fn test_nav_to_entry_drops_edit() {
        let mut r = Router::new();
        r.edit(some_record());
        r.navigate(ViewState::Dashboard);
        assert!(r.editing().is_some());
        r.navigate(ViewState::Entry);
        assert!(r.editing().is_none());
    }

    #[test]
    fn test_cycle() {
        assert_eq!(ViewState::History.next(), ViewState::Entry);
        assert_eq!(ViewState::Entry.prev(), ViewState::History);
    }
}
