use chrono::NaiveDate;

use crate::models::{ConversationDetail, ConversationSummary, Stats};

/// Store lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Loading,
    Ready,
    /// Statistics could not be loaded; the message is shown full screen.
    Failed(String),
    Disposed,
}

/// Which list a view should show. Search results take precedence over the day listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListView<'a> {
    Search { query: &'a str, results: &'a [ConversationSummary], in_flight: bool },
    Day { date: NaiveDate, conversations: &'a [ConversationSummary], loading: bool },
    Empty,
}

/// Snapshot of everything a view needs, apart from the contribution cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineState {
    pub phase: Phase,
    pub stats: Option<Stats>,
    /// Years covered by the archive, newest first.
    pub available_years: Vec<i32>,
    /// `None` selects the rolling twelve-month window.
    pub selected_year: Option<i32>,
    pub selected_date: Option<NaiveDate>,
    pub conversation_list: Vec<ConversationSummary>,
    pub day_loading: bool,
    pub selected_conversation_id: Option<String>,
    pub active_conversation: Option<ConversationDetail>,
    pub conversation_loading: bool,
    pub search_query: String,
    pub search_results: Vec<ConversationSummary>,
    pub search_in_flight: bool,
}

impl TimelineState {
    pub fn is_rolling(&self) -> bool {
        self.selected_year.is_none()
    }

    pub fn is_searching(&self) -> bool {
        !self.search_query.is_empty()
    }

    pub fn list_view(&self) -> ListView<'_> {
        if self.is_searching() {
            ListView::Search {
                query: &self.search_query,
                results: &self.search_results,
                in_flight: self.search_in_flight,
            }
        } else if let Some(date) = self.selected_date {
            ListView::Day { date, conversations: &self.conversation_list, loading: self.day_loading }
        } else {
            ListView::Empty
        }
    }

    pub(crate) fn clear_conversation(&mut self) {
        self.selected_conversation_id = None;
        self.active_conversation = None;
        self.conversation_loading = false;
    }

    pub(crate) fn clear_search(&mut self) {
        self.search_query.clear();
        self.search_results.clear();
        self.search_in_flight = false;
    }

    /// Drop the selected day, its listing, the open conversation and any search.
    pub(crate) fn clear_browsing(&mut self) {
        self.selected_date = None;
        self.conversation_list.clear();
        self.day_loading = false;
        self.clear_conversation();
        self.clear_search();
    }
}
