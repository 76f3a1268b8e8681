//! TUI application state and event handling.
//!
//! `App` owns only view state: focus, cursors, the search input line and transient
//! status messages. Timeline data lives in the shared [`TimelineStore`]; every
//! operation that loads data is spawned on the runtime and the store's subscription
//! flips a dirty flag so the next tick redraws.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::NaiveDate;
use ratatui::Terminal;
use ratatui::backend::Backend;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use super::events::{Action, InputMode, poll_event};
use super::rendering::{RenderState, render_ui};
use crate::clipboard::copy_conversation;
use crate::timeline::window::WEEK_ROWS;
use crate::timeline::{ListView, ListenerId, Phase, TimelineState, TimelineStore, Window};

/// Duration for success status messages (milliseconds)
const STATUS_SUCCESS_DURATION_MS: u64 = 3000;
/// Duration for error status messages (milliseconds)
const STATUS_ERROR_DURATION_MS: u64 = 5000;
/// Maximum length of the search input line
const MAX_INPUT_LEN: usize = 256;
const PAGE_STEP: usize = 10;

/// Type of status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Success,
    Error,
}

/// Transient status message with expiry
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub message_type: MessageType,
    pub expires_at: Instant,
}

/// Pane receiving navigation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Grid,
    List,
    Detail,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Grid => Focus::List,
            Focus::List => Focus::Detail,
            Focus::Detail => Focus::Grid,
        }
    }
}

/// Year reached by stepping older (`[`) or newer (`]`) from `selected`.
///
/// `years` is newest first. Stepping newer past the newest year returns to the rolling
/// window (`Some(None)`); `None` means there is nowhere to go.
pub fn year_step(years: &[i32], selected: Option<i32>, older: bool) -> Option<Option<i32>> {
    match selected {
        None if older => years.first().map(|&y| Some(y)),
        None => None,
        Some(current) => {
            let idx = years.iter().position(|&y| y == current)?;
            if older {
                years.get(idx + 1).map(|&y| Some(y))
            } else if idx == 0 {
                Some(None)
            } else {
                Some(Some(years[idx - 1]))
            }
        }
    }
}

pub struct App {
    store: Arc<TimelineStore>,
    runtime: Handle,
    dirty: Arc<AtomicBool>,
    subscription: ListenerId,
    in_flight: Vec<JoinHandle<()>>,
    focus: Focus,
    input_mode: InputMode,
    search_input: String,
    grid_cursor: Option<usize>,
    // Window the cursor was placed in; a mode switch re-anchors it
    cursor_mode: Option<Option<i32>>,
    list_idx: usize,
    detail_scroll: u16,
    status_message: Option<StatusMessage>,
    should_quit: bool,
    needs_redraw: bool,
    last_draw_time: Instant,
}

impl App {
    pub fn new(store: Arc<TimelineStore>, runtime: Handle) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&dirty);
        let subscription = store.subscribe(move |_| flag.store(true, Ordering::Release));

        Self {
            store,
            runtime,
            dirty,
            subscription,
            in_flight: Vec::new(),
            focus: Focus::Grid,
            input_mode: InputMode::Browse,
            search_input: String::new(),
            grid_cursor: None,
            cursor_mode: None,
            list_idx: 0,
            detail_scroll: 0,
            status_message: None,
            should_quit: false,
            needs_redraw: true,
            last_draw_time: Instant::now(),
        }
    }

    /// Set a transient status message with automatic expiry
    fn set_status(&mut self, text: impl Into<String>, message_type: MessageType, duration_ms: u64) {
        self.status_message = Some(StatusMessage {
            text: text.into(),
            message_type,
            expires_at: Instant::now() + Duration::from_millis(duration_ms),
        });
        self.needs_redraw = true;
    }

    /// Check and clear expired status messages
    fn check_and_clear_expired_status(&mut self) {
        let should_clear = self
            .status_message
            .as_ref()
            .map(|msg| Instant::now() >= msg.expires_at)
            .unwrap_or(false);
        if should_clear {
            self.status_message = None;
            self.needs_redraw = true;
        }
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        while !self.should_quit {
            self.check_and_clear_expired_status();
            self.in_flight.retain(|task| !task.is_finished());

            let state = self.store.state();
            let window = self.store.window();
            self.sync_cursor(&state, &window);

            // Draw if the store changed, the view changed, or it's been >100ms
            // (terminal resize handling)
            let now = Instant::now();
            let elapsed = now.duration_since(self.last_draw_time);
            let store_changed = self.dirty.swap(false, Ordering::AcqRel);
            if store_changed || self.needs_redraw || elapsed >= Duration::from_millis(100) {
                let visible_count = self.store.visible_count();
                let range_label = self.store.date_range_label();
                terminal.draw(|f| {
                    let view = RenderState {
                        state: &state,
                        window: &window,
                        visible_count,
                        range_label: &range_label,
                        focus: self.focus,
                        grid_cursor: self.grid_cursor,
                        list_idx: self.list_idx,
                        detail_scroll: self.detail_scroll,
                        input_mode: self.input_mode,
                        search_input: &self.search_input,
                        status_message: self.status_message.as_ref(),
                    };
                    render_ui(f, &view);
                })?;
                self.needs_redraw = false;
                self.last_draw_time = now;
            }

            let action = poll_event(Duration::from_millis(100), self.input_mode)?;
            self.handle_action(action, &state, &window);
        }

        Ok(())
    }

    /// Keep the grid cursor inside the current window, re-anchoring it on mode change.
    fn sync_cursor(&mut self, state: &TimelineState, window: &Window) {
        if window.cells.is_empty() {
            self.grid_cursor = None;
            return;
        }
        let mode = Some(state.selected_year);
        if self.cursor_mode != mode || self.grid_cursor.is_none() {
            let today = self.store.now().date();
            let anchor = state
                .selected_date
                .and_then(|d| window.position_of(d))
                .or_else(|| window.position_of(today))
                .unwrap_or(if state.is_rolling() { window.cells.len() - 1 } else { 0 });
            self.grid_cursor = Some(anchor);
            self.cursor_mode = mode;
            self.needs_redraw = true;
        }
        if let Some(idx) = self.grid_cursor
            && idx >= window.cells.len()
        {
            self.grid_cursor = Some(window.cells.len() - 1);
        }
    }

    fn spawn<F>(&mut self, operation: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.push(self.runtime.spawn(operation));
    }

    /// Handle a user action (extracted for testing)
    fn handle_action(&mut self, action: Action, state: &TimelineState, window: &Window) {
        if matches!(state.phase, Phase::Failed(_) | Phase::Loading) {
            if matches!(action, Action::Quit | Action::Back) {
                self.should_quit = true;
            }
            return;
        }

        match action {
            Action::Quit => self.should_quit = true,
            Action::Back => self.back(state),
            Action::MoveUp => self.move_vertical(-1, state, window),
            Action::MoveDown => self.move_vertical(1, state, window),
            Action::MoveLeft => self.move_grid_column(-1, window),
            Action::MoveRight => self.move_grid_column(1, window),
            Action::PageUp => self.move_page(-1, state),
            Action::PageDown => self.move_page(1, state),
            Action::Select => self.select(state, window),
            Action::ToggleFocus => {
                self.focus = self.focus.next();
                self.needs_redraw = true;
            }
            Action::StartSearch => {
                self.input_mode = InputMode::Search;
                self.search_input = state.search_query.clone();
                self.needs_redraw = true;
            }
            Action::OlderYear => self.step_year(state, true),
            Action::NewerYear => self.step_year(state, false),
            Action::RollingWindow => {
                if state.selected_year.is_some() {
                    self.change_year(None);
                }
            }
            Action::CopyConversation => self.copy_active(state),
            Action::Input(c) => {
                if self.search_input.chars().count() < MAX_INPUT_LEN {
                    self.search_input.push(c);
                    self.needs_redraw = true;
                }
            }
            Action::DeleteChar => {
                if self.search_input.pop().is_some() {
                    self.needs_redraw = true;
                }
            }
            Action::None => {}
        }
    }

    /// Esc: cancel input, then the search, then the selected day, then quit.
    fn back(&mut self, state: &TimelineState) {
        self.needs_redraw = true;
        if self.input_mode == InputMode::Search {
            self.input_mode = InputMode::Browse;
            self.search_input.clear();
        } else if state.is_searching() {
            self.store.clear_search();
            self.list_idx = 0;
            self.detail_scroll = 0;
        } else if state.selected_date.is_some() {
            self.store.clear_date();
            self.list_idx = 0;
            self.detail_scroll = 0;
            self.focus = Focus::Grid;
        } else {
            self.should_quit = true;
        }
    }

    fn list_len(state: &TimelineState) -> usize {
        match state.list_view() {
            ListView::Search { results, .. } => results.len(),
            ListView::Day { conversations, .. } => conversations.len(),
            ListView::Empty => 0,
        }
    }

    fn list_id(state: &TimelineState, idx: usize) -> Option<String> {
        let items = match state.list_view() {
            ListView::Search { results, .. } => results,
            ListView::Day { conversations, .. } => conversations,
            ListView::Empty => return None,
        };
        items.get(idx).map(|summary| summary.id.clone())
    }

    fn move_vertical(&mut self, delta: isize, state: &TimelineState, window: &Window) {
        match self.focus {
            Focus::Grid => {
                let Some(idx) = self.grid_cursor else { return };
                let Some(cell) = window.cells.get(idx) else { return };
                let target = cell.row as isize + delta;
                if (0..WEEK_ROWS as isize).contains(&target) {
                    let next = idx as isize + delta;
                    if next >= 0 && (next as usize) < window.cells.len() {
                        self.grid_cursor = Some(next as usize);
                        self.needs_redraw = true;
                    }
                }
            }
            Focus::List => self.move_list(delta, state),
            Focus::Detail => self.scroll_detail(delta),
        }
    }

    fn move_page(&mut self, direction: isize, state: &TimelineState) {
        let delta = direction * PAGE_STEP as isize;
        match self.focus {
            Focus::Grid => {}
            Focus::List => self.move_list(delta, state),
            Focus::Detail => self.scroll_detail(delta),
        }
    }

    fn move_grid_column(&mut self, delta: isize, window: &Window) {
        if self.focus != Focus::Grid {
            return;
        }
        let Some(idx) = self.grid_cursor else { return };
        let next = idx as isize + delta * WEEK_ROWS as isize;
        let last = window.cells.len() as isize - 1;
        let clamped = next.clamp(0, last.max(0)) as usize;
        if clamped != idx {
            self.grid_cursor = Some(clamped);
            self.needs_redraw = true;
        }
    }

    fn move_list(&mut self, delta: isize, state: &TimelineState) {
        let total = Self::list_len(state);
        if total == 0 {
            self.list_idx = 0;
            return;
        }
        let old_idx = self.list_idx;
        let new_idx = (self.list_idx as isize + delta).max(0) as usize;
        self.list_idx = new_idx.min(total - 1);
        if old_idx != self.list_idx {
            self.needs_redraw = true;
        }
    }

    fn scroll_detail(&mut self, delta: isize) {
        let next = (self.detail_scroll as isize + delta).clamp(0, u16::MAX as isize) as u16;
        if next != self.detail_scroll {
            self.detail_scroll = next;
            self.needs_redraw = true;
        }
    }

    fn select(&mut self, state: &TimelineState, window: &Window) {
        if self.input_mode == InputMode::Search {
            self.submit_search();
            return;
        }
        match self.focus {
            Focus::Grid => {
                let Some(cell) = self.grid_cursor.and_then(|i| window.cells.get(i)) else {
                    return;
                };
                self.open_day(cell.date);
            }
            Focus::List => {
                let Some(id) = Self::list_id(state, self.list_idx) else { return };
                self.detail_scroll = 0;
                self.focus = Focus::Detail;
                self.needs_redraw = true;
                let store = Arc::clone(&self.store);
                self.spawn(async move { store.select_conversation(&id).await });
            }
            Focus::Detail => {}
        }
    }

    fn open_day(&mut self, date: NaiveDate) {
        debug!(%date, "opening day");
        self.list_idx = 0;
        self.detail_scroll = 0;
        self.focus = Focus::List;
        self.needs_redraw = true;
        let store = Arc::clone(&self.store);
        self.spawn(async move { store.select_date(date).await });
    }

    fn submit_search(&mut self) {
        let query = self.search_input.trim().to_string();
        self.input_mode = InputMode::Browse;
        self.search_input.clear();
        self.needs_redraw = true;
        if query.is_empty() {
            return;
        }
        self.list_idx = 0;
        self.detail_scroll = 0;
        self.focus = Focus::List;
        let store = Arc::clone(&self.store);
        self.spawn(async move { store.search(&query).await });
    }

    fn step_year(&mut self, state: &TimelineState, older: bool) {
        match year_step(&state.available_years, state.selected_year, older) {
            Some(target) => self.change_year(target),
            None => self.set_status(
                if older { "No older year" } else { "Already showing the latest data" },
                MessageType::Error,
                STATUS_ERROR_DURATION_MS,
            ),
        }
    }

    fn change_year(&mut self, year: Option<i32>) {
        self.list_idx = 0;
        self.detail_scroll = 0;
        let store = Arc::clone(&self.store);
        self.spawn(async move {
            store.select_year(year).await;
        });
    }

    fn copy_active(&mut self, state: &TimelineState) {
        let Some(detail) = &state.active_conversation else {
            self.set_status("✗ No conversation open", MessageType::Error, STATUS_ERROR_DURATION_MS);
            return;
        };
        match copy_conversation(detail) {
            Ok(()) => self.set_status(
                "✓ Conversation copied as markdown",
                MessageType::Success,
                STATUS_SUCCESS_DURATION_MS,
            ),
            Err(e) => self.set_status(
                format!("✗ Clipboard error: {}", e),
                MessageType::Error,
                STATUS_ERROR_DURATION_MS,
            ),
        }
    }

    #[cfg(test)]
    fn wait_for_tasks(&mut self) {
        for task in self.in_flight.drain(..) {
            let _ = self.runtime.block_on(task);
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        for task in &self.in_flight {
            task.abort();
        }
        self.store.unsubscribe(self.subscription);
    }
}
