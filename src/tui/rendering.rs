use chrono::Utc;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use super::app::{Focus, MessageType, StatusMessage};
use super::events::InputMode;
use super::layout::AppLayout;
use super::timestamps::format_timestamp;
use crate::models::{ConversationDetail, ConversationSummary};
use crate::timeline::window::WEEK_ROWS;
use crate::timeline::{Cell, ListView, Phase, TimelineState, Window};

const MUTED: Color = Color::Rgb(113, 113, 122);
const BRIGHT: Color = Color::Rgb(250, 250, 250);
const EMERALD: Color = Color::Rgb(16, 185, 129);
const RED: Color = Color::Rgb(239, 68, 68);
const BAR_BG: Color = Color::Rgb(24, 24, 27);
const LEVEL_COLORS: [Color; 5] = [
    Color::Rgb(63, 63, 70),
    Color::Rgb(14, 68, 41),
    Color::Rgb(0, 109, 50),
    Color::Rgb(38, 166, 65),
    Color::Rgb(57, 211, 83),
];
/// Terminal columns per heatmap cell (glyph + gap)
const CELL_WIDTH: usize = 2;

/// Everything needed to draw one frame
pub struct RenderState<'a> {
    pub state: &'a TimelineState,
    pub window: &'a Window,
    pub visible_count: u64,
    pub range_label: &'a str,
    pub focus: Focus,
    pub grid_cursor: Option<usize>,
    pub list_idx: usize,
    pub detail_scroll: u16,
    pub input_mode: InputMode,
    pub search_input: &'a str,
    pub status_message: Option<&'a StatusMessage>,
}

impl RenderState<'_> {
    fn cursor_cell(&self) -> Option<&Cell> {
        self.grid_cursor.and_then(|idx| self.window.cells.get(idx))
    }
}

/// Render the entire UI
pub fn render_ui(frame: &mut Frame, view: &RenderState) {
    let area = frame.area();
    match &view.state.phase {
        Phase::Failed(message) => {
            render_fatal(frame, area, message);
            return;
        }
        Phase::Loading => {
            render_loading(frame, area);
            return;
        }
        Phase::Ready | Phase::Disposed => {}
    }

    let layout = AppLayout::new(area);
    render_header(frame, layout.header_area, view);
    render_heatmap(frame, layout.heatmap_area, view);
    render_list(frame, layout.list_area, view);
    render_detail(frame, layout.detail_area, view);
    render_status_bar(frame, layout.status_area, view);
}

/// First visible heatmap column.
///
/// The rolling window is anchored to its newest column; a year starts at January.
/// Either way the cursor column is kept in view.
pub fn grid_offset(
    total_columns: usize,
    visible_columns: usize,
    cursor_column: Option<usize>,
    rolling: bool,
) -> usize {
    if visible_columns == 0 || total_columns <= visible_columns {
        return 0;
    }
    let max_offset = total_columns - visible_columns;
    let mut offset = if rolling { max_offset } else { 0 };
    if let Some(col) = cursor_column {
        if col < offset {
            offset = col;
        } else if col >= offset + visible_columns {
            offset = col + 1 - visible_columns;
        }
    }
    offset.min(max_offset)
}

fn border_style(focused: bool) -> Style {
    if focused { Style::default().fg(EMERALD) } else { Style::default().fg(MUTED) }
}

fn render_fatal(frame: &mut Frame, area: Rect, message: &str) {
    let text = Text::from(vec![
        Line::from(""),
        Line::styled(
            "Failed to load the conversation archive",
            Style::default().fg(RED).add_modifier(Modifier::BOLD),
        ),
        Line::from(""),
        Line::from(message.to_string()),
        Line::from(""),
        Line::styled("Press q to quit", Style::default().fg(MUTED)),
    ]);
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(RED)));
    frame.render_widget(paragraph, area);
}

fn render_loading(frame: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new(Text::from(vec![
        Line::from(""),
        Line::styled("Loading archive…", Style::default().fg(MUTED)),
    ]))
    .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn render_header(frame: &mut Frame, area: Rect, view: &RenderState) {
    let mode = match view.state.selected_year {
        Some(year) => format!("Year {}", year),
        None => "Last 12 months".to_string(),
    };

    let mut spans = vec![
        Span::styled(" Chat Timeline ", Style::default().fg(BAR_BG).bg(EMERALD)),
        Span::raw(" "),
        Span::styled(mode, Style::default().fg(BRIGHT).add_modifier(Modifier::BOLD)),
        Span::styled(" │ ", Style::default().fg(MUTED)),
        Span::raw(view.range_label.to_string()),
        Span::styled(" │ ", Style::default().fg(MUTED)),
        Span::styled("Conversations: ", Style::default().fg(MUTED)),
        Span::raw(view.visible_count.to_string()),
    ];
    if let Some(stats) = &view.state.stats {
        spans.push(Span::styled(" │ ", Style::default().fg(MUTED)));
        spans.push(Span::styled(
            format!("{} total, {} messages", stats.total_conversations, stats.total_messages),
            Style::default().fg(MUTED),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_heatmap(frame: &mut Frame, area: Rect, view: &RenderState) {
    let title = match view.cursor_cell() {
        Some(cell) => format!(" Activity · {} · {} ", cell.date.format("%a %Y-%m-%d"), cell.count),
        None => " Activity ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(view.focus == Focus::Grid))
        .title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if view.window.cells.is_empty() {
        let empty = Paragraph::new("No activity data for this period")
            .style(Style::default().fg(MUTED))
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    let visible = (inner.width as usize / CELL_WIDTH).max(1);
    let offset = grid_offset(
        view.window.column_count(),
        visible,
        view.cursor_cell().map(|c| c.column),
        view.state.is_rolling(),
    );
    let lines = heatmap_lines(
        view.window,
        offset,
        visible,
        view.cursor_cell().map(|c| c.date),
        view.state.selected_date,
    );
    frame.render_widget(Paragraph::new(lines), inner);
}

fn heatmap_lines(
    window: &Window,
    offset: usize,
    visible: usize,
    cursor: Option<chrono::NaiveDate>,
    selected: Option<chrono::NaiveDate>,
) -> Vec<Line<'static>> {
    let columns = window.column_count();
    let last = (offset + visible).min(columns);

    // Month labels, skipping any that would overlap the previous one
    let mut label_row = vec![' '; visible * CELL_WIDTH];
    let mut next_free = 0;
    for label in &window.month_labels {
        if label.column < offset || label.column >= last {
            continue;
        }
        let start = (label.column - offset) * CELL_WIDTH;
        if start < next_free {
            continue;
        }
        for (i, ch) in label.text.chars().enumerate() {
            if let Some(slot) = label_row.get_mut(start + i) {
                *slot = ch;
            }
        }
        next_free = start + label.text.len() + 1;
    }

    let mut lines = Vec::with_capacity(WEEK_ROWS + 1);
    lines.push(Line::styled(label_row.into_iter().collect::<String>(), Style::default().fg(MUTED)));

    let mut grid: Vec<Option<&Cell>> = vec![None; columns * WEEK_ROWS];
    for cell in &window.cells {
        grid[cell.column * WEEK_ROWS + cell.row] = Some(cell);
    }

    for row in 0..WEEK_ROWS {
        let spans: Vec<Span<'static>> = (offset..last)
            .map(|col| match grid[col * WEEK_ROWS + row] {
                Some(cell) => {
                    cell_span(cell, cursor == Some(cell.date), selected == Some(cell.date))
                }
                None => Span::raw("  "),
            })
            .collect();
        lines.push(Line::from(spans));
    }
    lines
}

fn cell_span(cell: &Cell, is_cursor: bool, is_selected: bool) -> Span<'static> {
    let glyph = if cell.level == 0 { "· " } else { "■ " };
    let mut style = Style::default().fg(LEVEL_COLORS[usize::from(cell.level.min(4))]);
    if is_selected {
        style = style.bg(Color::Rgb(39, 39, 42)).add_modifier(Modifier::BOLD);
    }
    if is_cursor {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(glyph, style)
}

fn render_list(frame: &mut Frame, area: Rect, view: &RenderState) {
    let now = Utc::now();
    let open_id = view.state.selected_conversation_id.as_deref();

    let (title, rows, placeholder): (String, Vec<String>, &str) = match view.state.list_view() {
        ListView::Search { query, results, in_flight } => (
            format!(" Search: {} ({}) ", query, results.len()),
            results.iter().map(|s| search_row(s, &now, open_id)).collect(),
            if in_flight { "Searching…" } else { "No results" },
        ),
        ListView::Day { date, conversations, loading } => (
            format!(" {} ({}) ", date.format("%a %Y-%m-%d"), conversations.len()),
            conversations.iter().map(|s| day_row(s, open_id)).collect(),
            if loading { "Loading…" } else { "No conversations on this day" },
        ),
        ListView::Empty => (
            " Conversations ".to_string(),
            Vec::new(),
            "Select a day with Enter or press / to search",
        ),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(view.focus == Focus::List))
        .title(title);

    if rows.is_empty() {
        let paragraph = Paragraph::new(placeholder)
            .style(Style::default().fg(MUTED))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = rows.into_iter().map(ListItem::new).collect();
    let highlight = if view.focus == Focus::List {
        Style::default().fg(BRIGHT).bg(EMERALD).add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let list = List::new(items)
        .block(block)
        .style(Style::default().fg(Color::Rgb(212, 212, 216)))
        .highlight_style(highlight);
    let mut state = ListState::default().with_selected(Some(view.list_idx));
    frame.render_stateful_widget(list, area, &mut state);
}

fn open_marker(summary: &ConversationSummary, open_id: Option<&str>) -> &'static str {
    if open_id == Some(summary.id.as_str()) { "▸ " } else { "  " }
}

fn day_row(summary: &ConversationSummary, open_id: Option<&str>) -> String {
    let time = summary.create_time.map(|t| t.format("%H:%M").to_string()).unwrap_or_default();
    let messages = summary.message_count.map(|n| format!(" · {} msgs", n)).unwrap_or_default();
    format!(
        "{}{} {} · {}{}",
        open_marker(summary, open_id),
        time,
        summary.title,
        summary.model_label(),
        messages
    )
}

fn search_row(
    summary: &ConversationSummary,
    now: &chrono::DateTime<Utc>,
    open_id: Option<&str>,
) -> String {
    let when = summary.create_time.map(|t| format_timestamp(&t, now)).unwrap_or_default();
    let title = if summary.title.is_empty() { "(no title)" } else { summary.title.as_str() };
    format!("{}{} │ {}", open_marker(summary, open_id), when, title)
}

fn render_detail(frame: &mut Frame, area: Rect, view: &RenderState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(view.focus == Focus::Detail))
        .title(" Conversation ");

    let text = match &view.state.active_conversation {
        Some(detail) => conversation_text(detail),
        None if view.state.conversation_loading => {
            Text::styled("Loading conversation…", Style::default().fg(MUTED))
        }
        None => Text::styled("No conversation selected", Style::default().fg(MUTED)),
    };

    let paragraph =
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }).scroll((view.detail_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn role_color(role: Option<&str>) -> Color {
    match role {
        Some("user") => Color::Rgb(96, 165, 250),
        Some("assistant") => EMERALD,
        Some("system") => MUTED,
        _ => Color::Rgb(250, 204, 21),
    }
}

fn conversation_text(detail: &ConversationDetail) -> Text<'static> {
    let created = detail
        .create_time
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut lines = vec![
        Line::styled(detail.title.clone(), Style::default().fg(BRIGHT).add_modifier(Modifier::BOLD)),
        Line::from(vec![
            Span::styled("Model: ", Style::default().fg(MUTED)),
            Span::raw(detail.model_label().to_string()),
            Span::styled("  Created: ", Style::default().fg(MUTED)),
            Span::raw(created),
        ]),
    ];

    for message in detail.visible_messages() {
        lines.push(Line::from(""));
        let mut header = message.role_label();
        if let Some(name) = message.name.as_deref().filter(|n| !n.is_empty()) {
            header.push_str(&format!(" ({})", name));
        }
        lines.push(Line::styled(
            header,
            Style::default().fg(role_color(message.role.as_deref())).add_modifier(Modifier::BOLD),
        ));
        for line in message.content.trim_end().lines() {
            lines.push(Line::from(line.to_string()));
        }
    }

    Text::from(lines)
}

fn render_status_bar(frame: &mut Frame, area: Rect, view: &RenderState) {
    let base = Style::default().fg(BRIGHT).bg(BAR_BG);

    let (text, style) = if view.input_mode == InputMode::Search {
        (format!(" / {}▏  Enter: search | Esc: cancel ", view.search_input), base)
    } else if let Some(status) = view.status_message {
        let fg = match status.message_type {
            MessageType::Success => EMERALD,
            MessageType::Error => RED,
        };
        (format!(" {} ", status.text), base.fg(fg))
    } else {
        let mut parts = vec!["←↑↓→: move", "Enter: open", "Tab: focus", "/: search"];
        parts.push("[ ]: year");
        if view.state.selected_year.is_some() {
            parts.push("r: last 12 months");
        }
        if view.state.active_conversation.is_some() {
            parts.push("Ctrl+Y: copy");
        }
        parts.push("Esc: back");
        parts.push("q: quit");
        (format!(" {} ", parts.join(" | ")), base)
    };

    frame.render_widget(Paragraph::new(text).style(style), area);
}
