use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Heatmap block: two border rows, one month-label row, seven day rows
const HEATMAP_HEIGHT: u16 = 10;

pub struct AppLayout {
    pub header_area: Rect,
    pub heatmap_area: Rect,
    pub list_area: Rect,
    pub detail_area: Rect,
    pub status_area: Rect,
}

impl AppLayout {
    /// Stacked layout:
    /// - Header: top row
    /// - Heatmap: fixed height, full width
    /// - Conversation list (40%) | transcript (60%)
    /// - Status bar: bottom row
    pub fn new(area: Rect) -> Self {
        let vertical_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(HEATMAP_HEIGHT),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        let horizontal_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(vertical_chunks[2]);

        Self {
            header_area: vertical_chunks[0],
            heatmap_area: vertical_chunks[1],
            list_area: horizontal_chunks[0],
            detail_area: horizontal_chunks[1],
            status_area: vertical_chunks[3],
        }
    }
}
