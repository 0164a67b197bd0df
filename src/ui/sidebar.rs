//! School links and contacts panel

use crate::prompts::{self, SidebarEntry};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

pub const SIDEBAR_WIDTH: u16 = 36;

pub struct Sidebar;

impl Sidebar {
    fn section(title: &'static str, entries: &[SidebarEntry], lines: &mut Vec<Line<'static>>) {
        lines.push(Line::from(Span::styled(
            title,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
        )));
        for entry in entries {
            lines.push(Line::from(Span::styled(
                entry.label,
                Style::default().fg(Color::White),
            )));
            lines.push(Line::from(Span::styled(
                format!("  {}", entry.value),
                Style::default().fg(Color::Cyan),
            )));
        }
        lines.push(Line::from(""));
    }
}

impl Widget for Sidebar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut lines = Vec::new();
        Self::section("THÔNG TIN CHUNG", &prompts::SIDEBAR_LINKS, &mut lines);
        Self::section("LIÊN HỆ", &prompts::SIDEBAR_CONTACTS, &mut lines);
        lines.push(Line::from(Span::styled(
            "Ctrl+B để đóng",
            Style::default().fg(Color::DarkGray),
        )));

        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Blue))
                    .title("🎓 DUT Assistant"),
            )
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
