//! Conversation history display component

use crate::events::{Message, Role};
use crate::prompts;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Read-only view over the conversation for one frame
pub struct ConversationHistory<'a> {
    messages: &'a [Message],
    /// Id of the model message still receiving fragments
    streaming_id: Option<&'a str>,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(messages: &'a [Message], streaming_id: Option<&'a str>) -> Self {
        Self {
            messages,
            streaming_id,
        }
    }

    fn welcome_lines(width: u16) -> Vec<Line<'static>> {
        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("✨ {}", prompts::WELCOME_TITLE),
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            )),
        ];
        for text in wrap_text(prompts::WELCOME_TEXT, width.saturating_sub(2) as usize) {
            lines.push(Line::from(Span::styled(text, Style::default().fg(Color::Gray))));
        }
        lines.push(Line::from(""));

        for (index, suggestion) in prompts::SUGGESTIONS.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(
                    format!(" F{} ", index + 1),
                    Style::default().fg(Color::Black).bg(Color::Cyan),
                ),
                Span::styled(
                    format!(" {}", suggestion.label),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
            ]));
            for text in wrap_text(suggestion.prompt, width.saturating_sub(6) as usize) {
                lines.push(Line::from(vec![
                    Span::raw("     "),
                    Span::styled(text, Style::default().fg(Color::DarkGray)),
                ]));
            }
        }
        lines
    }

    /// Render a single message into lines
    fn render_message(&self, message: &Message, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let role_icon = match message.role {
            Role::User => "👤",
            Role::Model => "🤖",
        };
        let timestamp = message.timestamp.format("%H:%M").to_string();
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} {} ", role_icon, message.role.display_name()),
                self.get_content_style(message.role).add_modifier(Modifier::BOLD),
            ),
            Span::styled(timestamp, Style::default().fg(Color::DarkGray)),
        ]));

        let is_streaming = self.streaming_id == Some(message.id.as_str());
        if is_streaming && message.content.is_empty() {
            lines.push(typing_indicator());
            return lines;
        }

        let content_lines = wrap_text(&message.content, width.saturating_sub(2) as usize);
        let last = content_lines.len().saturating_sub(1);
        for (i, content_line) in content_lines.into_iter().enumerate() {
            let mut spans = vec![
                Span::raw("  "),
                Span::styled(content_line, self.get_content_style(message.role)),
            ];
            if is_streaming && i == last {
                spans.push(Span::styled("▋", Style::default().fg(Color::Yellow)));
            }
            lines.push(Line::from(spans));
        }

        lines
    }

    /// Get content style based on role
    fn get_content_style(&self, role: Role) -> Style {
        match role {
            Role::User => Style::default().fg(Color::Cyan),
            Role::Model => Style::default().fg(Color::White),
        }
    }
}

fn typing_indicator() -> Line<'static> {
    let phase = (chrono::Local::now().timestamp_millis() / 300) % 3;
    let dots: String = (0..3)
        .map(|i| if i == phase { '●' } else { '·' })
        .collect();
    Line::from(vec![
        Span::raw("  "),
        Span::styled(dots, Style::default().fg(Color::Blue)),
    ])
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!("💬 {}", prompts::APP_TITLE));

        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = if self.messages.is_empty() {
            Self::welcome_lines(inner_area.width)
        } else {
            let mut all_lines: Vec<Line> = Vec::new();
            for message in self.messages {
                all_lines.extend(self.render_message(message, inner_area.width));
                // spacing between messages
                all_lines.push(Line::from(""));
            }
            all_lines
        };

        // Keep the newest lines in view
        let height = inner_area.height as usize;
        let start = if self.messages.is_empty() {
            0
        } else {
            all_lines.len().saturating_sub(height)
        };

        for (i, line) in all_lines.iter().skip(start).take(height).enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Wrap text to fit within `width` columns, keeping the text's own line
/// breaks. Widths are counted in characters.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current_line = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = word.chars().count();
            if current_width > 0 && current_width + 1 + word_width > width {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            }
            if current_width > 0 {
                current_line.push(' ');
                current_width += 1;
            }

            // Hard-split words longer than a whole line
            let mut chars = word.chars().peekable();
            while chars.peek().is_some() {
                if current_width == width {
                    lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                }
                if let Some(c) = chars.next() {
                    current_line.push(c);
                    current_width += 1;
                }
            }
        }
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}
