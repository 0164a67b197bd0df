use crate::ui::conversation::commands::{command_entries, parse_slash_command, CommandEntry, ParsedCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the conversation composer
#[derive(Debug, PartialEq)]
pub enum ConversationResult {
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// Single-line input box. The cursor counts characters, not bytes.
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    content: String,
    cursor: usize,
    placeholder: String,
    busy: bool,
    command_entries: Vec<CommandEntry>,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            placeholder: placeholder.into(),
            busy: false,
            command_entries: command_entries(),
        }
    }

    /// Handle key input.
    ///
    /// Enter reports the text but leaves it in place; the caller clears it
    /// once the text was actually taken.
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationResult {
        if key.kind != KeyEventKind::Press {
            return ConversationResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if self.content.trim().is_empty() {
                    return ConversationResult::None;
                }
                if let Some(command) = parse_slash_command(&self.content) {
                    self.clear();
                    return ConversationResult::Command(command);
                }
                return ConversationResult::Submitted(self.content.clone());
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear();
            }
            KeyCode::Char(c)
                if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                let at = self.byte_index(self.cursor);
                self.content.insert(at, c);
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index(self.cursor);
                    self.content.remove(at);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.char_count() {
                    let at = self.byte_index(self.cursor);
                    self.content.remove(at);
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_count());
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = self.char_count();
            }
            _ => {}
        }

        ConversationResult::None
    }

    #[cfg(test)]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Clear content
    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    /// Dim the box while a reply is streaming
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map_or(self.content.len(), |(index, _)| index)
    }

    fn matching_commands(&self) -> Vec<CommandEntry> {
        let Some(query) = self.content.strip_prefix('/') else {
            return Vec::new();
        };
        if query.contains(char::is_whitespace) {
            return Vec::new();
        }
        let query = query.to_lowercase();
        self.command_entries
            .iter()
            .filter(|entry| entry.keyword.starts_with(&query))
            .copied()
            .collect()
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.busy {
            "⏳ Đang trả lời..."
        } else {
            "✍ Câu hỏi"
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(if self.busy {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Blue)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            // Keep the cursor in view on long input
            let width = inner_area.width.saturating_sub(1) as usize;
            let skip = self.cursor.saturating_sub(width);
            let mut visible: String = self.content.chars().skip(skip).collect();
            let cursor_at = visible
                .char_indices()
                .nth(self.cursor - skip)
                .map_or(visible.len(), |(index, _)| index);
            if !self.busy {
                visible.insert(cursor_at, '▌');
            }
            let line = Line::from(vec![Span::styled(visible, Style::default().fg(Color::White))]);
            buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
        }

        // Command hints sit on the border line above the box
        let matches = self.matching_commands();
        if !matches.is_empty() && area.y > 0 {
            let mut spans = Vec::new();
            for entry in matches {
                spans.push(Span::styled(
                    format!("/{}", entry.keyword),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::styled(
                    format!(" {}  ", entry.description),
                    Style::default().fg(Color::Gray),
                ));
            }
            buf.set_line(area.x, area.y - 1, &Line::from(spans), area.width);
        }
    }
}
