use std::io;

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use futures::StreamExt;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::time::Duration;

use crate::config::{Config, UiConfig};
use crate::conversation::{ConversationController, SubmitOutcome};
use crate::llm::{ChatClient, GeminiClient};
use crate::prompts;
use crate::session::SessionManager;
use crate::ui::conversation::{
    get_help_text, ConversationComposer, ConversationHistory, ConversationResult, ParsedCommand,
    SlashCommand,
};
use crate::ui::sidebar::{Sidebar, SIDEBAR_WIDTH};

const TICK: Duration = Duration::from_millis(50);

/// Open the chat screen and run until the user quits
pub async fn run(config: &Config) -> Result<()> {
    let client = GeminiClient::new(config)?;
    if config.api_key().is_none() {
        tracing::warn!("no API key configured; replies will fail until one is set");
    }
    let sessions = SessionManager::new(client, config.chat_settings());
    let mut app = App::new(ConversationController::new(sessions), &config.ui);

    // Give the terminal back before the panic message is printed
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        default_hook(info);
    }));

    let mut terminal = match enter_terminal() {
        Ok(terminal) => terminal,
        Err(error) => {
            let _ = restore_terminal();
            return Err(error);
        }
    };

    let result = app.event_loop(&mut terminal).await;

    // Restore the terminal even when the loop failed
    restore_terminal()?;
    terminal.show_cursor()?;

    result
}

fn enter_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)
}

/// Chat screen state: the conversation plus everything around it
pub struct App<C: ChatClient> {
    controller: ConversationController<C>,
    composer: ConversationComposer,
    show_sidebar: bool,
    confirm_reset: bool,
    confirming_reset: bool,
    notice: Option<String>,
    should_quit: bool,
}

impl<C: ChatClient> App<C> {
    pub fn new(controller: ConversationController<C>, ui: &UiConfig) -> Self {
        Self {
            controller,
            composer: ConversationComposer::new(prompts::INPUT_PLACEHOLDER),
            show_sidebar: ui.show_sidebar,
            confirm_reset: ui.confirm_reset,
            confirming_reset: false,
            notice: None,
            should_quit: false,
        }
    }

    async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut events = EventStream::new();
        // Redraws the typing indicator while nothing else happens
        let mut ticker = tokio::time::interval(TICK);

        while !self.should_quit {
            self.tick();
            terminal.draw(|frame| self.draw(frame))?;

            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.controller.pump() => {}
                event = events.next() => match event {
                    Some(Ok(Event::Key(key))) => self.handle_key(key),
                    Some(Ok(_)) => {}
                    Some(Err(error)) => return Err(error).context("Failed to read terminal event"),
                    None => break,
                },
            }
        }
        Ok(())
    }

    /// Apply whatever the reply streams have produced since the last frame
    pub fn tick(&mut self) {
        self.controller.drain_updates();
        self.composer.set_busy(self.controller.is_awaiting());
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.confirming_reset {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.confirming_reset = false;
                    self.perform_reset();
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.confirming_reset = false;
                }
                _ => {}
            }
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => self.should_quit = true,
            KeyCode::Char('n') if ctrl => self.request_reset(),
            KeyCode::Char('b') if ctrl => self.show_sidebar = !self.show_sidebar,
            KeyCode::F(number @ 1..=4) => {
                // Shortcuts are only offered on the empty screen
                if self.controller.messages().is_empty() {
                    self.send_suggestion(number as usize);
                }
            }
            _ => match self.composer.handle_key(key) {
                ConversationResult::Submitted(text) => self.send(&text),
                ConversationResult::Command(command) => self.run_command(command),
                ConversationResult::None => {}
            },
        }
    }

    fn send(&mut self, text: &str) {
        match self.controller.submit(text) {
            SubmitOutcome::Accepted => {
                self.composer.clear();
                self.notice = None;
            }
            SubmitOutcome::Busy => {
                self.notice = Some("Vui lòng đợi câu trả lời hiện tại.".to_string());
            }
            SubmitOutcome::Empty => {}
        }
    }

    fn send_suggestion(&mut self, number: usize) {
        match prompts::suggestion(number) {
            Some(suggestion) => self.send(suggestion.prompt),
            None => {
                self.notice = Some(format!(
                    "Chỉ có {} câu hỏi gợi ý.",
                    prompts::SUGGESTIONS.len()
                ));
            }
        }
    }

    fn run_command(&mut self, command: ParsedCommand) {
        match command.command {
            SlashCommand::New => self.request_reset(),
            SlashCommand::Suggest => match command.suggestion_number() {
                Some(number) => self.send_suggestion(number),
                None => self.notice = Some("Dùng: /suggest <1-4>".to_string()),
            },
            SlashCommand::Sidebar => self.show_sidebar = !self.show_sidebar,
            SlashCommand::Help => self.notice = Some(get_help_text()),
            SlashCommand::Quit => self.should_quit = true,
        }
    }

    /// Ask first when there is something to lose
    fn request_reset(&mut self) {
        if self.confirm_reset && !self.controller.messages().is_empty() {
            self.confirming_reset = true;
        } else {
            self.perform_reset();
        }
    }

    fn perform_reset(&mut self) {
        self.controller.reset();
        self.composer.clear();
        self.notice = None;
        self.show_sidebar = false;
    }

    pub fn draw(&self, frame: &mut Frame) {
        let mut area = frame.size();

        if self.show_sidebar && area.width >= SIDEBAR_WIDTH + 40 {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(40)])
                .split(area);
            frame.render_widget(Sidebar, columns[0]);
            area = columns[1];
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Min(5),    // History
                Constraint::Length(3), // Composer
                Constraint::Length(1), // Footer
            ])
            .split(area);

        frame.render_widget(Paragraph::new(self.header_line()), rows[0]);

        let streaming_id = self.controller.streaming_message().map(|m| m.id.as_str());
        frame.render_widget(
            ConversationHistory::new(self.controller.messages(), streaming_id),
            rows[1],
        );
        frame.render_widget(&self.composer, rows[2]);

        let footer = match &self.notice {
            Some(notice) => Span::styled(notice.as_str(), Style::default().fg(Color::Yellow)),
            None => Span::styled(prompts::DISCLAIMER, Style::default().fg(Color::DarkGray)),
        };
        frame.render_widget(Paragraph::new(Line::from(footer)), rows[3]);

        if self.confirming_reset {
            let dialog = centered_rect(56, 7, frame.size());
            frame.render_widget(Clear, dialog);
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from(prompts::RESET_CONFIRMATION),
                    Line::from(""),
                    Line::from(vec![
                        Span::styled("(y) ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
                        Span::raw("Đồng ý   "),
                        Span::styled("(n) ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
                        Span::raw("Hủy"),
                    ]),
                ])
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Yellow))
                        .title("Cuộc trò chuyện mới"),
                ),
                dialog,
            );
        }
    }

    fn header_line(&self) -> Line<'static> {
        Line::from(vec![
            Span::styled(
                format!(" {} ", prompts::APP_TITLE),
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            ),
            Span::styled("● Online", Style::default().fg(Color::Green)),
            Span::styled(
                "   Ctrl+N cuộc trò chuyện mới · Ctrl+B thông tin · /help",
                Style::default().fg(Color::DarkGray),
            ),
        ])
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
