use agent_knowledge::client::HttpKnowledgeClient;
use agent_knowledge::knowledge::AgentId;
use agent_knowledge::panel::{ConfirmRequest, IngestSurface, PanelHandle, PanelView};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

const PREVIEW_CHARS: usize = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Insert,
}

pub struct App {
    agent: AgentId,
    panel: PanelHandle,
    surface: Arc<Mutex<IngestSurface<HttpKnowledgeClient>>>,
    connected: Arc<AtomicBool>,
    mode: Mode,
    selected: usize,
    pending: Option<ConfirmRequest>,
}

impl App {
    pub fn new(
        agent: AgentId,
        panel: PanelHandle,
        surface: Arc<Mutex<IngestSurface<HttpKnowledgeClient>>>,
        connected: Arc<AtomicBool>,
    ) -> Self {
        Self {
            agent,
            panel,
            surface,
            connected,
            mode: Mode::Browse,
            selected: 0,
            pending: None,
        }
    }

    /// Show a confirmation prompt; answered with y/n
    pub fn ask(&mut self, request: ConfirmRequest) {
        // A newer prompt supersedes an unanswered one
        if let Some(old) = self.pending.replace(request) {
            old.answer(false);
        }
    }

    /// Returns `false` when the user asked to quit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if let Some(request) = self.pending.take() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => request.answer(true),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => request.answer(false),
                _ => self.pending = Some(request),
            }
            return true;
        }

        match self.mode {
            Mode::Browse => self.handle_browse_key(key),
            Mode::Insert => {
                self.handle_insert_key(key);
                true
            }
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> bool {
        let view = self.panel.snapshot();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('i') => self.mode = Mode::Insert,
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < view.items.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('r') => {
                self.panel.refresh_handle().refresh();
            }
            KeyCode::Char('d') => {
                if let Some(chunk) = view.items.get(self.selected) {
                    self.panel.request_delete(chunk.id);
                }
            }
            KeyCode::Char('C') => {
                if view.can_clear() {
                    self.panel.request_clear_all();
                }
            }
            _ => {}
        }
        true
    }

    fn handle_insert_key(&mut self, key: KeyEvent) {
        // Keys are ignored while a submit holds the surface
        let Ok(mut surface) = self.surface.try_lock() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.mode = Mode::Browse,
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
                surface.draft_mut().push('\n')
            }
            KeyCode::Enter => {
                drop(surface);
                let surface = Arc::clone(&self.surface);
                tokio::spawn(async move {
                    surface.lock().await.submit().await;
                });
            }
            KeyCode::Backspace => {
                surface.draft_mut().pop();
            }
            KeyCode::Char(c) => surface.draft_mut().push(c),
            _ => {}
        }
    }

    pub fn render(&mut self, f: &mut Frame) {
        let view = self.panel.snapshot();
        self.selected = self.selected.min(view.items.len().saturating_sub(1));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(5),
                Constraint::Length(3),
            ])
            .split(f.area());

        self.render_header(f, chunks[0], &view);
        self.render_items(f, chunks[1], &view);
        self.render_ingest(f, chunks[2]);
        self.render_footer(f, chunks[3]);

        if let Some(request) = &self.pending {
            render_confirm(f, request.prompt.message());
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect, view: &PanelView) {
        let (dot, dot_color) = if self.connected.load(Ordering::Relaxed) {
            ("● live", Color::Green)
        } else {
            ("○ offline", Color::DarkGray)
        };
        let mut spans = vec![
            Span::styled(
                " AGENT KNOWLEDGE ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" {} ", self.agent), Style::default().fg(Color::White)),
            Span::styled(dot, Style::default().fg(dot_color)),
        ];
        if view.loading {
            spans.push(Span::styled("  loading...", Style::default().fg(Color::Yellow)));
        }
        if view.clearing {
            spans.push(Span::styled("  clearing...", Style::default().fg(Color::Yellow)));
        }
        f.render_widget(
            Paragraph::new(Line::from(spans)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray)),
            ),
            area,
        );
    }

    fn render_items(&self, f: &mut Frame, area: Rect, view: &PanelView) {
        let title = format!(" Knowledge ({}) ", view.items.len());
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(title, Style::default().fg(Color::Cyan)));

        if view.items.is_empty() {
            let text = if view.loading { "Loading..." } else { "No knowledge yet. Press i to add some." };
            f.render_widget(
                Paragraph::new(text)
                    .fg(Color::DarkGray)
                    .alignment(Alignment::Center)
                    .block(block),
                area,
            );
            return;
        }

        let items: Vec<ListItem> = view
            .items
            .iter()
            .map(|chunk| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        chunk.created_at.format("%Y-%m-%d %H:%M:%S  ").to_string(),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::raw(chunk.preview(PREVIEW_CHARS)),
                ]))
            })
            .collect();

        let mut list_state = ListState::default().with_selected(Some(self.selected));
        f.render_stateful_widget(
            List::new(items)
                .block(block)
                .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .highlight_symbol("> "),
            area,
            &mut list_state,
        );
    }

    fn render_ingest(&self, f: &mut Frame, area: Rect) {
        let border = if self.mode == Mode::Insert { Color::Cyan } else { Color::DarkGray };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(Span::styled(" Ingest ", Style::default().fg(Color::Cyan)));

        let (draft, status) = match self.surface.try_lock() {
            Ok(surface) => (
                surface.draft().to_string(),
                surface.status().map(|s| (s.to_string(), s.is_error())),
            ),
            Err(_) => (String::new(), Some(("Submitting...".to_string(), false))),
        };

        let mut lines: Vec<Line> = draft.lines().map(|l| Line::from(l.to_string())).collect();
        if let Some((message, is_error)) = status {
            let color = if is_error { Color::Red } else { Color::Green };
            lines.push(Line::from(Span::styled(message, Style::default().fg(color))));
        }
        f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), area);
    }

    fn render_footer(&self, f: &mut Frame, area: Rect) {
        let key = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        let hint = Style::default().fg(Color::DarkGray);
        let mut spans = match self.mode {
            Mode::Browse => vec![
                Span::styled(" i ", key),
                Span::styled("ingest ", hint),
                Span::styled(" j/k ", key),
                Span::styled("select ", hint),
                Span::styled(" d ", key),
                Span::styled("delete ", hint),
                Span::styled(" C ", key),
                Span::styled("clear all ", hint),
                Span::styled(" r ", key),
                Span::styled("refresh ", hint),
                Span::styled(" q ", key),
                Span::styled("quit", hint),
            ],
            Mode::Insert => vec![
                Span::styled(" Enter ", key),
                Span::styled("submit ", hint),
                Span::styled(" Alt+Enter ", key),
                Span::styled("newline ", hint),
                Span::styled(" Esc ", key),
                Span::styled("back", hint),
            ],
        };
        if let Some(status) = self.panel.snapshot().status {
            let color = if status.is_error() { Color::Red } else { Color::Green };
            spans.push(Span::styled(format!("   {status}"), Style::default().fg(color)));
        }
        f.render_widget(
            Paragraph::new(Line::from(spans)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray)),
            ),
            area,
        );
    }
}

fn render_confirm(f: &mut Frame, message: &str) {
    let area = centered(f.area(), 50, 5);
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(vec![
            Line::from(message.to_string()),
            Line::from(Span::styled(
                "y / n",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Confirm "),
        ),
        area,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
