//! Application state for the promptline TUI.

use log::debug;
use promptline_core::{
    ConversationId, ConversationSession, DynamicForm, ExtraAction, FormError, FormField,
    SelectableEntity, Sender, SessionState, Turn,
};
use promptline_protocol::FollowupOption;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use std::cmp::min;

/// Editing state of the pending form.
pub struct FormEditor {
    form: DynamicForm,
    focus: usize,
    /// Value being typed into the focused field.
    pub buffer: String,
}

impl FormEditor {
    pub fn new(form: DynamicForm) -> Self {
        let buffer = form
            .fields()
            .first()
            .map(|field| field.value.clone())
            .unwrap_or_default();
        Self {
            form,
            focus: 0,
            buffer,
        }
    }

    pub fn form(&self) -> &DynamicForm {
        &self.form
    }

    /// Index of the focused field.
    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn fields(&self) -> Vec<FormField> {
        self.form.fields()
    }

    pub fn focused_field(&self) -> Option<FormField> {
        self.form.fields().into_iter().nth(self.focus)
    }

    /// Store the buffer into the focused field.
    pub fn commit(&mut self) -> Result<(), FormError> {
        let Some(field) = self.focused_field() else {
            return Ok(());
        };
        self.form.set_value(&field.spec.name, self.buffer.clone())
    }

    /// Store the buffer and move focus by `delta`, clamped to the field list.
    pub fn move_focus(&mut self, delta: isize) -> Result<(), FormError> {
        self.commit()?;
        let count = self.form.fields().len();
        if count == 0 {
            return Ok(());
        }
        let next = (self.focus as isize + delta).clamp(0, count as isize - 1) as usize;
        self.focus = next;
        self.buffer = self.value_at(next);
        Ok(())
    }

    /// Store the buffer and advance. Returns true once the last field was stored.
    pub fn advance(&mut self) -> Result<bool, FormError> {
        let count = self.form.fields().len();
        if self.focus + 1 >= count {
            self.commit()?;
            return Ok(true);
        }
        self.move_focus(1)?;
        Ok(false)
    }

    /// Step through the focused field's options, wrapping at either end.
    pub fn cycle(&mut self, delta: isize) {
        let Some(field) = self.focused_field() else {
            return;
        };
        if field.options.is_empty() {
            return;
        }
        let len = field.options.len() as isize;
        let current = field
            .options
            .iter()
            .position(|option| option.value == self.buffer);
        let next = match current {
            Some(index) => (index as isize + delta).rem_euclid(len),
            None if delta >= 0 => 0,
            None => len - 1,
        };
        self.buffer = field.options[next as usize].value.clone();
    }

    fn value_at(&self, index: usize) -> String {
        self.form
            .fields()
            .into_iter()
            .nth(index)
            .map(|field| field.value)
            .unwrap_or_default()
    }
}

/// Top-level application state for the TUI.
pub struct App {
    /// Transcript snapshot from the session.
    pub turns: Vec<Turn>,
    pub state: SessionState,
    pub conversation_id: Option<ConversationId>,
    pub actor: Option<String>,
    /// Selected entity id.
    pub selection: Option<i64>,
    /// Backend base url (shown in header).
    pub backend: String,
    /// Pending form being edited, if any.
    pub editor: Option<FormEditor>,
    /// A form submission is in flight; its form is not re-opened meanwhile.
    pub submitting: bool,
    /// Current input buffer.
    pub input: String,
    /// Status line text.
    pub status: String,
    /// Last local message (errors, export links, help).
    pub notice: Option<String>,
    /// Current scroll offset.
    pub scroll: u16,
    /// Whether to auto-scroll to the bottom.
    pub auto_scroll: bool,
    /// Maximum scroll offset for the transcript view.
    pub chat_max_scroll: u16,
}

impl App {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            turns: Vec::new(),
            state: SessionState::Closed,
            conversation_id: None,
            actor: None,
            selection: None,
            backend: backend.into(),
            editor: None,
            submitting: false,
            input: String::new(),
            status: "idle".to_string(),
            notice: None,
            scroll: 0,
            auto_scroll: true,
            chat_max_scroll: 0,
        }
    }

    /// Refresh the snapshot from the session.
    pub fn sync(&mut self, session: &ConversationSession) {
        let previous_len = self.turns.len();
        self.turns = session.transcript();
        self.state = session.state();
        self.conversation_id = session.conversation_id();
        self.actor = session.actor();
        self.selection = session.selection();
        match session.pending_form() {
            Some(form) if self.editor.is_none() && !self.submitting => {
                debug!("form opened (prompt_id={})", form.prompt_id());
                self.editor = Some(FormEditor::new(form));
            }
            None => self.editor = None,
            _ => {}
        }
        if self.turns.len() != previous_len {
            self.enable_auto_scroll();
        }
    }

    /// Update the status line text.
    pub fn push_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Show a local message under the transcript.
    pub fn push_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
        self.enable_auto_scroll();
    }

    /// Latest bot turn in the transcript.
    pub fn latest_bot_turn(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|turn| turn.sender == Sender::Bot)
    }

    /// Follow-up option `index` (1-based) of the latest bot turn.
    pub fn option(&self, index: usize) -> Option<FollowupOption> {
        self.latest_bot_turn()?
            .options
            .get(index.checked_sub(1)?)
            .cloned()
    }

    /// Entity `index` (1-based) of the latest turn listing entities.
    pub fn entity(&self, index: usize) -> Option<SelectableEntity> {
        self.latest_entities()?.get(index.checked_sub(1)?).cloned()
    }

    fn latest_entities(&self) -> Option<&[SelectableEntity]> {
        self.turns
            .iter()
            .rev()
            .map(Turn::entities)
            .find(|entities| !entities.is_empty())
    }

    /// Scroll the transcript view upward by a number of lines.
    pub fn scroll_up(&mut self, lines: u16) {
        self.auto_scroll = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    /// Scroll the transcript view downward by a number of lines.
    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = min(self.scroll.saturating_add(lines), self.chat_max_scroll);
        if self.scroll >= self.chat_max_scroll {
            self.auto_scroll = true;
        }
    }

    pub fn scroll_to_top(&mut self) {
        self.auto_scroll = false;
        self.scroll = 0;
    }

    /// Enable auto-scrolling to the bottom.
    pub fn enable_auto_scroll(&mut self) {
        self.auto_scroll = true;
        self.scroll = self.chat_max_scroll;
    }

    /// Update scroll bounds after layout changes.
    ///
    /// Snaps to the new bottom only when auto-scroll is on or the view was
    /// already pinned to the bottom.
    pub fn update_scroll_bounds(&mut self, max_scroll: u16) {
        let was_at_bottom = self.scroll >= self.chat_max_scroll;
        self.chat_max_scroll = max_scroll;
        if self.auto_scroll || was_at_bottom {
            self.scroll = max_scroll;
            self.auto_scroll = true;
        } else {
            self.scroll = min(self.scroll, max_scroll);
        }
    }

    /// Render the transcript into styled lines.
    pub fn render_lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        if self.turns.is_empty() {
            let hint = match (self.state, &self.actor) {
                (SessionState::Closed, _) => " Conversation closed. Type /open to start.",
                (_, None) => " Waiting for an actor id. Type /actor <id>.",
                _ => " Waiting for the assistant...",
            };
            lines.push(Line::from(Span::styled(hint, Style::default().fg(muted()))));
        }

        let latest_bot = self.turns.iter().rposition(|turn| turn.sender == Sender::Bot);
        let latest_entities = self
            .turns
            .iter()
            .rposition(|turn| !turn.entities().is_empty());

        for (idx, turn) in self.turns.iter().enumerate() {
            let (prefix, background) = match turn.sender {
                Sender::User => (" you ", Color::Rgb(107, 161, 230)),
                Sender::Bot => (" bot ", Color::Rgb(238, 121, 72)),
            };
            let prefix_style = Style::default()
                .fg(Color::Rgb(10, 10, 10))
                .bg(background)
                .add_modifier(Modifier::BOLD);
            let mut text_lines = turn.text.lines();
            let first = text_lines.next().unwrap_or_default().to_string();
            lines.push(Line::from(vec![
                Span::styled(prefix, prefix_style),
                Span::raw(" "),
                Span::styled(first, Style::default().fg(text())),
            ]));
            for rest in text_lines {
                lines.push(Line::from(Span::styled(
                    format!("      {rest}"),
                    Style::default().fg(text()),
                )));
            }

            let numbered = Some(idx) == latest_bot;
            for (position, option) in turn.options.iter().enumerate() {
                let (marker, style) = if numbered {
                    (format!("/{}", position + 1), Style::default().fg(option_color()))
                } else {
                    ("-".to_string(), Style::default().fg(muted()))
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("      {marker} "), style),
                    Span::styled(option.text.clone(), style),
                ]));
            }

            match &turn.extra_action {
                Some(ExtraAction::SelectableEntities(entities)) => {
                    let numbered = Some(idx) == latest_entities;
                    for (position, entity) in entities.iter().enumerate() {
                        let selected = self.selection == Some(entity.id);
                        let marker = if numbered {
                            format!("/e {}", position + 1)
                        } else {
                            "-".to_string()
                        };
                        let style = if selected {
                            Style::default()
                                .fg(selected_color())
                                .add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(text())
                        };
                        lines.push(Line::from(vec![
                            Span::styled(
                                format!("      {marker} "),
                                Style::default().fg(muted()),
                            ),
                            Span::styled(format!("{} (#{})", entity.label, entity.id), style),
                            Span::styled(
                                if selected { "  ✓ selected" } else { "" },
                                Style::default().fg(selected_color()),
                            ),
                        ]));
                    }
                }
                Some(details @ ExtraAction::Details(_)) => {
                    for (key, value) in details.detail_lines() {
                        lines.push(Line::from(vec![
                            Span::styled(format!("      {key}: "), Style::default().fg(muted())),
                            Span::styled(value, Style::default().fg(text())),
                        ]));
                    }
                }
                None => {}
            }
            lines.push(Line::from(""));
        }

        if let Some(notice) = &self.notice {
            lines.push(Line::from(vec![
                Span::styled(
                    " system ",
                    Style::default()
                        .fg(Color::Rgb(10, 10, 10))
                        .bg(Color::Rgb(60, 60, 60))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::styled(notice.clone(), Style::default().fg(notice_color())),
            ]));
        }

        lines
    }
}

fn text() -> Color {
    Color::Rgb(238, 238, 238)
}

fn muted() -> Color {
    Color::Rgb(128, 128, 128)
}

fn option_color() -> Color {
    Color::Rgb(120, 190, 255)
}

fn selected_color() -> Color {
    Color::Rgb(120, 220, 140)
}

fn notice_color() -> Color {
    Color::Rgb(229, 192, 123)
}
