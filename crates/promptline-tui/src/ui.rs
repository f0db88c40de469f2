//! Rendering routines for the promptline TUI.

use crate::app::{App, FormEditor};
use promptline_core::SessionState;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
};

const PRIMARY: Color = Color::Rgb(236, 91, 43);
const SECONDARY: Color = Color::Rgb(238, 121, 72);
const TEXT: Color = Color::Rgb(238, 238, 238);
const TEXT_MUTED: Color = Color::Rgb(128, 128, 128);
const BORDER: Color = Color::Rgb(60, 60, 60);
const BORDER_ACTIVE: Color = Color::Rgb(238, 121, 72);
const YELLOW: Color = Color::Rgb(229, 192, 123);

const HEADER_HEIGHT: u16 = 3;
const MAX_FORM_ROWS: u16 = 8;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Draw the entire TUI frame.
pub fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let area = frame.area();
    let form_height = app
        .editor
        .as_ref()
        .map(|editor| (editor.fields().len() as u16).clamp(1, MAX_FORM_ROWS) + 2)
        .unwrap_or(0);

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT), // header bar
            Constraint::Min(0),                // transcript
            Constraint::Length(form_height),   // pending form
            Constraint::Length(3),             // input
            Constraint::Length(1),             // status bar
        ])
        .split(area);

    draw_header(frame, app, root[0]);
    draw_chat(frame, app, root[1]);
    if let Some(editor) = app.editor.as_ref() {
        draw_form(frame, editor, root[2]);
    }
    draw_input(frame, app, root[3]);
    draw_status_bar(frame, app, root[4]);
}

fn draw_header(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let conversation = app
        .conversation_id
        .map(|id| {
            let s = id.to_string();
            s[..8.min(s.len())].to_string()
        })
        .unwrap_or_else(|| "none".to_string());
    let actor = app.actor.clone().unwrap_or_else(|| "none".to_string());
    let selection = app
        .selection
        .map(|id| format!("#{id}"))
        .unwrap_or_else(|| "none".to_string());
    let state = match app.state {
        SessionState::Closed => "closed",
        SessionState::Empty => "waiting",
        SessionState::Populated => "open",
    };

    let label_style = Style::default().fg(TEXT_MUTED);
    let value_style = Style::default().fg(TEXT);
    let line = Line::from(vec![
        Span::styled(
            " promptline",
            Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" v{VERSION}"), label_style),
        Span::styled("  backend ", label_style),
        Span::styled(app.backend.as_str(), value_style),
        Span::styled("  actor ", label_style),
        Span::styled(actor, value_style),
        Span::styled("  conversation ", label_style),
        Span::styled(conversation, value_style),
        Span::styled("  selection ", label_style),
        Span::styled(selection, value_style),
        Span::styled("  ", label_style),
        Span::styled(state, Style::default().fg(SECONDARY)),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_chat(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let lines = app.render_lines();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(" Conversation ", Style::default().fg(TEXT_MUTED)));

    let inner = block.inner(area);
    let content_width = inner.width.saturating_sub(1); // -1 for scrollbar
    let content_height = inner.height as usize;

    let total_lines = Paragraph::new(lines.clone())
        .wrap(Wrap { trim: false })
        .line_count(content_width)
        .max(1);

    let max_scroll = total_lines.saturating_sub(content_height) as u16;
    app.update_scroll_bounds(max_scroll);
    let scroll = app.scroll;

    let chat_inner = Rect {
        width: inner.width.saturating_sub(1),
        ..inner
    };

    let chat = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    frame.render_widget(block, area);
    frame.render_widget(chat, chat_inner);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::default()
            .content_length(total_lines)
            .position(scroll as usize)
            .viewport_content_length(content_height);
        let scrollbar_area = Rect {
            x: inner.x + inner.width.saturating_sub(1),
            y: inner.y,
            width: 1,
            height: inner.height,
        };
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .style(Style::default().fg(BORDER))
                .thumb_style(Style::default().fg(TEXT_MUTED)),
            scrollbar_area,
            &mut scrollbar_state,
        );
    }
}

/// One row per field; the focused row shows the edit buffer.
fn draw_form(frame: &mut Frame<'_>, editor: &FormEditor, area: Rect) {
    let target = editor.form().target();
    let title = if target.prompt_text.is_empty() {
        " Form ".to_string()
    } else {
        format!(" {} ", target.prompt_text)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_ACTIVE))
        .title(Span::styled(title, Style::default().fg(SECONDARY)));

    let fields = editor.fields();
    let mut lines: Vec<Line<'_>> = Vec::new();
    if fields.is_empty() {
        lines.push(Line::from(Span::styled(
            " No fields. Press Enter to submit.",
            Style::default().fg(TEXT_MUTED),
        )));
    }
    for (idx, field) in fields.iter().enumerate() {
        let focused = idx == editor.focus();
        let value = if focused {
            editor.buffer.clone()
        } else {
            field.value.clone()
        };
        let shown = field
            .options
            .iter()
            .find(|option| option.value == value)
            .map(|option| option.label.clone())
            .unwrap_or_else(|| value.clone());
        let (content, content_style) = if shown.is_empty() {
            (field.placeholder(), Style::default().fg(TEXT_MUTED))
        } else {
            (shown, Style::default().fg(TEXT))
        };
        let marker = if focused { " > " } else { "   " };
        let mut spans = vec![
            Span::styled(marker, Style::default().fg(PRIMARY)),
            Span::styled(
                format!("{}: ", field.spec.label),
                Style::default().fg(if focused { SECONDARY } else { TEXT_MUTED }),
            ),
            Span::styled(content, content_style),
        ];
        if field.loading {
            spans.push(Span::styled("  loading…", Style::default().fg(YELLOW)));
        } else if field.is_choice() && focused {
            spans.push(Span::styled(
                format!("  ←/→ {} options", field.options.len()),
                Style::default().fg(TEXT_MUTED),
            ));
        }
        lines.push(Line::from(spans));
    }

    let inner_height = area.height.saturating_sub(2) as usize;
    let skip = (editor.focus() + 1).saturating_sub(inner_height.max(1));
    let lines = lines.into_iter().skip(skip).collect::<Vec<_>>();
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_input(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let is_active = app.editor.is_none();
    let border_color = if is_active { BORDER_ACTIVE } else { BORDER };
    let title = if is_active {
        " Input "
    } else {
        " Form: Enter next/submit, ↑/↓ move, ←/→ choose, Esc cancel "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color))
        .title(Span::styled(
            title,
            Style::default().fg(if is_active { SECONDARY } else { TEXT_MUTED }),
        ));

    let inner = block.inner(area);

    let prompt_style = Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD);
    let input_text = if app.input.is_empty() && is_active {
        Line::from(vec![
            Span::styled(" ", prompt_style),
            Span::styled(
                "Type a message, /N to pick an option, /help for commands",
                Style::default().fg(TEXT_MUTED),
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled(" ", prompt_style),
            Span::styled(app.input.as_str(), Style::default().fg(TEXT)),
        ])
    };

    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(input_text), inner);

    if is_active {
        frame.set_cursor_position((inner.x + 1 + app.input.chars().count() as u16, inner.y));
    }
}

fn draw_status_bar(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let status_color = match app.status.as_str() {
        "waiting" => PRIMARY,
        "idle" => TEXT_MUTED,
        _ => YELLOW,
    };

    let shortcuts = vec![
        Span::styled(" Ctrl+C", Style::default().fg(TEXT_MUTED)),
        Span::styled(" quit", Style::default().fg(BORDER)),
        Span::styled("  /N", Style::default().fg(TEXT_MUTED)),
        Span::styled(" option", Style::default().fg(BORDER)),
        Span::styled("  /e N", Style::default().fg(TEXT_MUTED)),
        Span::styled(" entity", Style::default().fg(BORDER)),
        Span::styled("  PgUp/PgDn", Style::default().fg(TEXT_MUTED)),
        Span::styled(" scroll", Style::default().fg(BORDER)),
    ];

    let right_text = format!(" {} ", app.status);
    let right_len = right_text.chars().count() as u16;
    let left_area = Rect {
        width: area.width.saturating_sub(right_len),
        ..area
    };
    let right_area = Rect {
        x: area.x + area.width.saturating_sub(right_len),
        width: right_len.min(area.width),
        ..area
    };

    let left = Paragraph::new(Line::from(shortcuts));
    let right = Paragraph::new(Line::from(Span::styled(
        right_text,
        Style::default().fg(status_color),
    )));

    frame.render_widget(left, left_area);
    frame.render_widget(right, right_area);
}
