//! Library entry point for the promptline TUI.
//!
//! Provides a reusable [`run`] function that drives a Ratatui terminal UI
//! against a pre-built [`ConversationSession`].

mod app;
mod command;
mod event;
mod ui;

use app::App;
use command::{HELP_TEXT, SlashCommand, parse_slash_command};
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent, KeyCode, KeyEvent,
    KeyModifiers, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use event::AppEvent;
use log::{debug, info};
use promptline_core::{ConversationSession, SessionError};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Launch the TUI against a session.
///
/// The session follows `identity` for its actor id; `/actor` publishes new
/// values on it. The caller initializes logging before calling `run`.
///
/// # Errors
/// Returns an error if terminal setup or the event loop fails.
pub async fn run(
    session: Arc<ConversationSession>,
    identity: watch::Sender<Option<String>>,
) -> anyhow::Result<()> {
    info!(
        "starting TUI (backend={}, actor_set={})",
        session.config().backend.base_url,
        identity.borrow().is_some()
    );
    let follower = session.follow_identity(identity.subscribe());
    let mut app = App::new(session.config().backend.base_url.clone());

    let mut terminal = setup_terminal()?;
    let (tx, mut rx) = mpsc::channel(256);
    spawn_input_handler(tx.clone());
    spawn_tick(tx.clone());
    spawn_action(&session, tx.clone(), "open", |session| async move {
        session.open().await;
        Ok::<(), SessionError>(())
    });

    let result = async {
        loop {
            terminal.draw(|frame| ui::draw(frame, &mut app))?;

            let Some(event) = rx.recv().await else { break };
            if handle_app_event(event, &session, &identity, &mut app, tx.clone()).await? {
                break;
            }
        }
        anyhow::Ok(())
    }
    .await;

    follower.abort();
    restore_terminal(&mut terminal)?;
    result
}

/// Dispatch a UI event and return true when the app should exit.
async fn handle_app_event(
    event: AppEvent,
    session: &Arc<ConversationSession>,
    identity: &watch::Sender<Option<String>>,
    app: &mut App,
    sender: mpsc::Sender<AppEvent>,
) -> anyhow::Result<bool> {
    match event {
        AppEvent::Input(key) => Ok(handle_input(key, session, identity, app, sender)),
        AppEvent::Tick => {
            app.sync(session);
            Ok(false)
        }
        AppEvent::SessionUpdated => {
            app.sync(session);
            app.push_status("idle");
            Ok(false)
        }
        AppEvent::FormSettled => {
            app.submitting = false;
            app.sync(session);
            Ok(false)
        }
        AppEvent::ActionError(message) => {
            app.sync(session);
            app.push_notice(message);
            app.push_status("idle");
            Ok(false)
        }
        AppEvent::Scroll(delta) => {
            if delta < 0 {
                app.scroll_up((-delta) as u16);
            } else if delta > 0 {
                app.scroll_down(delta as u16);
            }
            Ok(false)
        }
    }
}

/// Handle keyboard input and dispatch actions.
fn handle_input(
    key: KeyEvent,
    session: &Arc<ConversationSession>,
    identity: &watch::Sender<Option<String>>,
    app: &mut App,
    sender: mpsc::Sender<AppEvent>,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }
    if app.editor.is_some() {
        handle_form_input(key, session, app, sender);
        return false;
    }

    match key.code {
        KeyCode::Esc => {
            if app.input.is_empty() {
                return true;
            }
            app.input.clear();
        }
        KeyCode::PageUp => app.scroll_up(5),
        KeyCode::PageDown => app.scroll_down(5),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Home => app.scroll_to_top(),
        KeyCode::End => app.enable_auto_scroll(),
        KeyCode::Enter => {
            let input = std::mem::take(&mut app.input);
            if input.trim().is_empty() {
                return false;
            }
            app.notice = None;
            if input.trim_start().starts_with('/') {
                if let Err(err) = handle_slash_command(session, identity, app, sender, &input) {
                    app.push_notice(err);
                }
            } else {
                app.push_status("waiting");
                spawn_action(session, sender, "message", move |session| async move {
                    session.submit_free_text(&input).await
                });
            }
        }
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(ch) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL) {
                app.input.push(ch);
            }
        }
        _ => {}
    }
    false
}

/// Handle keyboard input while a form is pending.
fn handle_form_input(
    key: KeyEvent,
    session: &Arc<ConversationSession>,
    app: &mut App,
    sender: mpsc::Sender<AppEvent>,
) {
    let Some(editor) = app.editor.as_mut() else {
        return;
    };
    let outcome = match key.code {
        KeyCode::Esc => {
            session.cancel_form();
            app.editor = None;
            app.push_status("form cancelled");
            return;
        }
        KeyCode::Enter => match editor.advance() {
            Ok(true) => {
                submit_form(session, app, sender);
                return;
            }
            Ok(false) => Ok(()),
            Err(err) => Err(err),
        },
        KeyCode::Up => editor.move_focus(-1),
        KeyCode::Down => editor.move_focus(1),
        KeyCode::Left => {
            editor.cycle(-1);
            Ok(())
        }
        KeyCode::Right => {
            editor.cycle(1);
            Ok(())
        }
        KeyCode::Backspace => {
            editor.buffer.pop();
            Ok(())
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            editor.buffer.push(ch);
            Ok(())
        }
        KeyCode::PageUp => {
            app.scroll_up(5);
            Ok(())
        }
        KeyCode::PageDown => {
            app.scroll_down(5);
            Ok(())
        }
        _ => Ok(()),
    };
    if let Err(err) = outcome {
        app.push_notice(err.to_string());
    }
}

/// Hand the pending form to the session; the editor stays closed until it settles.
fn submit_form(session: &Arc<ConversationSession>, app: &mut App, sender: mpsc::Sender<AppEvent>) {
    app.editor = None;
    app.submitting = true;
    app.push_status("waiting");
    let session = session.clone();
    tokio::spawn(async move {
        debug!("dispatching form submission");
        let event = match session.submit_pending_form().await {
            Ok(()) => AppEvent::SessionUpdated,
            Err(err) => AppEvent::ActionError(format!("submit failed: {err}")),
        };
        let _ = sender.send(event).await;
        let _ = sender.send(AppEvent::FormSettled).await;
    });
}

/// Handle slash commands entered in the input box.
fn handle_slash_command(
    session: &Arc<ConversationSession>,
    identity: &watch::Sender<Option<String>>,
    app: &mut App,
    sender: mpsc::Sender<AppEvent>,
    input: &str,
) -> Result<(), String> {
    let Some(command) = parse_slash_command(input)? else {
        return Ok(());
    };
    debug!("handling slash command ({command:?})");
    match command {
        SlashCommand::Option(index) => {
            let option = app
                .option(index)
                .ok_or_else(|| format!("no option {index} in the latest prompt"))?;
            app.push_status("waiting");
            spawn_action(session, sender, "selection", move |session| async move {
                session.select_option(&option).await
            });
        }
        SlashCommand::Entity(index) => {
            let entity = app
                .entity(index)
                .ok_or_else(|| format!("no entity {index} in the latest list"))?;
            session.select_entity(entity.id);
            app.sync(session);
            app.push_notice(format!("selected {} (#{})", entity.label, entity.id));
        }
        SlashCommand::Actor(actor) => {
            let notice = match &actor {
                Some(actor) => format!("actor set: {actor}"),
                None => "actor cleared".to_string(),
            };
            identity.send_replace(actor);
            app.push_notice(notice);
        }
        SlashCommand::Open => {
            app.push_status("waiting");
            spawn_action(session, sender, "open", |session| async move {
                session.open().await;
                Ok::<(), SessionError>(())
            });
        }
        SlashCommand::Close => {
            session.close();
            app.editor = None;
            app.sync(session);
            app.push_status("closed");
        }
        SlashCommand::Export => match session.export_url() {
            Some(url) => app.push_notice(format!("export: {url}")),
            None => app.push_notice("nothing to export yet"),
        },
        SlashCommand::Help => app.push_notice(HELP_TEXT),
    }
    Ok(())
}

/// Spawn a session action and report its outcome on the event channel.
fn spawn_action<F, Fut>(
    session: &Arc<ConversationSession>,
    sender: mpsc::Sender<AppEvent>,
    label: &'static str,
    action: F,
) where
    F: FnOnce(Arc<ConversationSession>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), SessionError>> + Send + 'static,
{
    let session = session.clone();
    tokio::spawn(async move {
        debug!("dispatching {label}");
        let event = match action(session).await {
            Ok(()) => AppEvent::SessionUpdated,
            Err(err) => AppEvent::ActionError(format!("{label} failed: {err}")),
        };
        let _ = sender.send(event).await;
    });
}

/// Spawn a task to poll for input events.
fn spawn_input_handler(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        const MOUSE_SCROLL_LINES: i16 = 3;
        loop {
            if let Ok(true) = crossterm::event::poll(Duration::from_millis(30)) {
                while let Ok(true) = crossterm::event::poll(Duration::from_millis(0)) {
                    let event = match crossterm::event::read() {
                        Ok(event) => event,
                        Err(_) => break,
                    };
                    match event {
                        CrosstermEvent::Key(key) => {
                            let _ = sender.send(AppEvent::Input(key)).await;
                        }
                        CrosstermEvent::Mouse(mouse) => match mouse.kind {
                            MouseEventKind::ScrollUp => {
                                let _ = sender.send(AppEvent::Scroll(-MOUSE_SCROLL_LINES)).await;
                            }
                            MouseEventKind::ScrollDown => {
                                let _ = sender.send(AppEvent::Scroll(MOUSE_SCROLL_LINES)).await;
                            }
                            _ => {}
                        },
                        _ => {}
                    }
                }
            }
        }
    });
}

/// Spawn a periodic tick event generator.
///
/// Ticks re-sync the view, so enum options fetched after a form opened show up.
fn spawn_tick(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(250));
        loop {
            interval.tick().await;
            let _ = sender.send(AppEvent::Tick).await;
        }
    });
}

/// Configure terminal in raw mode with alternate screen.
fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    debug!("setting up terminal");
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal state on exit.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    debug!("restoring terminal");
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
