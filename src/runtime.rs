use anyhow::Result;
use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::api::Backend;
use crate::app::{App, InputMode};
use crate::fetch::{DetailMessage, DetailRequest, SuggestionMessage, SuggestionRequest};
use crate::tracking::track_search;
use crate::ui;

pub fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

pub fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Channels between the UI thread and the fetch workers.
pub struct Channels {
    pub suggest_tx: Sender<SuggestionRequest>,
    pub suggest_rx: Receiver<SuggestionMessage>,
    pub detail_tx: Sender<DetailRequest>,
    pub detail_rx: Receiver<DetailMessage>,
}

pub struct Tracking {
    pub backend: Arc<dyn Backend>,
    pub enabled: bool,
}

pub fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: App,
    channels: Channels,
    tracking: Tracking,
) -> Result<()> {
    let tick_rate = Duration::from_millis(50);
    loop {
        while let Ok(message) = channels.suggest_rx.try_recv() {
            app.apply_suggestions(message);
        }
        while let Ok(message) = channels.detail_rx.try_recv() {
            app.apply_detail(message);
        }

        if let Some(request) = app.poll_debounce(Instant::now()) {
            if channels.suggest_tx.send(request).is_err() {
                debug!("suggestion worker gone");
            }
        }

        terminal.draw(|f| ui::ui(f, &app))?;
        app.advance_tick();

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(&mut app, key) {
                    KeyOutcome::Quit => return Ok(()),
                    KeyOutcome::Submit => {
                        submit(&mut app, &channels, &tracking);
                    }
                    KeyOutcome::Handled => {}
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Handled,
    Submit,
    Quit,
}

fn handle_key(app: &mut App, key: KeyEvent) -> KeyOutcome {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }
    match app.input_mode {
        InputMode::Normal => match key.code {
            KeyCode::Char('q') => return KeyOutcome::Quit,
            KeyCode::Char('/') | KeyCode::Char('s') => app.open_search(),
            KeyCode::Char('b') | KeyCode::Esc => app.close_detail(),
            KeyCode::Char('n') => app.toggle_nav(),
            KeyCode::Char('t') => app.toggle_theme(),
            KeyCode::Char('?') | KeyCode::Char('h') => app.open_help(),
            _ => {}
        },
        InputMode::Search => {
            let now = Instant::now();
            match key.code {
                KeyCode::Enter => return KeyOutcome::Submit,
                KeyCode::Esc => app.close_search(),
                KeyCode::Down | KeyCode::Tab => app.next_suggestion(),
                KeyCode::Up | KeyCode::BackTab => app.previous_suggestion(),
                KeyCode::Backspace => app.backspace_search(now),
                KeyCode::Char(ch) if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    if ch == 'u' {
                        app.clear_search(now);
                    }
                }
                KeyCode::Char(ch) => app.push_search_char(ch, now),
                _ => {}
            }
        }
        InputMode::Help => match key.code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') => app.close_help(),
            KeyCode::Char('q') => return KeyOutcome::Quit,
            _ => {}
        },
    }
    KeyOutcome::Handled
}

/// Hand the search to the detail worker, then report it. The returned handle
/// belongs to the tracking post, which nothing waits on outside tests.
fn submit(app: &mut App, channels: &Channels, tracking: &Tracking) -> Option<JoinHandle<()>> {
    let submitted = app.submit(Utc::now())?;
    if channels.detail_tx.send(submitted.request).is_err() {
        app.set_status("detail worker stopped".to_string());
    }
    track_search(
        Arc::clone(&tracking.backend),
        tracking.enabled,
        submitted.event,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ThemeMode;
    use crate::fetch::load_pool;
    use crate::fixtures::{Failures, FixtureBackend};
    use std::path::PathBuf;
    use std::sync::mpsc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> App {
        App::new(
            ThemeMode::Default,
            PathBuf::from("cirrostrats.toml"),
            Duration::from_millis(300),
            None,
            String::new(),
        )
    }

    #[test]
    fn typing_goes_to_search_box() {
        let mut app = app();
        assert_eq!(handle_key(&mut app, key(KeyCode::Char('/'))), KeyOutcome::Handled);
        assert_eq!(app.input_mode, InputMode::Search);
        for ch in ['q', 'e', 'w'] {
            handle_key(&mut app, key(KeyCode::Char(ch)));
        }
        assert_eq!(app.query, "qew");
        handle_key(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.query, "qe");
        handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL),
        );
        assert!(app.query.is_empty());
        assert_eq!(handle_key(&mut app, key(KeyCode::Enter)), KeyOutcome::Submit);
        handle_key(&mut app, key(KeyCode::Esc));
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn quit_and_help_keys() {
        let mut app = app();
        handle_key(&mut app, key(KeyCode::Char('?')));
        assert_eq!(app.input_mode, InputMode::Help);
        handle_key(&mut app, key(KeyCode::Esc));
        assert_eq!(app.input_mode, InputMode::Normal);
        handle_key(&mut app, key(KeyCode::Char('n')));
        assert!(app.nav_open);
        assert_eq!(handle_key(&mut app, key(KeyCode::Char('q'))), KeyOutcome::Quit);
    }

    #[test]
    fn failed_tracking_does_not_block_search() {
        let fixtures = Arc::new(FixtureBackend::with_failures(Failures {
            track: true,
            ..Failures::default()
        }));
        let mut app = app();
        app.apply_suggestions(SuggestionMessage::Pool(load_pool(fixtures.as_ref())));

        let (suggest_tx, _suggest_worker_rx) = mpsc::channel();
        let (_suggest_worker_tx, suggest_rx) = mpsc::channel();
        let (detail_tx, detail_worker_rx) = mpsc::channel();
        let (_detail_worker_tx, detail_rx) = mpsc::channel();
        let channels = Channels {
            suggest_tx,
            suggest_rx,
            detail_tx,
            detail_rx,
        };
        let tracking = Tracking {
            backend: fixtures.clone(),
            enabled: true,
        };

        handle_key(&mut app, key(KeyCode::Char('/')));
        for ch in "ewr".chars() {
            handle_key(&mut app, key(KeyCode::Char(ch)));
        }
        let handle = submit(&mut app, &channels, &tracking).unwrap();
        assert!(handle.join().is_ok());

        let request = detail_worker_rx.try_recv().unwrap();
        assert_eq!(request.target.value(), "EWR");
        assert_eq!(fixtures.tracked().len(), 1);
        assert_eq!(app.status_text(), None);
    }
}
