use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use toml_edit::{value, DocumentMut};
use tracing::{debug, info, trace, warn};

use crate::debounce::Debouncer;
use crate::fetch::{
    AirportSlot, DetailEvent, DetailMessage, DetailRecord, DetailRequest, Slot, SuggestionMessage,
    SuggestionRequest,
};
use crate::model::{NasStatus, SearchOption};
use crate::suggest::{filter_options, resolve_query};
use crate::tracking::{SearchEvent, Submission};
use crate::weather::{reconcile, SelectedWeather};

const STATUS_TTL: Duration = Duration::from_secs(6);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeMode {
    Default,
    ColorBlind,
    Amber,
    Monochrome,
}

impl ThemeMode {
    pub fn toggle(self) -> Self {
        match self {
            ThemeMode::Default => ThemeMode::ColorBlind,
            ThemeMode::ColorBlind => ThemeMode::Amber,
            ThemeMode::Amber => ThemeMode::Monochrome,
            ThemeMode::Monochrome => ThemeMode::Default,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeMode::Default => "DEFAULT",
            ThemeMode::ColorBlind => "COLOR",
            ThemeMode::Amber => "AMBER",
            ThemeMode::Monochrome => "MONO",
        }
    }

    /// Spelling written back to the config file.
    pub fn config_value(self) -> &'static str {
        match self {
            ThemeMode::Default => "default",
            ThemeMode::ColorBlind => "color",
            ThemeMode::Amber => "amber",
            ThemeMode::Monochrome => "mono",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "color" | "colorblind" | "cb" => ThemeMode::ColorBlind,
            "amber" | "gold" => ThemeMode::Amber,
            "mono" | "monochrome" | "bw" | "grayscale" => ThemeMode::Monochrome,
            _ => ThemeMode::Default,
        }
    }
}

/// Weather and NAS state of one airport card. Each source has its own
/// loading flag so cached weather can show while live data is in flight.
#[derive(Clone, Debug)]
pub struct SlotState {
    pub airport: AirportSlot,
    pub weather: Option<SelectedWeather>,
    pub weather_loading: bool,
    pub nas: Option<Result<NasStatus, String>>,
    pub nas_loading: bool,
}

impl SlotState {
    fn new(airport: AirportSlot) -> Self {
        let weather = reconcile(airport.cached.as_ref(), None, None, "").selected;
        SlotState {
            airport,
            weather,
            weather_loading: true,
            nas: None,
            nas_loading: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DetailView {
    pub target: SearchOption,
    pub generation: u64,
    pub record_loading: bool,
    pub record: Option<Result<DetailRecord, String>>,
    pub slots: Vec<SlotState>,
    pub done: bool,
}

impl DetailView {
    pub fn slot(&self, slot: Slot) -> Option<&SlotState> {
        self.slots.iter().find(|s| s.airport.slot == slot)
    }

    fn slot_mut(&mut self, slot: Slot) -> Option<&mut SlotState> {
        self.slots.iter_mut().find(|s| s.airport.slot == slot)
    }
}

/// What the runtime must send out after a search is submitted.
#[derive(Debug)]
pub struct Submitted {
    pub request: DetailRequest,
    pub event: SearchEvent,
}

pub struct App {
    pub(crate) input_mode: InputMode,
    pub(crate) query: String,
    pub(crate) suggestions: Vec<SearchOption>,
    pub(crate) suggestion_cursor: Option<usize>,
    pub(crate) suggestions_loading: bool,
    pool: Vec<SearchOption>,
    debouncer: Debouncer<String>,
    suggestion_generation: u64,
    detail_generation: u64,
    pub(crate) detail: Option<DetailView>,
    pub(crate) search_expanded: bool,
    pub(crate) nav_open: bool,
    pub(crate) theme_mode: ThemeMode,
    pub(crate) config_path: PathBuf,
    pub(crate) user_email: Option<String>,
    pub(crate) source_label: String,
    pub(crate) status: Option<(String, Instant)>,
    pub(crate) tick: u64,
}

impl App {
    pub fn new(
        theme_mode: ThemeMode,
        config_path: PathBuf,
        debounce: Duration,
        user_email: Option<String>,
        source_label: String,
    ) -> Self {
        Self {
            input_mode: InputMode::Normal,
            query: String::new(),
            suggestions: Vec::new(),
            suggestion_cursor: None,
            suggestions_loading: false,
            pool: Vec::new(),
            debouncer: Debouncer::new(debounce),
            suggestion_generation: 0,
            detail_generation: 0,
            detail: None,
            search_expanded: true,
            nav_open: false,
            theme_mode,
            config_path,
            user_email,
            source_label,
            status: None,
            tick: 0,
        }
    }

    pub fn advance_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn open_search(&mut self) {
        self.input_mode = InputMode::Search;
        self.search_expanded = true;
        self.nav_open = false;
        if self.suggestions.is_empty() {
            self.suggestions = filter_options(&self.pool, &self.query);
        }
        debug!("open search");
    }

    pub fn close_search(&mut self) {
        self.input_mode = InputMode::Normal;
        self.suggestion_cursor = None;
        self.debouncer.cancel();
        // Results for requests already at the worker belong to the old query.
        self.suggestion_generation += 1;
        self.suggestions_loading = false;
        if self.detail.is_some() {
            self.search_expanded = false;
        }
        debug!("close search");
    }

    pub fn push_search_char(&mut self, ch: char, now: Instant) {
        self.query.push(ch);
        self.query_changed(now);
    }

    pub fn backspace_search(&mut self, now: Instant) {
        if self.query.pop().is_some() {
            self.query_changed(now);
        }
    }

    pub fn clear_search(&mut self, now: Instant) {
        if !self.query.is_empty() {
            self.query.clear();
            self.query_changed(now);
        }
    }

    fn query_changed(&mut self, now: Instant) {
        self.suggestion_cursor = None;
        self.debouncer.push(self.query.clone(), now);
    }

    /// Emit a suggestion request once typing has settled.
    pub fn poll_debounce(&mut self, now: Instant) -> Option<SuggestionRequest> {
        let query = self.debouncer.poll(now)?;
        self.suggestion_generation += 1;
        self.suggestions_loading = true;
        trace!(
            "suggestion request gen={} query={query:?}",
            self.suggestion_generation
        );
        Some(SuggestionRequest {
            generation: self.suggestion_generation,
            query,
        })
    }

    pub fn apply_suggestions(&mut self, message: SuggestionMessage) -> bool {
        match message {
            SuggestionMessage::Pool(pool) => {
                debug!("suggestion pool ready: {}", pool.len());
                self.pool = pool;
                if self.suggestions.is_empty() && !self.debouncer.is_pending() {
                    self.suggestions = filter_options(&self.pool, &self.query);
                }
                true
            }
            SuggestionMessage::Results {
                generation,
                options,
            } => {
                if generation != self.suggestion_generation {
                    trace!(
                        "dropping stale suggestions gen={generation} current={}",
                        self.suggestion_generation
                    );
                    return false;
                }
                self.suggestions_loading = false;
                self.suggestions = options;
                self.suggestion_cursor = None;
                true
            }
        }
    }

    pub fn next_suggestion(&mut self) {
        if self.suggestions.is_empty() {
            self.suggestion_cursor = None;
            return;
        }
        let last = self.suggestions.len() - 1;
        self.suggestion_cursor = Some(match self.suggestion_cursor {
            Some(i) if i < last => i + 1,
            Some(_) => 0,
            None => 0,
        });
    }

    pub fn previous_suggestion(&mut self) {
        if self.suggestions.is_empty() {
            self.suggestion_cursor = None;
            return;
        }
        let last = self.suggestions.len() - 1;
        self.suggestion_cursor = Some(match self.suggestion_cursor {
            Some(0) | None => last,
            Some(i) => i - 1,
        });
    }

    pub fn selected_suggestion(&self) -> Option<&SearchOption> {
        self.suggestion_cursor
            .and_then(|i| self.suggestions.get(i))
    }

    /// Start a search from the highlighted suggestion, or from the typed text
    /// when nothing is highlighted.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Option<Submitted> {
        let (target, event) = match self.selected_suggestion().cloned() {
            Some(option) => {
                let event = SearchEvent::new(
                    self.user_email.as_deref(),
                    Submission::Selected(&option),
                    now,
                );
                (option, event)
            }
            None => {
                let Some(target) = resolve_query(&self.query, &self.pool) else {
                    if !self.query.trim().is_empty() {
                        self.set_status(format!("no match for {}", self.query.trim()));
                    }
                    return None;
                };
                let event = SearchEvent::new(
                    self.user_email.as_deref(),
                    Submission::Typed(&self.query),
                    now,
                );
                (target, event)
            }
        };

        self.detail_generation += 1;
        info!(
            "search {} {:?} gen={}",
            target.kind_label(),
            target.value(),
            self.detail_generation
        );
        self.detail = Some(DetailView {
            target: target.clone(),
            generation: self.detail_generation,
            record_loading: true,
            record: None,
            slots: Vec::new(),
            done: false,
        });
        self.query = target.label.clone();
        self.suggestions.clear();
        self.close_search();
        Some(Submitted {
            request: DetailRequest {
                generation: self.detail_generation,
                target,
            },
            event,
        })
    }

    /// Apply one detail event. Events from a superseded search are dropped.
    pub fn apply_detail(&mut self, message: DetailMessage) -> bool {
        let Some(detail) = self.detail.as_mut() else {
            trace!("detail event with no open view gen={}", message.generation);
            return false;
        };
        if message.generation != detail.generation {
            trace!(
                "dropping stale detail gen={} current={}",
                message.generation,
                detail.generation
            );
            return false;
        }

        match message.event {
            DetailEvent::Record { record, slots } => {
                detail.record_loading = false;
                detail.record = Some(record);
                detail.slots = slots.into_iter().map(SlotState::new).collect();
            }
            DetailEvent::Weather { slot, weather } => {
                if let Some(state) = detail.slot_mut(slot) {
                    state.weather_loading = false;
                    if weather.is_some() || state.weather.is_none() {
                        state.weather = weather;
                    }
                }
            }
            DetailEvent::Nas { slot, nas } => {
                if let Some(state) = detail.slot_mut(slot) {
                    state.nas_loading = false;
                    state.nas = Some(nas);
                }
            }
            DetailEvent::Done => {
                detail.done = true;
                detail.record_loading = false;
                for state in &mut detail.slots {
                    state.weather_loading = false;
                    state.nas_loading = false;
                }
            }
        }
        true
    }

    pub fn close_detail(&mut self) {
        if self.detail.take().is_some() {
            self.search_expanded = true;
            debug!("detail closed");
        }
    }

    pub fn toggle_nav(&mut self) {
        self.nav_open = !self.nav_open;
    }

    pub fn open_help(&mut self) {
        self.input_mode = InputMode::Help;
        debug!("open help");
    }

    pub fn close_help(&mut self) {
        self.input_mode = InputMode::Normal;
        debug!("close help");
    }

    pub fn toggle_theme(&mut self) {
        self.theme_mode = self.theme_mode.toggle();
        debug!("theme -> {}", self.theme_mode.label());
        self.save_theme();
    }

    /// Write the theme into the config file, keeping the rest of it intact.
    pub fn save_theme(&mut self) {
        let existing = fs::read_to_string(&self.config_path).unwrap_or_default();
        let mut doc = existing
            .parse::<DocumentMut>()
            .unwrap_or_else(|_| DocumentMut::new());
        doc["theme"] = value(self.theme_mode.config_value());

        if let Err(err) = fs::write(&self.config_path, doc.to_string()) {
            warn!("theme save failed: {err}");
            self.set_status(format!("theme not saved: {err}"));
        } else {
            info!("theme saved {}", self.config_path.display());
            self.set_status(format!("theme {}", self.theme_mode.label()));
        }
    }

    pub fn set_status(&mut self, message: String) {
        self.status = Some((message, Instant::now()));
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|(_, at)| at.elapsed() <= STATUS_TTL)
            .map(|(message, _)| message.as_str())
    }

    pub fn is_loading(&self) -> bool {
        self.suggestions_loading
            || self.detail.as_ref().is_some_and(|detail| !detail.done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Backend;
    use crate::fetch::{load_pool, run_detail_fetch, FetchSettings};
    use crate::fixtures::FixtureBackend;
    use crate::model::{SearchTarget, WeatherSource};
    use chrono::TimeZone;
    use std::sync::{mpsc, Arc};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 18, 0, 0).unwrap()
    }

    fn app_with_pool() -> App {
        let mut app = App::new(
            ThemeMode::Default,
            PathBuf::from("cirrostrats.toml"),
            Duration::from_millis(300),
            None,
            "fixtures".to_string(),
        );
        let pool = load_pool(&FixtureBackend::default());
        app.apply_suggestions(SuggestionMessage::Pool(pool));
        app
    }

    fn type_text(app: &mut App, text: &str, at: Instant) {
        for ch in text.chars() {
            app.push_search_char(ch, at);
        }
    }

    #[test]
    fn debounced_typing_sends_one_request() {
        let mut app = app_with_pool();
        let start = Instant::now();
        app.open_search();
        type_text(&mut app, "EW", start);
        assert!(app.poll_debounce(start + Duration::from_millis(100)).is_none());
        app.push_search_char('R', start + Duration::from_millis(200));
        assert!(app.poll_debounce(start + Duration::from_millis(400)).is_none());

        let request = app.poll_debounce(start + Duration::from_millis(500)).unwrap();
        assert_eq!(request.query, "EWR");
        assert_eq!(request.generation, 1);
        assert!(app.suggestions_loading);
        assert!(app.poll_debounce(start + Duration::from_secs(2)).is_none());
    }

    #[test]
    fn stale_suggestions_are_ignored() {
        let mut app = app_with_pool();
        let start = Instant::now();
        app.push_search_char('J', start);
        let first = app.poll_debounce(start + Duration::from_secs(1)).unwrap();
        app.push_search_char('F', start + Duration::from_secs(1));
        let second = app.poll_debounce(start + Duration::from_secs(2)).unwrap();

        let fresh = filter_options(&app.pool, "JF");
        assert!(app.apply_suggestions(SuggestionMessage::Results {
            generation: second.generation,
            options: fresh.clone(),
        }));
        assert!(!app.apply_suggestions(SuggestionMessage::Results {
            generation: first.generation,
            options: Vec::new(),
        }));
        assert_eq!(app.suggestions, fresh);
        assert!(!app.suggestions_loading);
    }

    #[test]
    fn suggestions_in_flight_at_submit_are_dropped() {
        let mut app = app_with_pool();
        let start = Instant::now();
        app.open_search();
        app.push_search_char('E', start);
        let pending = app.poll_debounce(start + Duration::from_secs(1)).unwrap();
        app.query = "JFK".to_string();
        let submitted = app.submit(now()).unwrap();
        assert_eq!(submitted.request.target.value(), "JFK");

        assert!(!app.apply_suggestions(SuggestionMessage::Results {
            generation: pending.generation,
            options: filter_options(&app.pool, "E"),
        }));
        assert!(app.suggestions.is_empty());

        app.open_search();
        assert!(app
            .suggestions
            .iter()
            .all(|option| option.label.contains("JFK")));
    }

    #[test]
    fn closing_search_drops_pending_results() {
        let mut app = app_with_pool();
        let start = Instant::now();
        app.open_search();
        app.push_search_char('O', start);
        let pending = app.poll_debounce(start + Duration::from_secs(1)).unwrap();
        app.close_search();
        assert!(!app.apply_suggestions(SuggestionMessage::Results {
            generation: pending.generation,
            options: filter_options(&app.pool, "O"),
        }));
        assert!(!app.suggestions_loading);
    }

    #[test]
    fn typed_code_resolves_against_pool() {
        let mut app = app_with_pool();
        app.open_search();
        type_text(&mut app, "ewr", Instant::now());
        let submitted = app.submit(now()).unwrap();
        match &submitted.request.target.target {
            SearchTarget::Airport { code, id, .. } => {
                assert_eq!(code.as_deref(), Some("EWR"));
                assert_eq!(id.as_deref(), Some("ap-ewr"));
            }
            other => panic!("expected airport, got {other:?}"),
        }
        assert_eq!(submitted.event.submit_term, "ewr");
        assert_eq!(submitted.event.email, crate::tracking::ANONYMOUS_EMAIL);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(!app.search_expanded);
    }

    #[test]
    fn selected_suggestion_wins_over_text() {
        let mut app = app_with_pool();
        app.suggestions = filter_options(&app.pool, "4433");
        app.query = "4433".to_string();
        app.next_suggestion();
        let submitted = app.submit(now()).unwrap();
        assert_eq!(submitted.event.submit_term, "GJS4433");
        assert!(matches!(
            submitted.request.target.target,
            SearchTarget::Flight { .. }
        ));
    }

    #[test]
    fn unknown_text_sets_status() {
        let mut app = app_with_pool();
        app.query = "zz-top".to_string();
        assert!(app.submit(now()).is_none());
        assert!(app.detail.is_none());
        assert_eq!(app.status_text(), Some("no match for zz-top"));
    }

    #[test]
    fn stale_detail_events_are_ignored() {
        let mut app = app_with_pool();
        app.query = "EWR".to_string();
        let first = app.submit(now()).unwrap();
        app.query = "JFK".to_string();
        let second = app.submit(now()).unwrap();
        assert!(second.request.generation > first.request.generation);

        let backend: Arc<dyn Backend> = Arc::new(FixtureBackend::default());
        let (tx, rx) = mpsc::channel();
        run_detail_fetch(&backend, FetchSettings::default(), first.request, &tx);
        drop(tx);
        for message in rx.iter() {
            assert!(!app.apply_detail(message));
        }
        let detail = app.detail.as_ref().unwrap();
        assert!(detail.record_loading);
        assert_eq!(detail.target.value(), "JFK");
    }

    #[test]
    fn cached_weather_shows_before_live_arrives() {
        let mut app = app_with_pool();
        app.query = "EWR".to_string();
        let submitted = app.submit(now()).unwrap();

        let backend: Arc<dyn Backend> = Arc::new(FixtureBackend::default());
        let (tx, rx) = mpsc::channel();
        run_detail_fetch(&backend, FetchSettings::default(), submitted.request, &tx);
        drop(tx);
        let mut messages = rx.iter();

        assert!(app.apply_detail(messages.next().unwrap()));
        let slot = app.detail.as_ref().unwrap().slot(Slot::Airport).unwrap();
        assert!(slot.weather_loading);
        assert!(slot.nas_loading);
        assert_eq!(slot.weather.as_ref().unwrap().source, WeatherSource::Cached);

        for message in messages {
            assert!(app.apply_detail(message));
        }
        let detail = app.detail.as_ref().unwrap();
        assert!(detail.done);
        let slot = detail.slot(Slot::Airport).unwrap();
        assert!(!slot.weather_loading && !slot.nas_loading);
        assert_eq!(slot.weather.as_ref().unwrap().source, WeatherSource::Live);
        assert!(!app.is_loading());
    }

    #[test]
    fn suggestion_cursor_wraps() {
        let mut app = app_with_pool();
        app.suggestions = filter_options(&app.pool, "EWR");
        app.previous_suggestion();
        assert_eq!(app.suggestion_cursor, Some(4));
        app.next_suggestion();
        assert_eq!(app.suggestion_cursor, Some(0));
        app.suggestions.clear();
        app.next_suggestion();
        assert_eq!(app.suggestion_cursor, None);
    }

    #[test]
    fn theme_save_preserves_other_keys() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!("cirrostrats-theme-test-{suffix}"));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cirrostrats.toml");
        fs::write(&path, "# backend\napi_url = \"http://localhost:8000\"\ntheme = \"default\"\n")
            .unwrap();

        let mut app = App::new(
            ThemeMode::Default,
            path.clone(),
            Duration::ZERO,
            None,
            String::new(),
        );
        app.toggle_theme();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("# backend"));
        assert!(text.contains("api_url = \"http://localhost:8000\""));
        assert!(text.contains("theme = \"color\""));
        assert_eq!(ThemeMode::from_str("color"), app.theme_mode);
        let _ = fs::remove_dir_all(&dir);
    }
}
