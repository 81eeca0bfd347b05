use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use crate::api::{ApiError, Backend};
use crate::model::{
    icao_code, CachedAirport, FlightDetail, FlightLeg, GateDetail, NasStatus, SearchOption,
    SearchTarget, WeatherRecord,
};
use crate::suggest::{filter_options, format_suggestions, SuggestionKind, MAX_MATCHES};
use crate::weather::{reconcile, SelectedWeather, StoreLiveWeather};

/// Which airport card of the detail view a weather/NAS result belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Airport,
    Departure,
    Arrival,
}

impl Slot {
    pub fn label(self) -> &'static str {
        match self {
            Slot::Airport => "Airport",
            Slot::Departure => "Departure",
            Slot::Arrival => "Arrival",
        }
    }
}

#[derive(Clone, Debug)]
pub enum DetailRecord {
    Airport(CachedAirport),
    Flight(FlightDetail),
    Gate(GateDetail),
}

/// An airport the detail view shows weather and NAS status for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AirportSlot {
    pub slot: Slot,
    pub code: Option<String>,
    pub icao: Option<String>,
    pub reference_id: Option<String>,
    pub cached: Option<WeatherRecord>,
}

impl AirportSlot {
    fn new(
        slot: Slot,
        code: Option<String>,
        reference_id: Option<String>,
        cached: Option<WeatherRecord>,
    ) -> Self {
        let icao = code.as_deref().and_then(icao_code);
        AirportSlot {
            slot,
            code,
            icao,
            reference_id,
            cached: cached.filter(|w| !w.is_empty()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchSettings {
    pub live_weather: bool,
    pub nas_enabled: bool,
    pub store_live_weather: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            live_weather: true,
            nas_enabled: true,
            store_live_weather: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DetailRequest {
    pub generation: u64,
    pub target: SearchOption,
}

#[derive(Debug)]
pub enum DetailEvent {
    /// Cached record plus the airports that will receive weather/NAS events.
    Record {
        record: Result<DetailRecord, String>,
        slots: Vec<AirportSlot>,
    },
    Weather {
        slot: Slot,
        weather: Option<SelectedWeather>,
    },
    Nas {
        slot: Slot,
        nas: Result<NasStatus, String>,
    },
    Done,
}

#[derive(Debug)]
pub struct DetailMessage {
    pub generation: u64,
    pub event: DetailEvent,
}

pub fn spawn_detail_fetcher(
    backend: Arc<dyn Backend>,
    settings: FetchSettings,
    rx: Receiver<DetailRequest>,
    tx: Sender<DetailMessage>,
) {
    thread::spawn(move || {
        info!("detail fetcher started");
        while let Ok(request) = rx.recv() {
            let backend = Arc::clone(&backend);
            let tx = tx.clone();
            thread::spawn(move || run_detail_fetch(&backend, settings, request, &tx));
        }
        debug!("detail request channel closed");
    });
}

/// Fetch everything one search needs. The cached record comes first since
/// it supplies the airport codes; live weather and NAS status then run in
/// parallel for each airport and report on their own.
pub fn run_detail_fetch(
    backend: &Arc<dyn Backend>,
    settings: FetchSettings,
    request: DetailRequest,
    tx: &Sender<DetailMessage>,
) {
    let generation = request.generation;
    let send = |event: DetailEvent| {
        let _ = tx.send(DetailMessage { generation, event });
    };

    let record = fetch_record(backend.as_ref(), &request.target);
    if let Err(err) = &record {
        warn!("cached record for {} failed: {err}", request.target.value());
    }
    let slots = airport_slots(&request.target, record.as_ref().ok());
    send(DetailEvent::Record {
        record: record.map_err(|err| err.to_string()),
        slots: slots.clone(),
    });

    thread::scope(|scope| {
        for slot in &slots {
            let Some(icao) = slot.icao.as_deref() else {
                let outcome = reconcile(slot.cached.as_ref(), None, None, "");
                send(DetailEvent::Weather {
                    slot: slot.slot,
                    weather: outcome.selected,
                });
                send(DetailEvent::Nas {
                    slot: slot.slot,
                    nas: Err("no airport code".to_string()),
                });
                continue;
            };

            scope.spawn(move || {
                let live = if settings.live_weather {
                    match backend.live_weather(icao) {
                        Ok(record) => Some(record),
                        Err(err) => {
                            warn!("live weather for {icao} failed: {err}");
                            None
                        }
                    }
                } else {
                    None
                };
                let outcome = reconcile(
                    slot.cached.as_ref(),
                    live.as_ref(),
                    slot.reference_id.as_deref(),
                    icao,
                );
                send(DetailEvent::Weather {
                    slot: slot.slot,
                    weather: outcome.selected,
                });
                if let Some(store) = outcome.store.filter(|_| settings.store_live_weather) {
                    spawn_store(Arc::clone(backend), store);
                }
            });

            scope.spawn(move || {
                let nas = if settings.nas_enabled {
                    backend.nas_status(icao).map_err(|err| {
                        warn!("NAS status for {icao} failed: {err}");
                        err.to_string()
                    })
                } else {
                    Err("NAS lookups disabled".to_string())
                };
                send(DetailEvent::Nas {
                    slot: slot.slot,
                    nas,
                });
            });
        }
    });

    send(DetailEvent::Done);
}

/// Push a fresher observation back to the cache. Detached so the detail
/// flow never waits on it; failures only reach the log.
fn spawn_store(backend: Arc<dyn Backend>, store: StoreLiveWeather) {
    thread::spawn(move || match backend.store_live_weather(&store) {
        Ok(()) => debug!("stored live weather for {}", store.raw_code),
        Err(err) => warn!("store live weather for {} failed: {err}", store.raw_code),
    });
}

fn fetch_record(backend: &dyn Backend, target: &SearchOption) -> Result<DetailRecord, ApiError> {
    match &target.target {
        SearchTarget::Airport { code, name, id } => match id.as_deref() {
            Some(id) => backend.cached_airport(id).map(DetailRecord::Airport),
            // Typed codes have no cached document; go straight to live data.
            None => Ok(DetailRecord::Airport(CachedAirport::new(
                code.as_deref(),
                name.as_deref(),
                None,
                None,
            ))),
        },
        SearchTarget::Flight { .. } => backend
            .flight_detail(&target.value())
            .map(DetailRecord::Flight),
        SearchTarget::Gate { gate, .. } => backend.gate_detail(gate).map(DetailRecord::Gate),
    }
}

/// Airports to enrich for a target, taken from the cached record when it
/// arrived and from the target itself otherwise.
pub fn airport_slots(target: &SearchOption, record: Option<&DetailRecord>) -> Vec<AirportSlot> {
    match (&target.target, record) {
        (SearchTarget::Airport { code, id, .. }, record) => {
            let cached = match record {
                Some(DetailRecord::Airport(airport)) => Some(airport),
                _ => None,
            };
            let code = cached
                .and_then(|a| a.code.clone())
                .or_else(|| code.clone());
            let reference_id = cached
                .and_then(|a| a.reference_id.clone())
                .or_else(|| id.clone());
            let weather = cached.and_then(|a| a.weather().cloned());
            vec![AirportSlot::new(Slot::Airport, code, reference_id, weather)]
        }
        (SearchTarget::Flight { .. }, Some(DetailRecord::Flight(detail))) => [
            (Slot::Departure, detail.departure.as_ref()),
            (Slot::Arrival, detail.arrival.as_ref()),
        ]
        .into_iter()
        .filter_map(|(slot, leg)| leg.map(|leg| leg_slot(slot, leg)))
        .collect(),
        (SearchTarget::Flight { .. }, _) => Vec::new(),
        (SearchTarget::Gate { airport, .. }, record) => {
            let code = match record {
                Some(DetailRecord::Gate(gate)) => gate.airport.clone(),
                _ => None,
            }
            .or_else(|| airport.clone());
            vec![AirportSlot::new(Slot::Airport, code, None, None)]
        }
    }
}

fn leg_slot(slot: Slot, leg: &FlightLeg) -> AirportSlot {
    AirportSlot::new(
        slot,
        leg.code.clone(),
        leg.weather_reference_id.clone(),
        leg.weather.clone(),
    )
}

#[derive(Clone, Debug)]
pub struct SuggestionRequest {
    pub generation: u64,
    pub query: String,
}

#[derive(Debug)]
pub enum SuggestionMessage {
    /// Local option pool, sent once at startup.
    Pool(Vec<SearchOption>),
    Results {
        generation: u64,
        options: Vec<SearchOption>,
    },
}

pub fn spawn_suggestion_fetcher(
    backend: Arc<dyn Backend>,
    email: Option<String>,
    rx: Receiver<SuggestionRequest>,
    tx: Sender<SuggestionMessage>,
) {
    thread::spawn(move || {
        let pool = load_pool(backend.as_ref());
        info!("suggestion pool loaded: {} options", pool.len());
        let _ = tx.send(SuggestionMessage::Pool(pool.clone()));

        while let Ok(mut request) = rx.recv() {
            // Only the newest query matters.
            while let Ok(newer) = rx.try_recv() {
                request = newer;
            }
            let options = suggestions_for(backend.as_ref(), email.as_deref(), &pool, &request.query);
            let _ = tx.send(SuggestionMessage::Results {
                generation: request.generation,
                options,
            });
        }
        debug!("suggestion request channel closed");
    });
}

pub fn load_pool(backend: &dyn Backend) -> Vec<SearchOption> {
    let mut pool = Vec::new();
    for kind in [
        SuggestionKind::Airport,
        SuggestionKind::Flight,
        SuggestionKind::Gate,
    ] {
        match backend.suggestion_pool(kind) {
            Ok(value) => pool.extend(format_suggestions(&value, kind)),
            Err(err) => warn!("suggestion pool {kind:?} failed: {err}"),
        }
    }
    pool
}

/// Personalised suggestions when a user is known, falling back to the local
/// pool whenever that call fails.
pub fn suggestions_for(
    backend: &dyn Backend,
    email: Option<&str>,
    pool: &[SearchOption],
    query: &str,
) -> Vec<SearchOption> {
    if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
        match backend.suggestions(email, query.trim(), 1, MAX_MATCHES as u32) {
            Ok(value) => {
                let mut options = format_suggestions(&value, SuggestionKind::Airport);
                if !options.is_empty() {
                    options.truncate(MAX_MATCHES);
                    return options;
                }
            }
            Err(err) => debug!("personalised suggestions failed: {err}"),
        }
    }
    filter_options(pool, query)
}
