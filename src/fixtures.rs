//! Offline backend used in test-data mode. It serves a fixed set of airports,
//! gates and flights and records the side-effect calls it receives.

use std::sync::Mutex;

use serde_json::{json, Value};
use tracing::debug;

use crate::api::{ApiError, Backend};
use crate::model::{icao_code, CachedAirport, FlightDetail, GateDetail, NasStatus, WeatherRecord};
use crate::suggest::SuggestionKind;
use crate::tracking::SearchEvent;
use crate::weather::StoreLiveWeather;

const AIRPORTS: [(&str, &str, &str); 6] = [
    ("JFK", "John F Kennedy International Airport", "ap-jfk"),
    ("EWR", "Newark Liberty International Airport", "ap-ewr"),
    ("ORD", "Chicago O'Hare International Airport", "ap-ord"),
    ("SFO", "San Francisco International Airport", "ap-sfo"),
    ("DEN", "Denver International Airport", "ap-den"),
    ("LGA", "LaGuardia Airport", "ap-lga"),
];

const EWR_GATES: [&str; 6] = ["C101", "C102", "C103", "C104", "C105", "C106"];

#[derive(Default)]
pub struct FixtureBackend {
    tracked: Mutex<Vec<SearchEvent>>,
    stored: Mutex<Vec<StoreLiveWeather>>,
    failures: Failures,
}

/// Calls the fixture answers with a transport error, for exercising
/// partial-failure paths.
#[derive(Default, Clone, Copy)]
pub struct Failures {
    pub cached: bool,
    pub live: bool,
    pub nas: bool,
    pub store: bool,
    pub track: bool,
}

impl FixtureBackend {
    #[cfg(test)]
    pub fn with_failures(failures: Failures) -> Self {
        FixtureBackend {
            failures,
            ..FixtureBackend::default()
        }
    }

    pub fn tracked(&self) -> Vec<SearchEvent> {
        self.tracked.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn stored(&self) -> Vec<StoreLiveWeather> {
        self.stored.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn fail(&self, pick: fn(&Failures) -> bool) -> Result<(), ApiError> {
        if pick(&self.failures) {
            Err(ApiError::Transport("fixture failure".to_string()))
        } else {
            Ok(())
        }
    }
}

fn cached_weather(icao: &str) -> Option<WeatherRecord> {
    let record = match icao {
        "KJFK" => WeatherRecord {
            datis: Some(
                "JFK ATIS INFO D 1751Z. 31008KT 10SM FEW250 21/08 A3002. ILS RWY 4R APCH. DEPG RWY 4L."
                    .to_string(),
            ),
            metar: Some("KJFK 171751Z 31008KT 10SM FEW250 21/08 A3002".to_string()),
            taf: Some("KJFK 171720Z 1718/1824 31010KT P6SM FEW250".to_string()),
        },
        "KEWR" => WeatherRecord {
            datis: Some(
                "EWR ARR/DEP INFO K 1651Z. 22012KT 3SM BR BKN008 18/17 A2992. LDG RWY 22L. DEPG RWY 22R."
                    .to_string(),
            ),
            metar: Some("KEWR 171651Z 22012KT 3SM BR BKN008 18/17 A2992".to_string()),
            taf: Some("KEWR 171720Z 1718/1824 22012KT 2SM BR OVC006 TEMPO 1720/1724 1/2SM FG".to_string()),
        },
        "KORD" => WeatherRecord {
            datis: None,
            metar: Some("KORD 171751Z 27015G25KT 10SM SCT045 BKN250 19/06 A2987".to_string()),
            taf: Some("KORD 171720Z 1718/1824 27015G25KT P6SM SCT045".to_string()),
        },
        _ => return None,
    };
    Some(record)
}

fn live_weather(icao: &str) -> Option<WeatherRecord> {
    match icao {
        // Newer observation than the cached copy.
        "KEWR" => Some(WeatherRecord {
            datis: Some(
                "EWR ARR/DEP INFO L 1751Z. 22014KT 1 1/2SM -TSRA BR OVC004 18/17 A2990. LDG RWY 22L. LLWS ADZYS IN EFCT."
                    .to_string(),
            ),
            metar: Some("KEWR 171751Z 22014KT 1 1/2SM -TSRA BR OVC004 18/17 A2990".to_string()),
            taf: Some("KEWR 171720Z 1718/1824 22012KT 2SM BR OVC006 TEMPO 1720/1724 1/2SM FG".to_string()),
        }),
        "KSFO" => Some(WeatherRecord {
            datis: Some("SFO ATIS INFO R 1756Z. 29016KT 10SM FEW008 16/11 A3004. SIMUL CHARTED VISUAL APCHS RWY 28L AND RWY 28R.".to_string()),
            metar: Some("KSFO 171756Z 29016KT 10SM FEW008 16/11 A3004".to_string()),
            taf: None,
        }),
        "KDEN" => Some(WeatherRecord {
            datis: None,
            metar: Some("KDEN 171753Z 18009KT 10SM FEW120 24/M02 A3011".to_string()),
            taf: None,
        }),
        other => cached_weather(other),
    }
}

fn nas_status(icao: &str) -> NasStatus {
    let value = match icao {
        "KEWR" => json!({
            "Ground Delay": {
                "Reason": "low ceilings",
                "Average": "52 minutes",
                "Maximum": "1 hour and 37 minutes"
            }
        }),
        "KSFO" => json!({
            "Arrival/Departure Delay": {
                "Reason": "wind",
                "Arrival": "16-30 minutes and increasing"
            }
        }),
        _ => json!({}),
    };
    NasStatus::from(value)
}

fn airport_by_id(id: &str) -> Option<CachedAirport> {
    AIRPORTS
        .iter()
        .find(|(_, _, ref_id)| *ref_id == id)
        .map(|(code, name, ref_id)| {
            let weather = icao_code(code).and_then(|icao| cached_weather(&icao));
            CachedAirport::new(Some(*code), Some(*name), Some(*ref_id), weather)
        })
}

fn flight_value(flight_id: &str) -> Option<Value> {
    let value = match flight_id.trim().to_ascii_uppercase().as_str() {
        "GJS4433" | "UA4433" => json!({
            "flightID": "GJS4433",
            "registration": "N87353",
            "route": "KEWR PARKE J6 HVQ KORD",
            "filedAltitude": "FL340",
            "departure": {
                "code": "EWR",
                "gate": "C101",
                "scheduled": "2026-10-17 14:05 EDT",
                "estimated": "1815Z",
                "mdbAirportReferenceId": "ap-ewr",
                "weather": cached_weather("KEWR")
            },
            "arrival": {
                "code": "ORD",
                "gate": "F11",
                "scheduled": "2026-10-17 15:40 CDT",
                "mdbAirportReferenceId": "ap-ord",
                "weather": cached_weather("KORD")
            }
        }),
        "UAL414" | "UA414" => json!({
            "flightID": "UAL414",
            "registration": "N37281",
            "route": "KSFO MOD4 LIN J84 SAC KEWR",
            "filedAltitude": "FL370",
            "departure": {
                "code": "SFO",
                "gate": "F9",
                "scheduled": "0645 PDT",
                "mdbAirportReferenceId": "ap-sfo"
            },
            "arrival": {
                "code": "EWR",
                "gate": "C104",
                "scheduled": "1503 EDT",
                "estimated": "1911Z",
                "mdbAirportReferenceId": "ap-ewr",
                "weather": cached_weather("KEWR")
            }
        }),
        "DAL1205" | "DL1205" => json!({
            "flightID": "DAL1205",
            "registration": "N3762Y",
            "route": "KJFK DEEZZ5 CANDR J60 PSB KDEN",
            "filedAltitude": "FL360",
            "departure": {"code": "JFK", "gate": "B27", "scheduled": "1300Z", "mdbAirportReferenceId": "ap-jfk"},
            "arrival": {"code": "DEN", "gate": "A38", "scheduled": "1352 MDT", "mdbAirportReferenceId": "ap-den"}
        }),
        _ => return None,
    };
    Some(value)
}

fn gate_value(gate: &str) -> Option<Value> {
    let gate = gate.trim().to_ascii_uppercase();
    if !EWR_GATES.contains(&gate.as_str()) {
        return None;
    }
    let flights = if gate == "C101" {
        json!([
            {"flightID": "GJS4433", "scheduled": "2026-10-17 14:05 EDT", "destination": "ORD"},
            {"flightID": "UAL1871", "scheduled": "2026-10-17 17:30 EDT", "destination": "IAH"}
        ])
    } else {
        json!([{"flightID": "UAL2210", "scheduled": "2026-10-17 16:15 EDT", "destination": "DEN"}])
    };
    Some(json!({"gate": gate, "airport": "EWR", "flights": flights}))
}

impl Backend for FixtureBackend {
    fn suggestion_pool(&self, kind: SuggestionKind) -> Result<Value, ApiError> {
        let value = match kind {
            SuggestionKind::Airport => Value::Array(
                AIRPORTS
                    .iter()
                    .map(|(code, name, id)| json!({"code": code, "name": name, "r_id": id}))
                    .collect(),
            ),
            SuggestionKind::Flight => json!([
                {"type": "flight", "flightID": "GJS4433"},
                {"type": "flight", "flightID": "UAL414"},
                {"type": "flight", "flightID": "DAL1205"},
                {"type": "flight", "flightID": "AAL100"},
                {"type": "flight", "flightID": "UCA5678"}
            ]),
            SuggestionKind::Gate => Value::Array(
                EWR_GATES
                    .iter()
                    .map(|gate| {
                        json!({
                            "type": "gate",
                            "gate": gate,
                            "airport": "EWR",
                            "display": format!("EWR - {gate} Departures")
                        })
                    })
                    .collect(),
            ),
        };
        Ok(value)
    }

    fn suggestions(
        &self,
        _email: &str,
        query: &str,
        _page: u32,
        page_size: u32,
    ) -> Result<Value, ApiError> {
        let needle = query.trim().to_ascii_uppercase();
        let matches: Vec<Value> = AIRPORTS
            .iter()
            .filter(|(code, name, _)| {
                code.contains(&needle) || name.to_ascii_uppercase().contains(&needle)
            })
            .take(page_size as usize)
            .enumerate()
            .map(|(idx, (code, name, id))| {
                json!({"type": "airport", "code": code, "name": name, "r_id": id, "stId": format!("st-{idx}")})
            })
            .collect();
        Ok(Value::Array(matches))
    }

    fn cached_airport(&self, id: &str) -> Result<CachedAirport, ApiError> {
        self.fail(|f| f.cached)?;
        airport_by_id(id).ok_or(ApiError::NotFound)
    }

    fn flight_detail(&self, flight_id: &str) -> Result<FlightDetail, ApiError> {
        self.fail(|f| f.cached)?;
        let value = flight_value(flight_id).ok_or(ApiError::NotFound)?;
        Ok(serde_json::from_value(value)?)
    }

    fn gate_detail(&self, gate: &str) -> Result<GateDetail, ApiError> {
        self.fail(|f| f.cached)?;
        let value = gate_value(gate).ok_or(ApiError::NotFound)?;
        Ok(GateDetail::from_value(value)?)
    }

    fn live_weather(&self, icao: &str) -> Result<WeatherRecord, ApiError> {
        self.fail(|f| f.live)?;
        live_weather(icao).ok_or(ApiError::NotFound)
    }

    fn nas_status(&self, icao: &str) -> Result<NasStatus, ApiError> {
        self.fail(|f| f.nas)?;
        Ok(nas_status(icao))
    }

    fn store_live_weather(&self, request: &StoreLiveWeather) -> Result<(), ApiError> {
        debug!(
            "fixture store live weather ref={} code={}",
            request.reference_id, request.raw_code
        );
        if let Ok(mut stored) = self.stored.lock() {
            stored.push(request.clone());
        }
        self.fail(|f| f.store)
    }

    fn track_search(&self, event: &SearchEvent) -> Result<(), ApiError> {
        if let Ok(mut tracked) = self.tracked.lock() {
            tracked.push(event.clone());
        }
        self.fail(|f| f.track)
    }
}

#[cfg(test)]
mod tests {
    use super::FixtureBackend;
    use crate::api::Backend;
    use crate::suggest::{filter_options, format_suggestions, SuggestionKind};

    fn pool(backend: &FixtureBackend) -> Vec<crate::model::SearchOption> {
        let mut pool = Vec::new();
        for kind in [SuggestionKind::Airport, SuggestionKind::Flight, SuggestionKind::Gate] {
            let value = backend.suggestion_pool(kind).unwrap();
            pool.extend(format_suggestions(&value, kind));
        }
        pool
    }

    #[test]
    fn typing_jfk_yields_one_airport() {
        let backend = FixtureBackend::default();
        let found = filter_options(&pool(&backend), "JFK");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].label, "JFK - John F Kennedy International Airport");
    }

    #[test]
    fn typing_ewr_yields_five_with_gate() {
        let backend = FixtureBackend::default();
        let found = filter_options(&pool(&backend), "EWR");
        assert_eq!(found.len(), 5);
        assert!(found.iter().any(|o| o.label == "EWR - C101 Departures"));
    }

    #[test]
    fn flight_detail_has_both_legs() {
        let backend = FixtureBackend::default();
        let detail = backend.flight_detail("GJS4433").unwrap();
        for leg in [detail.departure.unwrap(), detail.arrival.unwrap()] {
            assert!(leg.gate.is_some());
            assert!(leg.scheduled.is_some());
            let weather = leg.weather.unwrap();
            assert!(weather.metar.is_some());
            assert!(weather.taf.is_some());
        }
        assert!(backend.flight_detail("XYZ1").is_err());
    }
}
