use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::model::{CachedAirport, FlightDetail, GateDetail, NasStatus, WeatherRecord};
use crate::suggest::SuggestionKind;
use crate::tracking::SearchEvent;
use crate::weather::StoreLiveWeather;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("HTTP {status}")]
    Http { status: u16 },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
            }
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Everything the dashboard asks of the Cirrostrats backend.
pub trait Backend: Send + Sync {
    fn suggestion_pool(&self, kind: SuggestionKind) -> Result<Value, ApiError>;
    fn suggestions(
        &self,
        email: &str,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Value, ApiError>;
    fn cached_airport(&self, id: &str) -> Result<CachedAirport, ApiError>;
    fn flight_detail(&self, flight_id: &str) -> Result<FlightDetail, ApiError>;
    fn gate_detail(&self, gate: &str) -> Result<GateDetail, ApiError>;
    fn live_weather(&self, icao: &str) -> Result<WeatherRecord, ApiError>;
    fn nas_status(&self, icao: &str) -> Result<NasStatus, ApiError>;
    fn store_live_weather(&self, request: &StoreLiveWeather) -> Result<(), ApiError>;
    fn track_search(&self, event: &SearchEvent) -> Result<(), ApiError>;
}

pub struct HttpBackend {
    client: Client,
    base: Url,
    legacy_weather_endpoint: bool,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        insecure: bool,
        legacy_weather_endpoint: bool,
    ) -> Result<Self, ApiError> {
        let base = Url::parse(base_url.trim())
            .map_err(|err| ApiError::Transport(format!("invalid API URL {base_url}: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Transport(format!(
                "API URL cannot carry a path: {base_url}"
            )));
        }
        let client = Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base,
            legacy_weather_endpoint,
        })
    }

    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    fn get_value(&self, url: Url) -> Result<Value, ApiError> {
        debug!("GET {url}");
        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }
        Ok(resp.json::<Value>()?)
    }

    fn get_typed<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let value = self.get_value(url)?;
        if value.is_null() {
            return Err(ApiError::NotFound);
        }
        Ok(serde_json::from_value(value)?)
    }

    fn post<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<(), ApiError> {
        debug!("POST {url}");
        let resp = self.client.post(url).json(body).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

impl Backend for HttpBackend {
    fn suggestion_pool(&self, kind: SuggestionKind) -> Result<Value, ApiError> {
        let segment = match kind {
            SuggestionKind::Airport => "airports",
            SuggestionKind::Flight => "flightNumbers",
            SuggestionKind::Gate => "gates",
        };
        self.get_value(self.url(&[segment], &[])).map(unwrap_list)
    }

    fn suggestions(
        &self,
        email: &str,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Value, ApiError> {
        let page = page.to_string();
        let page_size = page_size.to_string();
        let url = self.url(
            &["searches", "suggestions", email],
            &[("query", query), ("page", &page), ("page_size", &page_size)],
        );
        self.get_value(url).map(unwrap_list)
    }

    fn cached_airport(&self, id: &str) -> Result<CachedAirport, ApiError> {
        let endpoint = if self.legacy_weather_endpoint {
            "mdbAirportWeather"
        } else {
            "mdbAirportWeatherById"
        };
        self.get_typed(self.url(&[endpoint, id], &[]))
    }

    fn flight_detail(&self, flight_id: &str) -> Result<FlightDetail, ApiError> {
        self.get_typed(self.url(&["flightDetails", flight_id], &[]))
    }

    fn gate_detail(&self, gate: &str) -> Result<GateDetail, ApiError> {
        let value = self.get_value(self.url(&["gates", gate], &[]))?;
        if value.is_null() {
            return Err(ApiError::NotFound);
        }
        Ok(GateDetail::from_value(value)?)
    }

    fn live_weather(&self, icao: &str) -> Result<WeatherRecord, ApiError> {
        self.get_typed(self.url(&["liveAirportWeather", icao], &[]))
    }

    fn nas_status(&self, icao: &str) -> Result<NasStatus, ApiError> {
        let value = self.get_value(self.url(&["NAS"], &[("airport", icao)]))?;
        Ok(NasStatus::from(value))
    }

    fn store_live_weather(&self, request: &StoreLiveWeather) -> Result<(), ApiError> {
        let url = self.url(
            &["storeLiveWeather"],
            &[
                ("mdbAirportReferenceId", request.reference_id.as_str()),
                ("rawCode", request.raw_code.as_str()),
            ],
        );
        self.post(url, &request.record)
    }

    fn track_search(&self, event: &SearchEvent) -> Result<(), ApiError> {
        self.post(self.url(&["searches", "track"], &[]), event)
    }
}

/// Some endpoints wrap their list in an object; take the first array we find.
fn unwrap_list(body: Value) -> Value {
    if body.is_array() {
        return body;
    }
    if let Some(obj) = body.as_object() {
        let keys = ["suggestions", "results", "data", "items"];
        for key in keys {
            if let Some(array) = obj.get(key).filter(|v| v.is_array()) {
                return array.clone();
            }
        }
    }
    trace!("response carried no list");
    body
}
