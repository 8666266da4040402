//! Kalshi REST client
//!
//! Thin, deterministic wrapper over the two Kalshi hosts. No retries; a
//! non-2xx response surfaces as `KalshiError::Api` and the caller decides
//! what to do with it.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use margin_core::MarketSnapshot;

use crate::auth::RequestSigner;
use crate::error::KalshiError;
use crate::types::{Event, EventDetailResponse, EventsResponse, MarketsResponse};

/// Unauthenticated host serving the events namespace
const ELECTIONS_HOST: &str = "https://api.elections.kalshi.com";
/// Authenticated trading host for everything else
const TRADING_HOST: &str = "https://trading-api.kalshi.com";
/// Path prefix shared by all endpoints
const API_PREFIX: &str = "/trade-api/v2";

const DEFAULT_MARKETS_LIMIT: u32 = 100;

/// One page of events plus the cursor for the next page
#[derive(Debug)]
pub struct EventsPage {
    pub events: Vec<Event>,
    /// Opaque token to pass back verbatim on the next call; `None` when the
    /// server signalled the last page
    pub next_cursor: Option<String>,
}

/// Stateless Kalshi REST client
pub struct KalshiClient {
    client: Client,
    elections_host: String,
    trading_host: String,
    signer: RequestSigner,
}

impl KalshiClient {
    /// Create a client against the production hosts
    pub fn new(signer: RequestSigner) -> Self {
        Self::with_hosts(signer, ELECTIONS_HOST, TRADING_HOST)
    }

    /// Create a client with explicit hosts
    pub fn with_hosts(
        signer: RequestSigner,
        elections_host: impl Into<String>,
        trading_host: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            elections_host: elections_host.into(),
            trading_host: trading_host.into(),
            signer,
        }
    }

    /// List events, optionally scoped to a series, one page at a time
    #[instrument(skip(self))]
    pub async fn get_events(
        &self,
        limit: u32,
        status: &str,
        series_ticker: Option<&str>,
        with_nested_markets: bool,
        cursor: Option<&str>,
    ) -> Result<EventsPage, KalshiError> {
        let mut params = vec![
            ("limit", limit.to_string()),
            ("status", status.to_string()),
            (
                "with_nested_markets",
                with_nested_markets.to_string(),
            ),
        ];
        if let Some(series) = series_ticker {
            params.push(("series_ticker", series.to_string()));
        }
        if let Some(c) = cursor {
            params.push(("cursor", c.to_string()));
        }

        let response: EventsResponse = self.request_json("GET", "/events", &params).await?;

        Ok(EventsPage {
            events: response.events,
            next_cursor: response.cursor.filter(|c| !c.is_empty()),
        })
    }

    /// Fetch one event with its nested markets; `None` when the ticker is
    /// unknown to the venue (absence is expected on this path)
    #[instrument(skip(self))]
    pub async fn get_event_detail(
        &self,
        event_ticker: &str,
    ) -> Result<Option<crate::types::EventDetail>, KalshiError> {
        let path = format!("/events/{event_ticker}");
        let params = [("with_nested_markets", "true".to_string())];

        match self
            .request_json::<EventDetailResponse>("GET", &path, &params)
            .await
        {
            Ok(response) => Ok(Some(response.event)),
            Err(KalshiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// List markets with the given status
    #[instrument(skip(self))]
    pub async fn get_markets(&self, status: &str) -> Result<Vec<MarketSnapshot>, KalshiError> {
        let params = [
            ("limit", DEFAULT_MARKETS_LIMIT.to_string()),
            ("status", status.to_string()),
        ];

        let response: MarketsResponse = self.request_json("GET", "/markets", &params).await?;

        Ok(response
            .markets
            .iter()
            .map(|m| m.to_snapshot(None))
            .collect())
    }

    /// Perform one GET against the appropriate host.
    ///
    /// Routing rule: paths in the events namespace hit the unauthenticated
    /// elections host; all other paths hit the trading host with freshly
    /// signed headers. Empty query values are omitted entirely and params
    /// are serialized in sorted key order.
    async fn request_json<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, KalshiError> {
        let path = if path.starts_with(API_PREFIX) {
            path.to_string()
        } else {
            format!("{API_PREFIX}{path}")
        };

        let (base_url, requires_auth) = if path.contains("events") {
            (self.elections_host.as_str(), false)
        } else {
            (self.trading_host.as_str(), true)
        };

        let mut query: Vec<(&str, &str)> = params
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        query.sort_by_key(|(k, _)| *k);

        let mut url = format!("{base_url}{path}");
        if !query.is_empty() {
            let query_string = query
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&query_string);
        }

        let mut request = self.client.get(&url);
        if requires_auth {
            for (name, value) in self.signer.auth_headers(method, &path)? {
                request = request.header(name, value);
            }
        }

        debug!(%url, %method, requires_auth, "kalshi request");

        let response = request
            .send()
            .await
            .map_err(|e| KalshiError::Network(format!("request to {path} failed: {e}")))?;

        if response.status().as_u16() == 404 {
            return Err(KalshiError::NotFound(path));
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(KalshiError::Api { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| KalshiError::Parse(format!("failed to parse {path} response: {e}")))
    }
}

impl std::fmt::Debug for KalshiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KalshiClient")
            .field("elections_host", &self.elections_host)
            .field("trading_host", &self.trading_host)
            .finish()
    }
}
