//! Kalshi API response schemas
//!
//! Responses are deserialized into explicit structs at the API boundary; a
//! payload that does not carry the expected fields is a parse error rather
//! than a silently-defaulted value.

use rust_decimal::Decimal;
use serde::Deserialize;

use margin_core::MarketSnapshot;

/// Paged events response
#[derive(Debug, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    /// Opaque pagination token; empty means no further pages
    pub cursor: Option<String>,
}

/// An event as returned by `/events`
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub event_ticker: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub series_ticker: Option<String>,
    /// Present when `with_nested_markets=true`
    #[serde(default)]
    pub markets: Option<Vec<RawMarket>>,
}

/// Wrapper for `/events/{ticker}`
#[derive(Debug, Deserialize)]
pub struct EventDetailResponse {
    pub event: EventDetail,
}

/// Detailed event including its nested markets
#[derive(Debug, Clone, Deserialize)]
pub struct EventDetail {
    pub event_ticker: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub markets: Vec<RawMarket>,
}

/// Paged markets response
#[derive(Debug, Deserialize)]
pub struct MarketsResponse {
    pub markets: Vec<RawMarket>,
    pub cursor: Option<String>,
}

/// A market as returned by the API, prices in cents
#[derive(Debug, Clone, Deserialize)]
pub struct RawMarket {
    pub ticker: String,
    pub title: String,
    #[serde(default)]
    pub rules_primary: Option<String>,
    pub yes_bid: Decimal,
    pub yes_ask: Decimal,
    pub no_bid: Decimal,
    pub no_ask: Decimal,
    pub last_price: Decimal,
    pub volume: i64,
    #[serde(default)]
    pub status: Option<String>,
}

impl RawMarket {
    /// Convert to the domain snapshot, attaching the parent event's category
    /// when the market arrived nested under an event.
    pub fn to_snapshot(&self, category: Option<&str>) -> MarketSnapshot {
        MarketSnapshot {
            ticker: self.ticker.clone(),
            title: self.title.clone(),
            category: category.map(str::to_string),
            rules: self.rules_primary.clone(),
            yes_bid: self.yes_bid,
            yes_ask: self.yes_ask,
            no_bid: self.no_bid,
            no_ask: self.no_ask,
            last_price: self.last_price,
            volume: self.volume,
            status: self.status.clone(),
        }
    }
}

impl EventDetail {
    /// Snapshots of the nested markets, in the order the venue returned them
    pub fn market_snapshots(&self) -> Vec<MarketSnapshot> {
        self.markets
            .iter()
            .map(|m| m.to_snapshot(self.category.as_deref()))
            .collect()
    }
}

impl Event {
    /// Snapshots of the nested markets, empty when markets were not requested
    pub fn market_snapshots(&self) -> Vec<MarketSnapshot> {
        self.markets
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|m| m.to_snapshot(self.category.as_deref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use margin_core::event_liquidity;

    const EVENT_DETAIL_JSON: &str = r#"{
        "event": {
            "event_ticker": "FED-24DEC",
            "title": "Fed decision in December",
            "category": "Economics",
            "markets": [
                {
                    "ticker": "FED-24DEC-C25",
                    "title": "Cut of 25bps",
                    "rules_primary": "Resolves YES if the Fed cuts by 25bps.",
                    "yes_bid": 45,
                    "yes_ask": 47,
                    "no_bid": 53,
                    "no_ask": 55,
                    "last_price": 46,
                    "volume": 100,
                    "status": "open"
                },
                {
                    "ticker": "FED-24DEC-C50",
                    "title": "Cut of 50bps",
                    "yes_bid": 5,
                    "yes_ask": 7,
                    "no_bid": 93,
                    "no_ask": 95,
                    "last_price": 6,
                    "volume": 0,
                    "status": "open"
                }
            ]
        }
    }"#;

    #[test]
    fn event_detail_parses_and_projects_snapshots() {
        let response: EventDetailResponse = serde_json::from_str(EVENT_DETAIL_JSON).unwrap();
        let snapshots = response.event.market_snapshots();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].ticker, "FED-24DEC-C25");
        assert_eq!(snapshots[0].category.as_deref(), Some("Economics"));
        assert_eq!(snapshots[1].rules, None);
    }

    #[test]
    fn liquidity_from_fetched_event() {
        let response: EventDetailResponse = serde_json::from_str(EVENT_DETAIL_JSON).unwrap();
        let snapshots = response.event.market_snapshots();

        // Zero-volume market contributes nothing; the other contributes
        // yes_bid*volume + no_bid*volume = 45*100 + 53*100.
        assert_eq!(snapshots[1].liquidity(), Decimal::ZERO);
        assert_eq!(snapshots[0].liquidity(), Decimal::from(9800));
        assert_eq!(event_liquidity(&snapshots), Decimal::from(9800));
    }

    #[test]
    fn market_missing_required_price_is_a_parse_error() {
        let json = r#"{"ticker": "X", "title": "x", "volume": 1}"#;
        assert!(serde_json::from_str::<RawMarket>(json).is_err());
    }
}
