//! Market data structures and derived metrics

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Read-only projection of a Kalshi market at fetch time
///
/// Prices (`yes_bid`, `yes_ask`, `no_bid`, `no_ask`, `last_price`) are in
/// cents, as returned by the API. `last_price` doubles as the implied
/// probability: it is already expressed on the 0-100 scale and is never
/// re-scaled anywhere in this codebase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Unique market ticker
    pub ticker: String,
    /// Market title
    pub title: String,
    /// Category inherited from the parent event (if fetched via an event)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Primary resolution rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,
    /// Best YES bid (cents)
    pub yes_bid: Decimal,
    /// Best YES ask (cents)
    pub yes_ask: Decimal,
    /// Best NO bid (cents)
    pub no_bid: Decimal,
    /// Best NO ask (cents)
    pub no_ask: Decimal,
    /// Last traded price (cents, equivalently implied probability in percent)
    pub last_price: Decimal,
    /// Total contracts traded
    pub volume: i64,
    /// Market status (open, closed, settled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl MarketSnapshot {
    /// Volume-weighted liquidity: `yes_bid * volume + no_bid * volume`
    pub fn liquidity(&self) -> Decimal {
        (self.yes_bid + self.no_bid) * Decimal::from(self.volume)
    }

    /// Notional market value, assuming $1 per contract: `volume * 1`
    pub fn market_value(&self) -> Decimal {
        Decimal::from(self.volume)
    }

    /// Implied probability on the 0-100 scale
    ///
    /// `last_price` already carries this scale, so the accessor is a plain
    /// projection. Do not multiply by 100.
    pub fn implied_probability(&self) -> Decimal {
        self.last_price
    }

    /// Current YES ask converted from cents to dollars
    pub fn yes_ask_dollars(&self) -> Decimal {
        self.yes_ask / Decimal::from(100)
    }
}

/// Aggregate liquidity over an event's markets
pub fn event_liquidity(markets: &[MarketSnapshot]) -> Decimal {
    markets.iter().map(|m| m.liquidity()).sum()
}
