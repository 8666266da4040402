//! Kalshi integration for the Margin Scanner
//!
//! This crate provides the RSA-PSS request signer required by Kalshi's
//! trading API and a thin, deterministic REST client over the events and
//! trading hosts.

pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::RequestSigner;
pub use client::{EventsPage, KalshiClient};
pub use error::KalshiError;
pub use types::{Event, EventDetail, RawMarket};
