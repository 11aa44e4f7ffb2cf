//! Core library for the `weatherlog` CLI.
//!
//! This crate defines:
//! - A local temporal record of daily and hourly weather per location
//! - Cache-first range queries that ingest from a provider on a miss
//! - Weather code chain resolution and nearest-sample lookup
//! - Presentation views and configuration handling
//!
//! It is used by `weatherlog-cli`, but can also be reused by other binaries or services.

pub mod cache;
pub mod code_chain;
pub mod config;
pub mod error;
pub mod geocode;
pub mod model;
pub mod nearest;
pub mod provider;
pub mod service;
pub mod view;

pub use cache::{RecordStore, RecordWriter, TemporalCache};
pub use code_chain::{CodeBook, MAX_CHAIN_HOPS};
pub use config::Config;
pub use error::{CodeChainError, GatewayError, StoreError};
pub use geocode::{Geocoder, Place};
pub use model::{
    Code, CodeId, DailyId, DailyOccurrence, HourlyId, HourlyOccurrence, Location, LocationId,
    RecordKind,
};
pub use nearest::nearest;
pub use provider::{
    ProviderGateway, gateway_from_config, is_past_date, open_meteo::OpenMeteoGateway,
};
pub use service::WeatherService;
pub use view::{DailyWeatherView, DayView, DayWithTimes, HourView, MediaPaths, RangeView};
