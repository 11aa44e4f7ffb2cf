use chrono::{NaiveDate, NaiveTime};
use std::path::PathBuf;

use crate::model::{CodeId, DailyId, LocationId, RecordKind};

/// Failure while following `associated_code` links.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeChainError {
    #[error("Code chain starting at {start} loops or exceeds {hops} hops")]
    CycleDetected { start: CodeId, hops: usize },
    #[error("Code {0} is referenced but does not exist")]
    UnknownCode(CodeId),
}

/// Failure reported by an external provider gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Weather provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("Weather provider has no data for {date}")]
    ProviderDataMissing { date: NaiveDate },
    #[error("Failed to persist provider data: {0}")]
    Store(#[from] StoreError),
}

/// Write-path and persistence failures of the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("A {kind} record already exists for location {location} on {date}")]
    DuplicateDaily {
        location: LocationId,
        date: NaiveDate,
        kind: RecordKind,
    },
    #[error("Daily record {daily} already has a sample at {time}")]
    DuplicateHourly { daily: DailyId, time: NaiveTime },
    #[error("Daily record {0} does not exist")]
    UnknownDaily(DailyId),
    #[error("Location {0} does not exist")]
    UnknownLocation(LocationId),
    #[error("Code {0} does not exist")]
    UnknownCode(CodeId),
    #[error("Linking code {from} to {to} would create a cycle")]
    CodeCycle { from: CodeId, to: CodeId },
    #[error("Failed to access store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode store file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
