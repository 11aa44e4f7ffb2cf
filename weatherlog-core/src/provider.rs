use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use crate::{
    Config,
    cache::{RecordWriter, TemporalCache},
    error::GatewayError,
    model::Location,
    provider::open_meteo::OpenMeteoGateway,
};

pub mod open_meteo;

/// Remote source that fills the record store on a cache miss.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Fetches weather for `location` on `date` and persists it.
    ///
    /// `now` decides whether the date is stored as observed or forecast data.
    async fn ingest(
        &self,
        location: &Location,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), GatewayError>;

    fn is_past_date(&self, date: NaiveDate, now: DateTime<Utc>) -> bool {
        is_past_date(date, now)
    }
}

/// A date is past once its whole day lies before `now` (UTC calendar day).
pub fn is_past_date(date: NaiveDate, now: DateTime<Utc>) -> bool {
    date < now.date_naive()
}

/// Construct the HTTP gateway from the configured endpoints, writing into `store`.
pub fn gateway_from_config<S>(config: &Config, store: Arc<S>) -> anyhow::Result<OpenMeteoGateway<S>>
where
    S: TemporalCache + RecordWriter,
{
    OpenMeteoGateway::new(
        config.forecast_url.clone(),
        config.past_url.clone(),
        config.media_url.clone(),
        store,
    )
}
