//! Cache-first weather queries over the record store.
//!
//! Every day of a range is looked up locally first. On a miss the provider
//! gateway is asked to ingest that day, and the store is queried once more.
//! Days that still have no record are left out of the result.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    cache::TemporalCache,
    model::{CodeId, DailyOccurrence, HourlyOccurrence, Location, RecordKind},
    nearest::nearest,
    provider::ProviderGateway,
    view::{
        CodeView, DailyWeatherView, DayView, DayWithTimes, HourView, LocationView, MediaPaths,
        RangeView,
    },
};

pub struct WeatherService<C, G> {
    cache: Arc<C>,
    gateway: G,
    media: MediaPaths,
}

impl<C, G> WeatherService<C, G>
where
    C: TemporalCache,
    G: ProviderGateway,
{
    pub fn new(cache: Arc<C>, gateway: G, media: MediaPaths) -> Self {
        Self { cache, gateway, media }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Daily records for `num_days` consecutive dates from `start`, in date order.
    ///
    /// Dates before `now`'s day are read as observed data, the rest as forecasts.
    /// Provider failures are logged and the date is skipped.
    pub async fn get_range(
        &self,
        location: &Location,
        start: NaiveDate,
        num_days: u32,
        now: DateTime<Utc>,
    ) -> Vec<DailyOccurrence> {
        let mut results = Vec::new();

        for date in consecutive_dates(start, num_days) {
            let kind = RecordKind::from_observed(self.gateway.is_past_date(date, now));

            if let Some(daily) = self.cache.find_daily(location.id, date, kind) {
                debug!(location = %location.name, %date, %kind, "cache hit");
                results.push(daily);
                continue;
            }

            debug!(location = %location.name, %date, %kind, "cache miss, ingesting");
            if let Err(e) = self.gateway.ingest(location, date, now).await {
                warn!(location = %location.name, %date, error = %e, "ingestion failed");
            }

            match self.cache.find_daily(location.id, date, kind) {
                Some(daily) => results.push(daily),
                None => {
                    debug!(location = %location.name, %date, "no data after ingestion, skipping")
                }
            }
        }

        results
    }

    pub fn build_day_view(&self, daily: &DailyOccurrence) -> DayView {
        DayView {
            id: daily.id,
            date: daily.date,
            location: self.location_view(daily),
            min_temperature: daily.min_temperature,
            max_temperature: daily.max_temperature,
            code: self.code_view(daily.code),
        }
    }

    pub fn build_hour_view(&self, hourly: &HourlyOccurrence) -> HourView {
        HourView {
            id: hourly.id,
            daily_occurrence: hourly.daily,
            time: hourly.time,
            temperature: hourly.temperature,
            code: self.code_view(hourly.code),
        }
    }

    /// The range plus, for every day, the sample nearest to each requested time.
    pub async fn build_range_with_times_view(
        &self,
        location: &Location,
        start: NaiveDate,
        num_days: u32,
        hours: &[NaiveTime],
        now: DateTime<Utc>,
    ) -> RangeView {
        let dailies = self.get_range(location, start, num_days, now).await;

        let location = dailies.first().and_then(|daily| self.location_view(daily));

        let days = dailies
            .iter()
            .map(|daily| {
                let samples = self.cache.find_hourlies_by_daily(daily.id);
                let times = hours
                    .iter()
                    .map(|hour| nearest(&samples, *hour).map(|sample| self.build_hour_view(sample)))
                    .collect();

                DayWithTimes {
                    day: self.build_day_view(daily),
                    times,
                }
            })
            .collect();

        RangeView { location, days }
    }

    /// One day with every recorded sample, ascending by time.
    pub fn build_daily_weather_view(&self, daily: &DailyOccurrence) -> DailyWeatherView {
        let hours = self
            .cache
            .find_hourlies_by_daily(daily.id)
            .iter()
            .map(|hourly| self.build_hour_view(hourly))
            .collect();

        DailyWeatherView {
            day: self.build_day_view(daily),
            hours,
        }
    }

    fn location_view(&self, daily: &DailyOccurrence) -> Option<LocationView> {
        self.cache.location(daily.location).as_ref().map(LocationView::from)
    }

    fn code_view(&self, code: Option<CodeId>) -> Option<CodeView> {
        match self.cache.resolve_code(code) {
            Ok(resolved) => resolved.map(|code| CodeView::new(&code, &self.media)),
            Err(e) => {
                warn!(error = %e, "could not resolve weather code");
                None
            }
        }
    }
}

fn consecutive_dates(start: NaiveDate, num_days: u32) -> impl Iterator<Item = NaiveDate> {
    (0..u64::from(num_days)).map_while(move |offset| start.checked_add_days(Days::new(offset)))
}
