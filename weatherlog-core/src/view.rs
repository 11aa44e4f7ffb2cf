//! Presentation projections handed to renderers.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::model::{Code, CodeId, DailyId, HourlyId, Location, LocationId};

/// Rewrites stored icon references from the logical media URL to a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPaths {
    media_path: String,
    media_url: String,
}

impl MediaPaths {
    pub fn new(media_path: impl Into<String>, media_url: impl Into<String>) -> Self {
        Self {
            media_path: media_path.into(),
            media_url: media_url.into(),
        }
    }

    pub fn rewrite_icon(&self, icon_url: &str) -> String {
        let from = format!("{}/", self.media_url);
        let to = format!("{}{}", self.media_path, std::path::MAIN_SEPARATOR);
        icon_url.replace(&from, &to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeView {
    pub id: CodeId,
    pub code: i32,
    pub description: String,
    #[serde(rename = "iconURL")]
    pub icon_url: String,
}

impl CodeView {
    pub fn new(code: &Code, media: &MediaPaths) -> Self {
        Self {
            id: code.id,
            code: code.value,
            description: code.description.clone(),
            icon_url: media.rewrite_icon(&code.icon_url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationView {
    pub id: LocationId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&Location> for LocationView {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id,
            name: location.name.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
        }
    }
}

/// `code` is `None` when the record has no code or its chain could not be resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub id: DailyId,
    pub date: NaiveDate,
    pub location: Option<LocationView>,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub code: Option<CodeView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourView {
    pub id: HourlyId,
    pub daily_occurrence: DailyId,
    pub time: NaiveTime,
    pub temperature: f64,
    pub code: Option<CodeView>,
}

/// A day with one entry per requested time, in request order.
///
/// An entry is `None` when the day has no hourly samples at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayWithTimes {
    #[serde(flatten)]
    pub day: DayView,
    pub times: Vec<Option<HourView>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeView {
    pub location: Option<LocationView>,
    pub days: Vec<DayWithTimes>,
}

/// A day together with all of its hourly samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyWeatherView {
    #[serde(flatten)]
    pub day: DayView,
    pub hours: Vec<HourView>,
}
