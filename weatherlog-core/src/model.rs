use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

record_id!(LocationId, u32);
record_id!(CodeId, u32);
record_id!(DailyId, u64);
record_id!(HourlyId, u64);

/// A named place weather is recorded for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Whether a daily record was predicted or measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Forecast,
    Observed,
}

impl RecordKind {
    pub fn from_observed(observed: bool) -> Self {
        if observed { RecordKind::Observed } else { RecordKind::Forecast }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Forecast => "forecast",
            RecordKind::Observed => "observed",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weather condition code. `associated_code` points at a code that supersedes this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    pub id: CodeId,
    pub value: i32,
    pub description: String,
    pub icon_url: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub associated_code: Option<CodeId>,
}

/// One record for a (location, date, kind) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyOccurrence {
    pub id: DailyId,
    pub location: LocationId,
    pub date: NaiveDate,
    pub kind: RecordKind,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub code: Option<CodeId>,
}

/// A sample inside a day. Times are unique per owning daily record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyOccurrence {
    pub id: HourlyId,
    pub daily: DailyId,
    pub time: NaiveTime,
    pub temperature: f64,
    pub code: Option<CodeId>,
}

/// Daily values handed to the store by a gateway, before an id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDaily {
    pub location: LocationId,
    pub date: NaiveDate,
    pub kind: RecordKind,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub code: Option<CodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHourly {
    pub time: NaiveTime,
    pub temperature: f64,
    pub code: Option<CodeId>,
}
