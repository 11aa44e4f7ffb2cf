use chrono::NaiveTime;

use crate::model::HourlyOccurrence;

/// Picks the sample closest to `target` from samples sorted ascending by time.
///
/// When `target` falls between two samples the closer one wins, the earlier one
/// on a tie. Anything not bracketed by a pair, including a target earlier than
/// every sample, yields the last sample.
pub fn nearest(samples: &[HourlyOccurrence], target: NaiveTime) -> Option<&HourlyOccurrence> {
    let last = samples.last()?;

    let bracket = samples
        .windows(2)
        .find(|pair| pair[0].time <= target && target < pair[1].time);

    let Some([lower, upper]) = bracket else {
        return Some(last);
    };

    let below = target.signed_duration_since(lower.time);
    let above = upper.time.signed_duration_since(target);

    Some(if below <= above { lower } else { upper })
}
