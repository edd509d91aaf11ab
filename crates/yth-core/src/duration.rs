//! Compact ISO-8601 duration handling (`PT1H5M30S`).
//!
//! Parsing is total: anything that cannot be read as a component counts as
//! zero. Seconds are included in the total.

use serde::Serialize;

const SECONDS_PER_DAY: u64 = 86_400;
const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_MINUTE: u64 = 60;

/// Total seconds encoded by a `P[nD]T[nH][nM][nS]` string.
pub fn to_seconds(encoded: &str) -> u64 {
    let Some(body) = encoded.trim().strip_prefix('P') else {
        return 0;
    };

    let mut total = 0u64;
    let mut in_time = false;
    let mut digits: Option<u64> = None;
    let mut in_fraction = false;

    for ch in body.chars() {
        if let Some(d) = ch.to_digit(10) {
            if !in_fraction {
                digits = Some(
                    digits
                        .unwrap_or(0)
                        .saturating_mul(10)
                        .saturating_add(u64::from(d)),
                );
            }
            continue;
        }

        let unit = match (in_time, ch) {
            (_, 'T') => {
                in_time = true;
                None
            }
            (false, 'D') => Some(SECONDS_PER_DAY),
            (true, 'H') => Some(SECONDS_PER_HOUR),
            (true, 'M') => Some(SECONDS_PER_MINUTE),
            (true, 'S') => Some(1),
            (_, '.') | (_, ',') => {
                in_fraction = true;
                continue;
            }
            // years, months, weeks and junk contribute nothing
            _ => Some(0),
        };

        if let (Some(unit), Some(value)) = (unit, digits) {
            total = total.saturating_add(value.saturating_mul(unit));
        }
        digits = None;
        in_fraction = false;
    }

    total
}

/// Inverse of [`to_seconds`] for display: always `PT{h}H{m}M{s}S`.
pub fn format_compact(total_seconds: u64) -> String {
    let hours = total_seconds / SECONDS_PER_HOUR;
    let minutes = (total_seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let seconds = total_seconds % SECONDS_PER_MINUTE;
    format!("PT{hours}H{minutes}M{seconds}S")
}

/// Running total of durations for one channel's videos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DurationTally {
    pub videos: u64,
    pub total_seconds: u64,
}

impl DurationTally {
    /// Videos with no duration (or an empty one) are not counted.
    pub fn add(&mut self, encoded: Option<&str>) {
        let Some(encoded) = encoded.filter(|d| !d.trim().is_empty()) else {
            return;
        };
        self.videos += 1;
        self.total_seconds = self.total_seconds.saturating_add(to_seconds(encoded));
    }

    pub fn average_seconds(&self) -> u64 {
        if self.videos == 0 {
            0
        } else {
            self.total_seconds / self.videos
        }
    }

    pub fn average_compact(&self) -> String {
        format_compact(self.average_seconds())
    }
}

impl<'a> FromIterator<Option<&'a str>> for DurationTally {
    fn from_iter<I: IntoIterator<Item = Option<&'a str>>>(iter: I) -> Self {
        let mut tally = DurationTally::default();
        for encoded in iter {
            tally.add(encoded);
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_and_minutes() {
        assert_eq!(to_seconds("PT1H5M"), 3900);
        assert_eq!(to_seconds("PT1H0M"), 3600);
        assert_eq!(to_seconds("PT0H30M"), 1800);
    }

    #[test]
    fn missing_components_degrade_to_zero() {
        assert_eq!(to_seconds("PT0M"), 0);
        assert_eq!(to_seconds("PT"), 0);
        assert_eq!(to_seconds("P"), 0);
        assert_eq!(to_seconds(""), 0);
        assert_eq!(to_seconds("garbage"), 0);
        assert_eq!(to_seconds("PTH5M"), 300);
        assert_eq!(to_seconds("PTxH5M"), 300);
    }

    #[test]
    fn seconds_and_days_are_counted() {
        assert_eq!(to_seconds("PT5M30S"), 330);
        assert_eq!(to_seconds("PT45S"), 45);
        assert_eq!(to_seconds("P1DT1S"), 86_401);
        assert_eq!(to_seconds("PT1.75S"), 1);
    }

    #[test]
    fn overflow_saturates() {
        assert_eq!(to_seconds("PT99999999999999999999999H"), u64::MAX);
    }

    #[test]
    fn compact_format_is_zero_padded_by_component() {
        assert_eq!(format_compact(0), "PT0H0M0S");
        assert_eq!(format_compact(2700), "PT0H45M0S");
        assert_eq!(format_compact(3_725), "PT1H2M5S");
    }

    #[test]
    fn average_of_one_hour_and_half_hour() {
        let tally: DurationTally = [Some("PT1H0M"), Some("PT0H30M")].into_iter().collect();
        assert_eq!(tally.videos, 2);
        assert_eq!(tally.total_seconds, 5400);
        assert_eq!(tally.average_seconds(), 2700);
        assert_eq!(tally.average_compact(), "PT0H45M0S");
    }

    #[test]
    fn average_skips_videos_without_duration() {
        let tally: DurationTally = [Some("PT10M"), None, Some(""), Some("PT20M")]
            .into_iter()
            .collect();
        assert_eq!(tally.videos, 2);
        assert_eq!(tally.average_seconds(), 900);
    }

    #[test]
    fn empty_tally_averages_to_zero() {
        let tally = DurationTally::default();
        assert_eq!(tally.average_seconds(), 0);
        assert_eq!(tally.average_compact(), "PT0H0M0S");
    }
}
