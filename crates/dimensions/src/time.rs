//! Time dimension: weekly trading periods.
//!
//! Periods are Saturday-ending weeks numbered sequentially from the start
//! of the series: 52 per series year, keys in `YYWW` form. Sequential
//! numbering (rather than ISO weeks) keeps keys contiguous across year
//! boundaries, which is what downstream joins rely on.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{DimensionError, Result};
use crate::types::{SeasonalPeriod, TimeKey};

pub const WEEKS_PER_YEAR: u32 = 52;

/// One weekly trading period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePeriod {
    /// 0-based position in the series.
    pub index: usize,
    pub time_key: TimeKey,
    /// 1..=52 within the series year.
    pub week_of_year: u32,
    pub week_ending: NaiveDate,
    /// Display form, e.g. `1 w/e 07 Jan, 2022`.
    pub description: String,
    pub seasonal_period: SeasonalPeriod,
    /// UK fiscal year label (April to March), e.g. `FY22/23`.
    pub fiscal_year: String,
}

/// Built time dimension.
#[derive(Debug, Clone)]
pub struct TimeDim {
    periods: Vec<TimePeriod>,
}

impl TimeDim {
    /// Build `weeks` Saturday-ending periods starting at the first
    /// Saturday on or after `start`.
    pub fn build(start: NaiveDate, weeks: usize) -> Result<Self> {
        if weeks == 0 {
            return Err(DimensionError::InvalidCalendar {
                reason: "week count must be > 0".to_string(),
            });
        }

        let offset = days_until(start.weekday(), Weekday::Sat);
        let first_ending = start
            .checked_add_days(Days::new(offset))
            .ok_or_else(|| DimensionError::InvalidCalendar {
                reason: format!("start date {start} out of range"),
            })?;

        let base_year = first_ending.year();
        let mut periods = Vec::with_capacity(weeks);
        for i in 0..weeks {
            let week_ending = first_ending
                .checked_add_days(Days::new(7 * i as u64))
                .ok_or_else(|| DimensionError::InvalidCalendar {
                    reason: format!("period {i} overflows the calendar"),
                })?;
            let series_year = base_year + (i as u32 / WEEKS_PER_YEAR) as i32;
            let week_of_year = (i as u32 % WEEKS_PER_YEAR) + 1;

            periods.push(TimePeriod {
                index: i,
                time_key: TimeKey::new(series_year, week_of_year),
                week_of_year,
                week_ending,
                description: format!("1 w/e {}", week_ending.format("%d %b, %Y")),
                seasonal_period: SeasonalPeriod::from_week(week_of_year),
                fiscal_year: fiscal_year_label(week_ending),
            });
        }

        Ok(TimeDim { periods })
    }

    pub fn periods(&self) -> &[TimePeriod] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn period(&self, index: usize) -> &TimePeriod {
        &self.periods[index]
    }

    pub fn by_key(&self, key: TimeKey) -> Result<&TimePeriod> {
        self.periods
            .iter()
            .find(|p| p.time_key == key)
            .ok_or_else(|| DimensionError::UnknownKey {
                key: key.to_string(),
            })
    }
}

fn days_until(from: Weekday, to: Weekday) -> u64 {
    let f = from.num_days_from_monday() as i64;
    let t = to.num_days_from_monday() as i64;
    (t - f).rem_euclid(7) as u64
}

fn fiscal_year_label(date: NaiveDate) -> String {
    let start_year = if date.month() >= 4 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("FY{}/{}", start_year % 100, (start_year + 1) % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
    }

    #[test]
    fn test_three_years_of_sequential_keys() {
        let time = TimeDim::build(start(), 156).unwrap();
        assert_eq!(time.len(), 156);
        assert_eq!(time.period(0).time_key, TimeKey(2201));
        assert_eq!(time.period(51).time_key, TimeKey(2252));
        assert_eq!(time.period(52).time_key, TimeKey(2301));
        assert_eq!(time.period(155).time_key, TimeKey(2452));

        // Keys are strictly increasing and wrap at week 52.
        for pair in time.periods().windows(2) {
            assert!(pair[1].time_key > pair[0].time_key);
        }
    }

    #[test]
    fn test_week_ending_is_saturday() {
        let time = TimeDim::build(start(), 10).unwrap();
        for p in time.periods() {
            assert_eq!(p.week_ending.weekday(), Weekday::Sat);
        }
        // 2022-01-01 is itself a Saturday.
        assert_eq!(time.period(0).week_ending, start());
    }

    #[test]
    fn test_description_format() {
        let time = TimeDim::build(start(), 2).unwrap();
        assert_eq!(time.period(0).description, "1 w/e 01 Jan, 2022");
        assert_eq!(time.period(1).description, "1 w/e 08 Jan, 2022");
    }

    #[test]
    fn test_seasonal_tags() {
        let time = TimeDim::build(start(), 156).unwrap();
        assert_eq!(time.period(0).seasonal_period, SeasonalPeriod::Christmas);
        let easter_week = time.periods().iter().find(|p| p.week_of_year == 14).unwrap();
        assert_eq!(easter_week.seasonal_period, SeasonalPeriod::Easter);
    }

    #[test]
    fn test_fiscal_year_boundary() {
        let march = NaiveDate::from_ymd_opt(2022, 3, 15).unwrap();
        assert_eq!(fiscal_year_label(march), "FY21/22");
        let april = NaiveDate::from_ymd_opt(2022, 4, 15).unwrap();
        assert_eq!(fiscal_year_label(april), "FY22/23");
    }

    #[test]
    fn test_zero_weeks_rejected() {
        assert!(TimeDim::build(start(), 0).is_err());
    }
}
