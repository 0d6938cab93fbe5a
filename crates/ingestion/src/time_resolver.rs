//! Time axis resolution.
//!
//! Endpoints report time differently: weekly prices carry an explicit
//! `beginDate`, monthly series carry `year` + `month`, some weekly series only
//! `year` + `week`. Rules are tried in a fixed order and the first success wins:
//!
//! 1. explicit date field, parsed with the configured day/month/year format
//! 2. year + ISO week -> Monday of that week
//! 3. year + month -> first day of that month
//!
//! A record matching no rule keeps an empty time point.

use agrimarket_core::config::{FieldConfig, TimeConfig};
use agrimarket_core::{FieldValue, RawRecord, TimePoint, TimeSource};
use chrono::{NaiveDate, Weekday};
use tracing::debug;

/// Per-record time point resolver.
#[derive(Debug, Clone)]
pub struct TimeResolver {
    date_field: String,
    year_field: String,
    week_field: String,
    month_field: String,
    date_format: String,
}

impl TimeResolver {
    /// Create a resolver from configuration.
    pub fn new(fields: &FieldConfig, time: &TimeConfig) -> Self {
        Self {
            date_field: fields.date.clone(),
            year_field: fields.year.clone(),
            week_field: fields.week.clone(),
            month_field: fields.month.clone(),
            date_format: time.date_format.clone(),
        }
    }

    /// Resolve the record's time point, if any rule applies.
    pub fn resolve(&self, raw: &RawRecord) -> Option<TimePoint> {
        if let Some((name, value)) = self.date_field_of(raw) {
            match self.parse_date(value) {
                Some(date) => return Some(TimePoint::new(date, TimeSource::ExplicitDate)),
                None => debug!(field = name, "date did not parse, trying year fields"),
            }
        }

        let year = raw.get(&self.year_field).and_then(FieldValue::as_integer)?;
        let year = i32::try_from(year).ok()?;

        if let Some(week) = raw.get(&self.week_field).and_then(FieldValue::as_integer) {
            let date = u32::try_from(week)
                .ok()
                .and_then(|w| NaiveDate::from_isoywd_opt(year, w, Weekday::Mon));
            match date {
                Some(date) => return Some(TimePoint::new(date, TimeSource::IsoWeek)),
                None => debug!(year, week, "invalid ISO week, trying month"),
            }
        }

        let month = raw.get(&self.month_field).and_then(FieldValue::as_integer)?;
        let month = u32::try_from(month).ok()?;
        NaiveDate::from_ymd_opt(year, month, 1).map(|date| TimePoint::new(date, TimeSource::Month))
    }

    /// The explicit date field: the configured one, else any "*date*" field.
    pub fn date_field_of<'a>(&self, raw: &'a RawRecord) -> Option<(&'a str, &'a FieldValue)> {
        raw.find_field(&self.date_field, "date")
    }

    /// The raw values of every time source field, in rule order.
    ///
    /// Used to tell unresolved records of different periods apart.
    pub fn raw_time_fields<'a>(&self, raw: &'a RawRecord) -> [Option<&'a FieldValue>; 4] {
        [
            self.date_field_of(raw).map(|(_, value)| value),
            raw.get(&self.year_field),
            raw.get(&self.week_field),
            raw.get(&self.month_field),
        ]
    }

    fn parse_date(&self, value: &FieldValue) -> Option<NaiveDate> {
        match value {
            FieldValue::Text(text) => {
                NaiveDate::parse_from_str(text.trim(), &self.date_format).ok()
            }
            _ => None,
        }
    }
}

impl Default for TimeResolver {
    fn default() -> Self {
        Self::new(&FieldConfig::default(), &TimeConfig::default())
    }
}
