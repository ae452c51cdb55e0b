//! Calendar task records.
//!
//! A [`TaskRecord`] describes one task to be authored into the vault: a
//! title, a date span, and an optional time span. Records are built through
//! [`TaskRecord::builder`] and are not changed afterwards, except for the
//! title suffix the author attaches when disambiguating filenames.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::error::{Error, Result};

/// Stored string form of task dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Stored string form of task times
pub const TIME_FORMAT: &str = "%H:%M";

/// Start and end time of a timed task.
///
/// `end` earlier than `start` means the task runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSpan {
    #[serde(serialize_with = "serialize_time")]
    pub start: NaiveTime,
    #[serde(serialize_with = "serialize_time")]
    pub end: NaiveTime,
}

impl TimeSpan {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    title: String,
    #[serde(serialize_with = "serialize_date")]
    start_date: NaiveDate,
    #[serde(
        serialize_with = "serialize_opt_date",
        skip_serializing_if = "Option::is_none"
    )]
    end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    times: Option<TimeSpan>,
}

impl TaskRecord {
    /// Start building a record with the required fields.
    pub fn builder(title: impl Into<String>, start_date: NaiveDate) -> TaskRecordBuilder {
        TaskRecordBuilder {
            title: title.into(),
            start_date,
            end_date: None,
            times: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn times(&self) -> Option<TimeSpan> {
        self.times
    }

    pub fn start_time(&self) -> Option<NaiveTime> {
        self.times.map(|span| span.start)
    }

    pub fn end_time(&self) -> Option<NaiveTime> {
        self.times.map(|span| span.end)
    }

    /// The stored string form of the start date, used in filenames.
    pub fn date_key(&self) -> String {
        self.start_date.format(DATE_FORMAT).to_string()
    }

    pub fn is_all_day(&self) -> bool {
        self.times.is_none()
    }

    pub fn is_multi_day(&self) -> bool {
        self.effective_end_date()
            .map(|end| end > self.start_date)
            .unwrap_or(false)
    }

    pub fn crosses_midnight(&self) -> bool {
        self.times.map(|span| span.crosses_midnight()).unwrap_or(false)
    }

    /// Last day the task touches.
    ///
    /// A timed task that crosses midnight without an explicit end date ends
    /// on the following day.
    pub fn effective_end_date(&self) -> Option<NaiveDate> {
        match self.end_date {
            Some(end) => Some(end),
            None if self.crosses_midnight() => self.start_date.succ_opt(),
            None => None,
        }
    }

    /// Copy of this record carrying a different title.
    pub(crate) fn with_title(&self, title: String) -> Self {
        Self {
            title,
            ..self.clone()
        }
    }
}

/// Builder for [`TaskRecord`]
#[derive(Debug, Clone)]
pub struct TaskRecordBuilder {
    title: String,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    times: Option<TimeSpan>,
}

impl TaskRecordBuilder {
    pub fn end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn times(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.times = Some(TimeSpan::new(start, end));
        self
    }

    pub fn build(self) -> Result<TaskRecord> {
        if self.title.trim().is_empty() {
            return Err(Error::invalid_title(&self.title, "title cannot be empty"));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(Error::InvalidArgument(format!(
                    "end date {} is before start date {}",
                    end.format(DATE_FORMAT),
                    self.start_date.format(DATE_FORMAT)
                )));
            }
        }
        Ok(TaskRecord {
            title: self.title,
            start_date: self.start_date,
            end_date: self.end_date,
            times: self.times,
        })
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|err| Error::InvalidArgument(format!("invalid date '{raw}': {err}")))
}

/// Parse a `HH:MM` time.
pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT)
        .map_err(|err| Error::InvalidArgument(format!("invalid time '{raw}': {err}")))
}

fn serialize_date<S: serde::Serializer>(date: &NaiveDate, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(&date.format(DATE_FORMAT))
}

fn serialize_opt_date<S: serde::Serializer>(
    date: &Option<NaiveDate>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match date {
        Some(date) => serialize_date(date, s),
        None => s.serialize_none(),
    }
}

fn serialize_time<S: serde::Serializer>(time: &NaiveTime, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(&time.format(TIME_FORMAT))
}
