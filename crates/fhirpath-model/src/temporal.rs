//! Partial-precision Date, Time and DateTime values
//!
//! FHIRPath temporals may be specified at any of several precisions (year;
//! year-month; year-month-day; plus optional time and timezone). Equality
//! and ordering between two temporals are only defined when both carry at
//! least the lesser of the two precisions; comparing at a precision neither
//! side specifies yields empty rather than a guess.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};

use crate::error::{ModelError, Result};

/// The precision a partial date/time literal was specified at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatePrecision {
    /// `@2024`
    Year,
    /// `@2024-03`
    Month,
    /// `@2024-03-15`
    Day,
}

/// The precision a partial time literal was specified at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimePrecision {
    /// `@T10`
    Hour,
    /// `@T10:30`
    Minute,
    /// `@T10:30:00`
    Second,
    /// `@T10:30:00.000`
    Millisecond,
}

/// A partial-precision date, with no time component.
#[derive(Debug, Clone, Copy)]
pub struct PartialDate {
    year: i32,
    month: u32,
    day: u32,
    precision: DatePrecision,
}

impl PartialDate {
    /// Construct directly from components already known to be valid.
    pub fn new(year: i32, month: u32, day: u32, precision: DatePrecision) -> Self {
        Self {
            year,
            month,
            day,
            precision,
        }
    }

    /// Parse an ISO-8601 partial date: `YYYY`, `YYYY-MM`, or `YYYY-MM-DD`.
    pub fn parse(text: &str) -> Result<Self> {
        let bytes = text.as_bytes();
        if bytes.len() == 4 {
            let year = text
                .parse::<i32>()
                .map_err(|_| ModelError::invalid_datetime(text))?;
            return Ok(Self::new(year, 1, 1, DatePrecision::Year));
        }
        let parts: Vec<&str> = text.split('-').collect();
        match parts.as_slice() {
            [y] => {
                let year = y
                    .parse::<i32>()
                    .map_err(|_| ModelError::invalid_datetime(text))?;
                Ok(Self::new(year, 1, 1, DatePrecision::Year))
            }
            [y, m] => {
                let year = y
                    .parse::<i32>()
                    .map_err(|_| ModelError::invalid_datetime(text))?;
                let month = m
                    .parse::<u32>()
                    .map_err(|_| ModelError::invalid_datetime(text))?;
                NaiveDate::from_ymd_opt(year, month, 1)
                    .ok_or_else(|| ModelError::invalid_datetime(text))?;
                Ok(Self::new(year, month, 1, DatePrecision::Month))
            }
            [y, m, d] => {
                let year = y
                    .parse::<i32>()
                    .map_err(|_| ModelError::invalid_datetime(text))?;
                let month = m
                    .parse::<u32>()
                    .map_err(|_| ModelError::invalid_datetime(text))?;
                let day = d
                    .parse::<u32>()
                    .map_err(|_| ModelError::invalid_datetime(text))?;
                NaiveDate::from_ymd_opt(year, month, day)
                    .ok_or_else(|| ModelError::invalid_datetime(text))?;
                Ok(Self::new(year, month, day, DatePrecision::Day))
            }
            _ => Err(ModelError::invalid_datetime(text)),
        }
    }

    /// The precision this value was specified at.
    pub fn precision(&self) -> DatePrecision {
        self.precision
    }

    /// The calendar year, always present regardless of precision.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The calendar month, defaulting to `1` when specified only to year
    /// precision.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The calendar day, defaulting to `1` when specified to less than day
    /// precision.
    pub fn day(&self) -> u32 {
        self.day
    }

    /// Strict equality: same precision, same calendar fields up to it.
    pub fn equals(&self, other: &Self) -> bool {
        self.precision == other.precision && self.compare_fields(other) == Ordering::Equal
    }

    /// Ordering at the common precision, or `None` when the two values
    /// specify incompatible precisions (per spec.md, comparisons at a
    /// significant position neither side specifies are empty, not a guess).
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        if self.precision != other.precision {
            return None;
        }
        Some(self.compare_fields(other))
    }

    /// Equivalence compares only at the lesser of the two precisions.
    pub fn equivalent(&self, other: &Self) -> bool {
        let p = self.precision.min(other.precision);
        if self.year != other.year {
            return false;
        }
        if p >= DatePrecision::Month && self.month != other.month {
            return false;
        }
        if p >= DatePrecision::Day && self.day != other.day {
            return false;
        }
        true
    }

    fn compare_fields(&self, other: &Self) -> Ordering {
        (self.year, self.month, self.day).cmp(&(other.year, other.month, other.day))
    }
}

impl fmt::Display for PartialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.precision {
            DatePrecision::Year => write!(f, "{:04}", self.year),
            DatePrecision::Month => write!(f, "{:04}-{:02}", self.year, self.month),
            DatePrecision::Day => write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day),
        }
    }
}

/// A partial-precision time, with an optional timezone offset in minutes.
#[derive(Debug, Clone, Copy)]
pub struct PartialTime {
    hour: u32,
    minute: u32,
    second: u32,
    millisecond: u32,
    precision: TimePrecision,
    /// Offset from UTC in minutes, when a timezone was specified.
    tz_offset_minutes: Option<i32>,
}

impl PartialTime {
    /// Construct directly from components already known to be valid.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hour: u32,
        minute: u32,
        second: u32,
        millisecond: u32,
        precision: TimePrecision,
        tz_offset_minutes: Option<i32>,
    ) -> Self {
        Self {
            hour,
            minute,
            second,
            millisecond,
            precision,
            tz_offset_minutes,
        }
    }

    /// Parse an ISO-8601 partial time, with optional trailing `Z` or
    /// `+HH:MM`/`-HH:MM` offset.
    pub fn parse(text: &str) -> Result<Self> {
        let (body, tz) = split_timezone(text);
        let parts: Vec<&str> = body.split(':').collect();
        let (hour, minute, second, millisecond, precision) = match parts.as_slice() {
            [h] => (parse_component(h, text)?, 0, 0, 0, TimePrecision::Hour),
            [h, m] => (
                parse_component(h, text)?,
                parse_component(m, text)?,
                0,
                0,
                TimePrecision::Minute,
            ),
            [h, m, s] => {
                let (sec, ms) = split_fraction(s, text)?;
                let precision = if ms.is_some() {
                    TimePrecision::Millisecond
                } else {
                    TimePrecision::Second
                };
                (
                    parse_component(h, text)?,
                    parse_component(m, text)?,
                    sec,
                    ms.unwrap_or(0),
                    precision,
                )
            }
            _ => return Err(ModelError::invalid_datetime(text)),
        };
        NaiveTime::from_hms_milli_opt(hour, minute, second, millisecond)
            .ok_or_else(|| ModelError::invalid_datetime(text))?;
        Ok(Self::new(hour, minute, second, millisecond, precision, tz))
    }

    /// The precision this value was specified at.
    pub fn precision(&self) -> TimePrecision {
        self.precision
    }

    fn normalized_minutes(&self) -> i64 {
        let local = (self.hour as i64) * 3600
            + (self.minute as i64) * 60
            + self.second as i64
            + (self.millisecond as i64) / 1000;
        local - (self.tz_offset_minutes.unwrap_or(0) as i64) * 60
    }

    /// Strict equality: same precision and same instant-of-day once
    /// timezone offsets are normalized.
    pub fn equals(&self, other: &Self) -> bool {
        self.precision == other.precision
            && self.tz_offset_minutes.is_some() == other.tz_offset_minutes.is_some()
            && self.normalized_minutes() == other.normalized_minutes()
    }

    /// Ordering at the common precision, `None` on a precision mismatch.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        if self.precision != other.precision {
            return None;
        }
        Some(self.normalized_minutes().cmp(&other.normalized_minutes()))
    }

    /// Equivalence compares only at the lesser of the two precisions.
    pub fn equivalent(&self, other: &Self) -> bool {
        let p = self.precision.min(other.precision);
        if self.hour != other.hour {
            return false;
        }
        if p >= TimePrecision::Minute && self.minute != other.minute {
            return false;
        }
        if p >= TimePrecision::Second && self.second != other.second {
            return false;
        }
        if p >= TimePrecision::Millisecond && self.millisecond != other.millisecond {
            return false;
        }
        true
    }
}

impl fmt::Display for PartialTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.precision {
            TimePrecision::Hour => write!(f, "{:02}", self.hour)?,
            TimePrecision::Minute => write!(f, "{:02}:{:02}", self.hour, self.minute)?,
            TimePrecision::Second => {
                write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?
            }
            TimePrecision::Millisecond => write!(
                f,
                "{:02}:{:02}:{:02}.{:03}",
                self.hour, self.minute, self.second, self.millisecond
            )?,
        }
        write_tz(f, self.tz_offset_minutes)
    }
}

/// A partial-precision combined date and time.
#[derive(Debug, Clone, Copy)]
pub struct PartialDateTime {
    /// The date portion.
    pub date: PartialDate,
    /// The time portion, absent when only a date precision was given.
    pub time: Option<PartialTime>,
}

impl PartialDateTime {
    /// Parse an ISO-8601 partial date-time, `date` and `date'T'time` forms.
    pub fn parse(text: &str) -> Result<Self> {
        match text.split_once('T') {
            None => Ok(Self {
                date: PartialDate::parse(text)?,
                time: None,
            }),
            Some((d, t)) => {
                let date = PartialDate::parse(d)?;
                let time = if t.is_empty() {
                    None
                } else {
                    Some(PartialTime::parse(t)?)
                };
                Ok(Self { date, time })
            }
        }
    }

    /// Strict equality: matching date and matching (or both-absent) time.
    pub fn equals(&self, other: &Self) -> bool {
        if !self.date.equals(&other.date) {
            return false;
        }
        match (&self.time, &other.time) {
            (None, None) => true,
            (Some(a), Some(b)) => a.equals(b),
            _ => false,
        }
    }

    /// Ordering at the common precision; `None` on any precision mismatch,
    /// including one side lacking a time component the other has.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match self.date.compare(&other.date) {
            Some(Ordering::Equal) => {}
            other => return other,
        }
        match (&self.time, &other.time) {
            (None, None) => Some(Ordering::Equal),
            (Some(a), Some(b)) => a.compare(b),
            _ => None,
        }
    }

    /// Equivalence compares only at the common precision of both sides.
    pub fn equivalent(&self, other: &Self) -> bool {
        if !self.date.equivalent(&other.date) {
            return false;
        }
        match (&self.time, &other.time) {
            (None, _) | (_, None) => true,
            (Some(a), Some(b)) => a.equivalent(b),
        }
    }
}

impl fmt::Display for PartialDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date)?;
        if let Some(time) = &self.time {
            write!(f, "T{time}")?;
        }
        Ok(())
    }
}

fn write_tz(f: &mut fmt::Formatter<'_>, tz: Option<i32>) -> fmt::Result {
    match tz {
        None => Ok(()),
        Some(0) => write!(f, "Z"),
        Some(mins) => {
            let sign = if mins < 0 { '-' } else { '+' };
            let mins = mins.abs();
            write!(f, "{sign}{:02}:{:02}", mins / 60, mins % 60)
        }
    }
}

fn split_timezone(text: &str) -> (&str, Option<i32>) {
    if let Some(body) = text.strip_suffix('Z') {
        return (body, Some(0));
    }
    // Look for a +HH:MM or -HH:MM suffix after the first couple of chars
    // (avoids matching the '-' that doesn't occur in time bodies, but kept
    // defensive for future date-time splitting reuse).
    if text.len() >= 6 {
        let tail = &text[text.len() - 6..];
        let sign = tail.as_bytes()[0];
        if (sign == b'+' || sign == b'-') && tail.as_bytes()[3] == b':' {
            let h: i32 = tail[1..3].parse().unwrap_or(0);
            let m: i32 = tail[4..6].parse().unwrap_or(0);
            let mins = h * 60 + m;
            let mins = if sign == b'-' { -mins } else { mins };
            return (&text[..text.len() - 6], Some(mins));
        }
    }
    (text, None)
}

fn parse_component(part: &str, whole: &str) -> Result<u32> {
    part.parse::<u32>()
        .map_err(|_| ModelError::invalid_datetime(whole))
}

fn split_fraction(part: &str, whole: &str) -> Result<(u32, Option<u32>)> {
    match part.split_once('.') {
        None => Ok((parse_component(part, whole)?, None)),
        Some((sec, frac)) => {
            let sec = parse_component(sec, whole)?;
            let mut frac = frac.to_string();
            while frac.len() < 3 {
                frac.push('0');
            }
            frac.truncate(3);
            let ms = frac
                .parse::<u32>()
                .map_err(|_| ModelError::invalid_datetime(whole))?;
            Ok((sec, Some(ms)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_precision_dates() {
        assert_eq!(PartialDate::parse("2024").unwrap().precision(), DatePrecision::Year);
        assert_eq!(
            PartialDate::parse("2024-03").unwrap().precision(),
            DatePrecision::Month
        );
        assert_eq!(
            PartialDate::parse("2024-03-15").unwrap().precision(),
            DatePrecision::Day
        );
    }

    #[test]
    fn comparison_empty_on_precision_mismatch() {
        let y = PartialDate::parse("2024").unwrap();
        let ymd = PartialDate::parse("2024-03-15").unwrap();
        assert_eq!(y.compare(&ymd), None);
        assert!(y.equivalent(&ymd));
    }

    #[test]
    fn equivalent_year_month_vs_year() {
        let a = PartialDate::parse("2024-05").unwrap();
        let b = PartialDate::parse("2024").unwrap();
        assert!(a.equivalent(&b));
        let c = PartialDate::parse("2023").unwrap();
        assert!(!a.equivalent(&c));
    }

    #[test]
    fn time_with_tz_normalizes_for_equality() {
        let a = PartialTime::parse("10:00:00Z").unwrap();
        let b = PartialTime::parse("12:00:00+02:00").unwrap();
        assert!(a.equals(&b));
    }
}
