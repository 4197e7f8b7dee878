//! Date normalisation.
//!
//! Every date in the exports (`trade_day` columns, config thresholds, CLI
//! arguments) is routed through [`to_date`] / [`to_tdate`].
//!
//! Integer form decomposes as `year = v / 10000`, `month = (v / 100) % 100`,
//! `day = v % 100`.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

// ---------------------------------------------------------------------------
// Input / error types
// ---------------------------------------------------------------------------

/// A date-like value in one of the supported representations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    /// Calendar date.
    Date(NaiveDate),
    /// Timestamp; truncated to the day.
    DateTime(NaiveDateTime),
    /// Integer YYYYMMDD.
    Int(i64),
    /// Text: YYYYMMDD digits, `YYYY-MM-DD`, `YYYY/MM/DD`, optionally followed
    /// by a time component.
    Text(String),
    /// Missing value (e.g. an empty CSV cell).
    Null,
}

impl From<NaiveDate> for DateInput {
    fn from(d: NaiveDate) -> Self {
        DateInput::Date(d)
    }
}

impl From<NaiveDateTime> for DateInput {
    fn from(dt: NaiveDateTime) -> Self {
        DateInput::DateTime(dt)
    }
}

impl From<i64> for DateInput {
    fn from(v: i64) -> Self {
        DateInput::Int(v)
    }
}

impl From<u32> for DateInput {
    fn from(v: u32) -> Self {
        DateInput::Int(i64::from(v))
    }
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        DateInput::Text(s.to_string())
    }
}

impl From<String> for DateInput {
    fn from(s: String) -> Self {
        DateInput::Text(s)
    }
}

impl<T: Into<DateInput>> From<Option<T>> for DateInput {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(DateInput::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// Null or blank input.
    Null,
    /// Text that is not in any supported date layout.
    Unsupported(String),
    /// Integer form that does not name a real calendar day.
    OutOfRange(i64),
}

impl fmt::Display for DateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateError::Null => write!(f, "date value is null"),
            DateError::Unsupported(raw) => write!(f, "unsupported date value: '{raw}'"),
            DateError::OutOfRange(v) => write!(f, "not a calendar date: {v}"),
        }
    }
}

impl std::error::Error for DateError {}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Normalise a date-like value to a calendar day.
pub fn to_date(input: &DateInput) -> Result<NaiveDate, DateError> {
    match input {
        DateInput::Null => Err(DateError::Null),
        DateInput::Date(d) => Ok(*d),
        DateInput::DateTime(dt) => Ok(dt.date()),
        DateInput::Int(v) => from_int(*v),
        DateInput::Text(s) => from_text(s),
    }
}

/// Normalise a date-like value to its integer tdate (YYYYMMDD).
pub fn to_tdate(input: &DateInput) -> Result<u32, DateError> {
    to_date(input).map(tdate_of)
}

/// Convenience for CSV cells: `to_tdate(&DateInput::Text(raw))`, with blank
/// cells reported as [`DateError::Null`].
pub fn parse_tdate(raw: &str) -> Result<u32, DateError> {
    to_tdate(&DateInput::Text(raw.to_string()))
}

/// Integer tdate of a calendar day.
pub fn tdate_of(d: NaiveDate) -> u32 {
    // Years in the exports are four-digit and positive.
    d.year() as u32 * 10_000 + d.month() * 100 + d.day()
}

/// Inverse of [`tdate_of`].
pub fn tdate_to_date(tdate: u32) -> Result<NaiveDate, DateError> {
    from_int(i64::from(tdate))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn from_int(v: i64) -> Result<NaiveDate, DateError> {
    let year = v / 10_000;
    let month = (v / 100) % 100;
    let day = v % 100;

    if v <= 0 || year > i64::from(i32::MAX) {
        return Err(DateError::OutOfRange(v));
    }

    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or(DateError::OutOfRange(v))
}

fn from_text(raw: &str) -> Result<NaiveDate, DateError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(DateError::Null);
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        let v: i64 = s
            .parse()
            .map_err(|_| DateError::Unsupported(raw.to_string()))?;
        return from_int(v);
    }

    // Timestamp-like text: keep the date part only.
    let date_part = s
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or(s);

    for layout in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, layout) {
            return Ok(d);
        }
    }

    Err(DateError::Unsupported(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn int_decomposes_into_year_month_day() {
        assert_eq!(to_date(&DateInput::Int(20180305)).unwrap(), ymd(2018, 3, 5));
    }

    #[test]
    fn text_layouts_agree() {
        for s in [
            "20180305",
            "2018-03-05",
            "2018/03/05",
            "2018-03-05 00:00:00",
            "2018-03-05T14:30:00",
            " 2018-03-05 ",
        ] {
            assert_eq!(parse_tdate(s).unwrap(), 20180305, "failed for '{s}'");
        }
    }

    #[test]
    fn datetime_truncates_to_day() {
        let dt = ymd(2017, 10, 9).and_hms_opt(21, 15, 0).unwrap();
        assert_eq!(to_tdate(&dt.into()).unwrap(), 20171009);
    }

    #[test]
    fn tdate_round_trip_is_stable() {
        let inputs: Vec<DateInput> = vec![
            DateInput::Int(20180305),
            DateInput::Text("2018-03-05".to_string()),
            DateInput::Date(ymd(2018, 3, 5)),
            DateInput::DateTime(ymd(2018, 3, 5).and_hms_opt(9, 0, 0).unwrap()),
        ];
        for x in inputs {
            let via_date = to_tdate(&DateInput::Date(to_date(&x).unwrap())).unwrap();
            assert_eq!(via_date, to_tdate(&x).unwrap());
        }
    }

    #[test]
    fn null_and_blank_are_value_errors() {
        assert_eq!(to_date(&DateInput::Null), Err(DateError::Null));
        assert_eq!(parse_tdate("   "), Err(DateError::Null));
        assert_eq!(to_date(&DateInput::from(None::<&str>)), Err(DateError::Null));
    }

    #[test]
    fn non_date_text_is_unsupported() {
        assert!(matches!(parse_tdate("yesterday"), Err(DateError::Unsupported(_))));
        assert!(matches!(parse_tdate("2018-13-01"), Err(DateError::Unsupported(_))));
    }

    #[test]
    fn impossible_integer_dates_are_out_of_range() {
        assert_eq!(parse_tdate("20181345"), Err(DateError::OutOfRange(20181345)));
        assert_eq!(to_date(&DateInput::Int(0)), Err(DateError::OutOfRange(0)));
        assert_eq!(to_date(&DateInput::Int(-20180101)), Err(DateError::OutOfRange(-20180101)));
    }

    #[test]
    fn tdate_to_date_inverts_tdate_of() {
        let d = ymd(2016, 10, 31);
        assert_eq!(tdate_to_date(tdate_of(d)).unwrap(), d);
    }

    #[test]
    fn error_display_names_the_value() {
        assert!(DateError::Unsupported("abc".to_string()).to_string().contains("abc"));
        assert!(DateError::OutOfRange(20181345).to_string().contains("20181345"));
    }
}
