//! fmr-calendar
//!
//! Trading-date handling for the margin report.
//!
//! - Date normalisation: a closed set of date-like inputs ([`DateInput`]) is
//!   converted to a calendar day and to the integer tdate (YYYYMMDD).
//! - Trading-day filter: restrict the exchange calendar to one
//!   session/exchange pair and a date window, yielding ordered tdates.
//!
//! Pure deterministic logic. No IO, no wall-clock.

mod date;
mod filter;

pub use date::{parse_tdate, tdate_of, tdate_to_date, to_date, to_tdate, DateError, DateInput};
pub use filter::{filter_trading_days, TradingDayFilter};
