use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use regex::Regex;

use crate::error::{Error, Result};

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const WEEKDAY_WINDOW: i64 = 7;
const DAY_MONTH_WINDOW: i64 = 366;
const SECS_PER_DAY: i64 = 86_400;

static JUST_NOW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^just now$").unwrap());
static MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)m ago$").unwrap());
static HOURS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)h ago$").unwrap());
static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)[ap]m$").unwrap());
static WEEKDAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^({})$", WEEKDAYS.join("|"))).unwrap());
static DAY_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^(\d+) ({})$", MONTHS.join("|"))).unwrap());
static DAY_MONTH_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^(\d+) ({}) (\d+)$", MONTHS.join("|"))).unwrap());

/// Resolve a short date label such as `"2h ago"`, `"Wed"` or `"31 Jan"` to `YYYY-MM-DD`.
///
/// `origin` is local wall-clock time as epoch seconds. Labels only carry day
/// precision once they are older than a day, so the time of day is dropped.
/// An optional `Added ` prefix is ignored.
pub fn parse_relative_date(origin: i64, label: &str) -> Result<String> {
    let date_str = label.trim();
    let date_str = date_str.strip_prefix("Added ").unwrap_or(date_str).trim();
    if date_str.is_empty() {
        return Err(Error::Parse(format!(
            "{:?} does not say when the answer was added",
            label
        )));
    }

    let date = if JUST_NOW_RE.is_match(date_str) || CLOCK_RE.is_match(date_str) {
        at(origin)?
    } else if let Some(caps) = MINUTES_RE.captures(date_str) {
        at(before(origin, span(&caps[1], 60, date_str)?, date_str)?)?
    } else if let Some(caps) = HOURS_RE.captures(date_str) {
        at(before(origin, span(&caps[1], 3600, date_str)?, date_str)?)?
    } else if let Some(caps) = WEEKDAY_RE.captures(date_str) {
        let weekday = WEEKDAYS.iter().position(|d| *d == &caps[1]).unwrap_or_default() as u32;
        walk_back(origin, WEEKDAY_WINDOW, date_str, |d| {
            d.weekday().num_days_from_monday() == weekday
        })?
    } else if let Some(caps) = DAY_MONTH_RE.captures(date_str) {
        let day: u32 = caps[1].parse().map_err(|_| invalid(date_str))?;
        let month = MONTHS.iter().position(|m| *m == &caps[2]).unwrap_or_default() as u32 + 1;
        walk_back(origin, DAY_MONTH_WINDOW, date_str, |d| {
            d.month() == month && d.day() == day
        })?
    } else if DAY_MONTH_YEAR_RE.is_match(date_str) {
        NaiveDate::parse_from_str(date_str, "%d %b %Y").map_err(|_| invalid(date_str))?
    } else {
        return Err(Error::Parse(format!(
            "date {:?} could not be interpreted",
            date_str
        )));
    };

    Ok(date.format("%Y-%m-%d").to_string())
}

fn at(epoch: i64) -> Result<NaiveDate> {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| Error::Parse(format!("timestamp {} is out of range", epoch)))
}

fn span(count: &str, unit: i64, date_str: &str) -> Result<i64> {
    count
        .parse::<i64>()
        .ok()
        .and_then(|n| n.checked_mul(unit))
        .ok_or_else(|| invalid(date_str))
}

fn before(origin: i64, secs: i64, date_str: &str) -> Result<i64> {
    origin.checked_sub(secs).ok_or_else(|| invalid(date_str))
}

/// Step back one day at a time from the day before `origin` until `matches` holds.
fn walk_back(
    origin: i64,
    window: i64,
    date_str: &str,
    matches: impl Fn(&NaiveDate) -> bool,
) -> Result<NaiveDate> {
    for offset in 1..=window {
        let day = at(before(origin, SECS_PER_DAY * offset, date_str)?)?;
        if matches(&day) {
            return Ok(day);
        }
    }
    Err(invalid(date_str))
}

fn invalid(date_str: &str) -> Error {
    Error::Parse(format!("date {:?} is invalid", date_str))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    // 2020-03-10T12:00:00Z, a Tuesday
    const ORIGIN: i64 = 1_583_841_600;

    fn parse(label: &str) -> Option<String> {
        parse_relative_date(ORIGIN, label).ok()
    }

    #[test]
    fn hours_ago_same_day() {
        assert_eq!(parse("2h ago").as_deref(), Some("2020-03-10"));
    }

    #[test]
    fn hours_ago_crosses_midnight() {
        assert_eq!(parse("13h ago").as_deref(), Some("2020-03-09"));
    }

    #[test]
    fn minutes_and_just_now() {
        assert_eq!(parse("45m ago").as_deref(), Some("2020-03-10"));
        assert_eq!(parse("just now").as_deref(), Some("2020-03-10"));
        assert_eq!(parse("9am").as_deref(), Some("2020-03-10"));
    }

    #[test]
    fn added_prefix_is_stripped() {
        assert_eq!(parse("Added 2h ago").as_deref(), Some("2020-03-10"));
    }

    #[test]
    fn weekday_resolves_to_previous_week() {
        assert_eq!(parse("Wed").as_deref(), Some("2020-03-04"));
        assert_eq!(parse("Mon").as_deref(), Some("2020-03-09"));
        // Today's weekday means one week back
        assert_eq!(parse("Tue").as_deref(), Some("2020-03-03"));
    }

    #[test]
    fn day_month_walks_into_previous_year() {
        assert_eq!(parse("31 Jan").as_deref(), Some("2020-01-31"));
        assert_eq!(parse("25 Dec").as_deref(), Some("2019-12-25"));
        // Today is excluded
        assert_eq!(parse("10 Mar").as_deref(), Some("2019-03-10"));
    }

    #[test]
    fn day_month_outside_window_fails() {
        assert!(parse("30 Feb").is_none());
        assert!(parse("45 Jan").is_none());
    }

    #[test]
    fn explicit_year() {
        assert_eq!(parse("3 Jul 2014").as_deref(), Some("2014-07-03"));
        assert!(parse("31 Feb 2014").is_none());
    }

    #[test]
    fn origin_at_the_edge_of_time_is_an_error() {
        assert!(parse_relative_date(i64::MIN, "2h ago").is_err());
        assert!(parse_relative_date(i64::MIN + 1, "Wed").is_err());
        assert!(parse_relative_date(i64::MAX, "10 Mar").is_err());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse("").is_none());
        assert!(parse("Added ").is_none());
        assert!(parse("yesterday").is_none());
        assert!(parse("99999999999999999999h ago").is_none());
        assert!(matches!(
            parse_relative_date(ORIGIN, "last week"),
            Err(Error::Parse(_))
        ));
    }
}
