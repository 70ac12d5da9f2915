use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{
    Date, Duration, OffsetDateTime, format_description::well_known::Rfc3339,
    macros::format_description,
};
use time_tz::{ToTimezone, timezones};

/// Canonical identifier of a Monday-starting 7-day window.
///
/// The string form is the ISO date of the Monday (`YYYY-MM-DD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekKey(Date);

/// Returns the Monday of the week containing `date`.
pub fn week_start(date: Date) -> Date {
    // Monday = 1 ... Sunday = 7
    let offset = (date.weekday().number_from_monday() - 1) % 7;

    date.saturating_sub(Duration::days(offset.into()))
}

/// Today's calendar date in the given IANA timezone, UTC when unknown.
pub fn today(tz: impl AsRef<str>) -> Date {
    let mut now = OffsetDateTime::now_utc();

    if let Some(tz) = timezones::get_by_name(tz.as_ref()) {
        now = now.to_timezone(tz);
    }

    now.date()
}

/// Parses `YYYY-MM-DD` or an RFC 3339 date-time (taken in its own offset).
pub fn parse_date(value: &str) -> crate::Result<Date> {
    let value = value.trim();

    if let Ok(date) = Date::parse(value, format_description!("[year]-[month]-[day]")) {
        return Ok(date);
    }

    match OffsetDateTime::parse(value, &Rfc3339) {
        Ok(datetime) => Ok(datetime.date()),
        Err(_) => crate::invalid!("invalid date '{}', expected YYYY-MM-DD", value),
    }
}

impl WeekKey {
    pub fn new(date: Date) -> Self {
        Self(week_start(date))
    }

    pub fn today(tz: impl AsRef<str>) -> Self {
        Self::new(today(tz))
    }

    pub fn parse(value: &str) -> crate::Result<Self> {
        Ok(Self::new(parse_date(value)?))
    }

    /// The Monday.
    pub fn start(&self) -> Date {
        self.0
    }

    /// The Sunday.
    pub fn end(&self) -> Date {
        self.0.saturating_add(Duration::days(6))
    }

    pub fn days(&self) -> [Date; 7] {
        std::array::from_fn(|i| self.0.saturating_add(Duration::days(i as i64)))
    }

    pub fn contains(&self, date: Date) -> bool {
        week_start(date) == self.0
    }

    /// Position of `date` inside the week, `None` when it belongs to another week.
    pub fn day_index(&self, date: Date) -> Option<usize> {
        if !self.contains(date) {
            return None;
        }

        Some(date.weekday().number_days_from_monday().into())
    }

    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(Duration::weeks(1)))
    }

    pub fn previous(&self) -> Self {
        Self(self.0.saturating_sub(Duration::weeks(1)))
    }

    /// Unix timestamp of the Monday at 00:00:00 UTC, used as the storage column.
    pub fn unix_timestamp(&self) -> i64 {
        self.0.midnight().assume_utc().unix_timestamp()
    }

    pub fn from_unix_timestamp(timestamp: i64) -> crate::Result<Self> {
        Ok(Self::new(OffsetDateTime::from_unix_timestamp(timestamp)?.date()))
    }
}

impl From<Date> for WeekKey {
    fn from(value: Date) -> Self {
        Self::new(value)
    }
}

impl From<OffsetDateTime> for WeekKey {
    fn from(value: OffsetDateTime) -> Self {
        Self::new(value.date())
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_date(self.0))
    }
}

impl FromStr for WeekKey {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for WeekKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WeekKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

/// Every week overlapping the calendar month of `date`, in order.
pub fn weeks_in_month(date: Date) -> crate::Result<Vec<WeekKey>> {
    let first = date.replace_day(1)?;
    let mut week = WeekKey::new(first);
    let mut weeks = vec![week];

    loop {
        week = week.next();
        let start = week.start();
        if start.month() != first.month() || start.year() != first.year() {
            break;
        }

        weeks.push(week);
    }

    Ok(weeks)
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Serde adapter writing `YYYY-MM-DD` and accepting any input [`parse_date`] accepts.
pub mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let value = String::deserialize(deserializer)?;
        super::parse_date(&value).map_err(serde::de::Error::custom)
    }
}
