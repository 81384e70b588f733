use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// A clock reading with no date component.
///
/// Arithmetic wraps around midnight in both directions. Serialized as its `HH:MM` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Returns `None` unless `hour < 24` and `minute < 60`.
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    pub fn minutes_since_midnight(self) -> i64 {
        i64::from(self.hour) * 60 + i64::from(self.minute)
    }

    fn from_wrapped_minutes(total: i64) -> Self {
        let total = total.rem_euclid(MINUTES_PER_DAY);
        Self {
            hour: (total / 60) as u8,
            minute: (total % 60) as u8,
        }
    }

    #[must_use]
    pub fn add_minutes(self, minutes: i64) -> Self {
        // Reduce first so huge offsets cannot overflow the addition.
        Self::from_wrapped_minutes(self.minutes_since_midnight() + minutes.rem_euclid(MINUTES_PER_DAY))
    }

    /// Round the minute up to the next multiple of 5, carrying into the hour (and past midnight).
    #[must_use]
    pub fn round_up_5(self) -> Self {
        let rem = i64::from(self.minute % 5);
        if rem == 0 {
            self
        } else {
            self.add_minutes(5 - rem)
        }
    }

    /// Round the minute down to the previous multiple of 5.
    #[must_use]
    pub fn round_down_5(self) -> Self {
        Self {
            hour: self.hour,
            minute: self.minute - self.minute % 5,
        }
    }

    /// Parse a strict `HH:MM` reading (two digits each, `00:00`..=`23:59`).
    pub fn parse_hhmm(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return None;
        }
        let digit = |b: u8| b.is_ascii_digit().then(|| b - b'0');
        let hour = digit(bytes[0])? * 10 + digit(bytes[1])?;
        let minute = digit(bytes[3])? * 10 + digit(bytes[4])?;
        Self::new(hour, minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTime(pub String);

impl fmt::Display for InvalidTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time of day `{}` (expected HH:MM)", self.0)
    }
}

impl std::error::Error for InvalidTime {}

impl TryFrom<String> for TimeOfDay {
    type Error = InvalidTime;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hhmm(&value).ok_or(InvalidTime(value))
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl FromStr for TimeOfDay {
    type Err = InvalidTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hhmm(s.trim()).ok_or_else(|| InvalidTime(s.to_string()))
    }
}

/// Runtime value of a token expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Number(i64),
    Time(TimeOfDay),
    /// String-valued names such as the weekly portion. Never takes part in arithmetic.
    Text(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Time(_) => "time",
            Value::Text(_) => "text",
        }
    }

    pub fn as_time(&self) -> Option<TimeOfDay> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Interpret a loosely typed replacement value: `HH:MM` becomes a time, an optionally signed
    /// integer becomes a number, anything else is kept as text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(time) = TimeOfDay::parse_hhmm(trimmed) {
            return Value::Time(time);
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::Number(n);
        }
        Value::Text(raw.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(i64::from(value))
    }
}

impl From<TimeOfDay> for Value {
    fn from(value: TimeOfDay) -> Self {
        Value::Time(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Renders the value the way it is written back into the document.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u8, m: u8) -> TimeOfDay {
        TimeOfDay::new(h, m).unwrap()
    }

    #[test]
    fn add_minutes_wraps_both_directions() {
        assert_eq!(t(23, 50).add_minutes(20), t(0, 10));
        assert_eq!(t(0, 10).add_minutes(-20), t(23, 50));
        assert_eq!(t(12, 0).add_minutes(-24 * 60 * 3), t(12, 0));
        assert_eq!(t(12, 0).add_minutes(i64::MIN), t(12, 0).add_minutes(i64::MIN % (24 * 60)));
    }

    #[test]
    fn rounding_carries_into_hour_and_past_midnight() {
        assert_eq!(t(10, 58).round_up_5(), t(11, 0));
        assert_eq!(t(23, 58).round_up_5(), t(0, 0));
        assert_eq!(t(10, 58).round_down_5(), t(10, 55));
        assert_eq!(t(10, 55).round_up_5(), t(10, 55));
        assert_eq!(t(10, 55).round_down_5(), t(10, 55));
    }

    #[test]
    fn parse_hhmm_is_strict() {
        assert_eq!(TimeOfDay::parse_hhmm("07:05"), Some(t(7, 5)));
        assert_eq!(TimeOfDay::parse_hhmm("7:05"), None);
        assert_eq!(TimeOfDay::parse_hhmm("24:00"), None);
        assert_eq!(TimeOfDay::parse_hhmm("12:60"), None);
        assert_eq!(TimeOfDay::parse_hhmm("12-30"), None);
    }

    #[test]
    fn serde_goes_through_hhmm() {
        assert_eq!(serde_json::to_string(&t(7, 5)).unwrap(), r#""07:05""#);
        assert_eq!(serde_json::from_str::<TimeOfDay>(r#""23:59""#).unwrap(), t(23, 59));

        let err = serde_json::from_str::<TimeOfDay>(r#""24:00""#).unwrap_err();
        assert!(err.to_string().contains("invalid time of day `24:00`"), "{err}");
        assert!(serde_json::from_str::<TimeOfDay>(r#"{"hour":99,"minute":75}"#).is_err());
        assert!(serde_json::from_str::<TimeOfDay>("1930").is_err());
    }

    #[test]
    fn infer_picks_the_narrowest_type() {
        assert_eq!(Value::infer("19:30"), Value::Time(t(19, 30)));
        assert_eq!(Value::infer("-4"), Value::Number(-4));
        assert_eq!(Value::infer("נח"), Value::Text("נח".to_string()));
    }

    #[test]
    fn display_renders_document_text() {
        assert_eq!(Value::Time(t(9, 5)).to_string(), "09:05");
        assert_eq!(Value::Number(-12).to_string(), "-12");
        assert_eq!(Value::from("בראשית").to_string(), "בראשית");
    }
}
