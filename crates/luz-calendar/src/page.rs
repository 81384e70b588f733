//! Extraction of the schedule embedded in the calendar's HTML page.
//!
//! The page carries its data as a script statement
//! `defaultData = JSON.parse('<payload>');` where the payload is JSON with its quotes swapped
//! to `'` and its backslashes doubled.

use std::collections::HashMap;
use std::sync::OnceLock;

use luz_expr::TimeOfDay;
use regex::Regex;
use serde::Deserialize;

use crate::error::LookupError;
use crate::times::{CalendarTimes, NamedTime, ENTRY_LABEL, EXIT_LABEL, RABBEINU_TAM_LABEL};

#[derive(Debug, Deserialize)]
struct RawPage {
    place: RawPlace,
    #[serde(rename = "nextShabbat")]
    next_shabbat: RawShabbat,
}

#[derive(Debug, Deserialize)]
struct RawPlace {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawShabbat {
    shabat_name: String,
    /// Sunset, already in `HH:MM`.
    skiah: TimeOfDay,
    #[serde(default)]
    times: Vec<RawTime>,
}

#[derive(Debug, Deserialize)]
struct RawTime {
    name: String,
    value: serde_json::Value,
}

fn default_data_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"defaultData = JSON\.parse\('(.*?)'\);").expect("valid regex")
    })
}

/// Pull the JSON payload out of the page and undo its escaping.
pub fn extract_payload(html: &str) -> Result<String, LookupError> {
    let captures = default_data_re()
        .captures(html)
        .ok_or_else(|| LookupError::unexpected("page does not embed `defaultData`"))?;
    let raw = captures.get(1).map_or("", |m| m.as_str());
    Ok(raw.replace("\\\\", "\\").replace('\'', "\""))
}

/// Decode a calendar page for `place`.
///
/// The service falls back to some default location for places it does not know, so a payload
/// naming any other place is reported as [`LookupError::PlaceNotFound`].
pub fn parse_shabbat_page(html: &str, place: &str) -> Result<CalendarTimes, LookupError> {
    let payload = extract_payload(html)?;
    let page: RawPage = serde_json::from_str(&payload)
        .map_err(|err| LookupError::unexpected(format!("malformed schedule payload: {err}")))?;

    if page.place.name != place {
        log::debug!(
            "calendar answered for `{}` instead of `{place}`",
            page.place.name
        );
        return Err(LookupError::PlaceNotFound {
            place: place.to_string(),
        });
    }

    let shabbat = page.next_shabbat;
    let times: Vec<NamedTime> = shabbat
        .times
        .into_iter()
        .filter_map(|t| match json_text(&t.value) {
            Some(value) => Some(NamedTime {
                label: t.name,
                value,
            }),
            None => {
                log::warn!("calendar entry `{}` has a non-text value; ignored", t.name);
                None
            }
        })
        .collect();

    let by_label: HashMap<&str, &str> = times
        .iter()
        .map(|t| (t.label.as_str(), t.value.as_str()))
        .collect();
    let required = |label: &str| -> Result<TimeOfDay, LookupError> {
        let value = by_label
            .get(label)
            .ok_or_else(|| LookupError::unexpected(format!("missing time `{label}`")))?;
        parse_time(label, value)
    };

    let entry = required(ENTRY_LABEL)?;
    let exit = required(EXIT_LABEL)?;
    let rabbeinu_tam = required(RABBEINU_TAM_LABEL)?;
    let sunset = shabbat.skiah;

    Ok(CalendarTimes {
        place: page.place.name,
        portion: shabbat.shabat_name,
        entry,
        exit,
        rabbeinu_tam,
        sunset,
        times,
    })
}

fn json_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_time(label: &str, value: &str) -> Result<TimeOfDay, LookupError> {
    value.parse().map_err(|_| {
        LookupError::unexpected(format!("time `{label}` has malformed value `{value}`"))
    })
}
