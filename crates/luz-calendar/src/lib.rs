#![forbid(unsafe_code)]

//! Upcoming Shabbat times for a place, as reported by the yeshiva.org.il calendar, and the name
//! table they seed for a template fill.

pub mod error;
pub mod lookup;
pub mod page;
pub mod times;

pub use error::LookupError;
pub use lookup::{CalendarConfig, HttpTimeLookup, StaticTimeLookup, TimeLookup};
pub use page::{extract_payload, parse_shabbat_page};
pub use times::{label_to_name, CalendarTimes, NamedTime};
