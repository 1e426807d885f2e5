//! Date parsing and formatting behind a narrow adapter interface
//!
//! Date formats use the `YYYY-MM-DD HH:mm:ss` token style common in wire
//! payloads; [`ChronoDateAdapter`] translates them to chrono's strftime syntax.

use crate::config::{self, TimeZoneSetting};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use regex::{Captures, Regex};
use std::sync::{Arc, OnceLock};

/// Format used when neither the field nor the model declares one
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD HH:mm:ss";

/// Naive layouts tried when no format is given or the given one does not match
const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];
const FALLBACK_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Date parse/format/validate operations consumed by the `date` converters
pub trait DateAdapter: Send + Sync {
    /// Parse `text`, honoring `format` when given
    fn parse(&self, text: &str, format: Option<&str>) -> Option<DateTime<FixedOffset>>;

    /// Build a date from epoch milliseconds
    fn from_millis(&self, millis: f64) -> Option<DateTime<FixedOffset>>;

    /// Render `date` with a token format
    fn format(&self, date: &DateTime<FixedOffset>, format: &str) -> String;

    fn is_valid(&self, text: &str, format: Option<&str>) -> bool {
        self.parse(text, format).is_some()
    }
}

/// Shared adapter handle
pub type SharedDateAdapter = Arc<dyn DateAdapter>;

/// chrono-backed adapter. Naive timestamps are placed in a time zone, the
/// globally configured one unless overridden.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoDateAdapter {
    zone: Option<TimeZoneSetting>,
}

impl ChronoDateAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self::with_zone(TimeZoneSetting::Fixed(offset))
    }

    pub fn with_zone(zone: TimeZoneSetting) -> Self {
        Self { zone: Some(zone) }
    }

    fn zone(&self) -> TimeZoneSetting {
        self.zone.unwrap_or_else(config::default_time_zone)
    }

    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        self.zone().localize(&naive)
    }

    fn parse_with(&self, text: &str, pattern: &str) -> Option<DateTime<FixedOffset>> {
        if let Ok(date) = DateTime::parse_from_str(text, pattern) {
            return Some(date);
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return self.localize(naive);
        }
        NaiveDate::parse_from_str(text, pattern)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .and_then(|naive| self.localize(naive))
    }
}

impl DateAdapter for ChronoDateAdapter {
    fn parse(&self, text: &str, format: Option<&str>) -> Option<DateTime<FixedOffset>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(format) = format.filter(|f| !f.is_empty()) {
            if let Some(date) = self.parse_with(text, &translate_format(format)) {
                return Some(date);
            }
        }

        if let Ok(date) = DateTime::parse_from_rfc3339(text) {
            return Some(date);
        }
        FALLBACK_DATETIME_FORMATS
            .iter()
            .find_map(|pattern| NaiveDateTime::parse_from_str(text, pattern).ok())
            .or_else(|| {
                FALLBACK_DATE_FORMATS.iter().find_map(|pattern| {
                    NaiveDate::parse_from_str(text, pattern)
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                })
            })
            .and_then(|naive| self.localize(naive))
    }

    fn from_millis(&self, millis: f64) -> Option<DateTime<FixedOffset>> {
        if !millis.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis(millis as i64).map(|date| self.zone().at(&date))
    }

    fn format(&self, date: &DateTime<FixedOffset>, format: &str) -> String {
        let pattern = translate_format(format);
        let items: Vec<Item<'_>> = StrftimeItems::new(&pattern).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            log::warn!("Unsupported date format '{}', falling back to RFC 3339", format);
            return date.to_rfc3339_opts(SecondsFormat::Millis, true);
        }
        date.format_with_items(items.into_iter()).to_string()
    }
}

fn token_pattern() -> &'static Regex {
    static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    TOKEN_REGEX.get_or_init(|| {
        Regex::new(r"\[([^\]]*)\]|YYYY|YY|SSS|MM|M|DD|D|HH|H|hh|h|mm|m|ss|s|A|a|ZZ|Z|%")
            .expect("Valid regex pattern")
    })
}

/// Translate `YYYY-MM-DD HH:mm:ss` tokens into a chrono strftime pattern.
///
/// Text in square brackets is copied literally.
pub fn translate_format(format: &str) -> String {
    token_pattern()
        .replace_all(format, |caps: &Captures<'_>| {
            if let Some(literal) = caps.get(1) {
                return literal.as_str().replace('%', "%%");
            }
            match &caps[0] {
                "YYYY" => "%Y",
                "YY" => "%y",
                "SSS" => "%3f",
                "MM" => "%m",
                "M" => "%-m",
                "DD" => "%d",
                "D" => "%-d",
                "HH" => "%H",
                "H" => "%-H",
                "hh" => "%I",
                "h" => "%-I",
                "mm" => "%M",
                "m" => "%-M",
                "ss" => "%S",
                "s" => "%-S",
                "A" => "%p",
                "a" => "%P",
                "ZZ" => "%z",
                "Z" => "%:z",
                _ => "%%",
            }
            .to_string()
        })
        .into_owned()
}
