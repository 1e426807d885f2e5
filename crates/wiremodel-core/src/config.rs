//! Process-wide engine configuration
//!
//! Holds the default time zone used by date conversions and the default
//! [`ConvertOptions`] merged under every caller-supplied option set.

use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

static ENGINE_CONFIG: OnceLock<RwLock<EngineConfig>> = OnceLock::new();

/// Global configuration consumed by the conversion engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Zone applied to parsed dates: an IANA name such as `Asia/Shanghai`, or a
    /// UTC offset such as `+08:00`, `Z` or `UTC`
    pub default_timezone: Option<String>,
    /// Options merged under every conversion call
    pub default_options: ConvertOptionsDefaults,
}

/// Serializable subset of [`ConvertOptions`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptionsDefaults {
    pub filter_key: Option<Vec<String>>,
    pub disable_provide_check: Option<bool>,
    pub enable_strict_base_type_check: Option<bool>,
}

/// Restricts which keys take part in a conversion.
///
/// Keys are matched by their fully-qualified dotted path (`parent.child`).
#[derive(Clone)]
pub enum KeyFilter {
    /// Only the listed paths are converted
    Keys(Vec<String>),
    /// Keys for which the predicate returns true are converted
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl KeyFilter {
    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        KeyFilter::Predicate(Arc::new(f))
    }

    pub fn allows(&self, path: &str) -> bool {
        match self {
            KeyFilter::Keys(keys) => keys.iter().any(|k| k == path),
            KeyFilter::Predicate(f) => f(path),
        }
    }
}

impl fmt::Debug for KeyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyFilter::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            KeyFilter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Per-call options of `from_wire` / `to_wire`
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub filter_key: Option<KeyFilter>,
    /// Skip the structural required-field pre-check
    pub disable_provide_check: Option<bool>,
    /// Assert runtime shapes before coercing under strict policies
    pub enable_strict_base_type_check: Option<bool>,
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_key = Some(KeyFilter::Keys(keys.into_iter().map(Into::into).collect()));
        self
    }

    pub fn with_filter_fn(mut self, f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.filter_key = Some(KeyFilter::predicate(f));
        self
    }

    pub fn with_provide_check_disabled(mut self, disabled: bool) -> Self {
        self.disable_provide_check = Some(disabled);
        self
    }

    pub fn with_strict_base_type_check(mut self, enabled: bool) -> Self {
        self.enable_strict_base_type_check = Some(enabled);
        self
    }

    /// Fill every unset option from `defaults`; values set here win
    pub fn merged_with(&self, defaults: &ConvertOptionsDefaults) -> ConvertOptions {
        ConvertOptions {
            filter_key: self
                .filter_key
                .clone()
                .or_else(|| defaults.filter_key.clone().map(KeyFilter::Keys)),
            disable_provide_check: self
                .disable_provide_check
                .or(defaults.disable_provide_check),
            enable_strict_base_type_check: self
                .enable_strict_base_type_check
                .or(defaults.enable_strict_base_type_check),
        }
    }

    /// Merge under the globally configured defaults
    pub fn with_global_defaults(&self) -> ConvertOptions {
        self.merged_with(&current().default_options)
    }

    pub fn provide_check_disabled(&self) -> bool {
        self.disable_provide_check.unwrap_or(false)
    }

    pub fn strict_base_type_check(&self) -> bool {
        self.enable_strict_base_type_check.unwrap_or(false)
    }

    pub fn allows_key(&self, path: &str) -> bool {
        self.filter_key.as_ref().map_or(true, |filter| filter.allows(path))
    }
}

fn global() -> &'static RwLock<EngineConfig> {
    ENGINE_CONFIG.get_or_init(|| RwLock::new(EngineConfig::default()))
}

/// Replace the global configuration
pub fn configure(config: EngineConfig) -> Result<()> {
    if let Some(zone) = config.default_timezone.as_deref() {
        parse_time_zone(zone)?;
    }
    let mut guard = global().write().unwrap_or_else(|e| e.into_inner());
    *guard = config;
    Ok(())
}

/// Snapshot of the global configuration
pub fn current() -> EngineConfig {
    global().read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Set the default time zone used by date conversions
pub fn configure_timezone(zone: &str) -> Result<()> {
    parse_time_zone(zone)?;
    let mut guard = global().write().unwrap_or_else(|e| e.into_inner());
    guard.default_timezone = Some(zone.to_string());
    Ok(())
}

/// Parse a JSON configuration document and install it
pub fn load_config_str(json: &str) -> Result<EngineConfig> {
    let config: EngineConfig = serde_json::from_str(json)?;
    configure(config.clone())?;
    Ok(config)
}

/// Time zone naive wire dates are read in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeZoneSetting {
    /// IANA zone; the offset follows its daylight saving rules
    Named(Tz),
    Fixed(FixedOffset),
}

impl TimeZoneSetting {
    pub fn utc() -> Self {
        Self::Fixed(utc_offset())
    }

    /// Place a naive local time in this zone. Ambiguous times resolve to the
    /// earlier instant, times skipped by a transition give `None`.
    pub fn localize(&self, naive: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Named(tz) => tz
                .from_local_datetime(naive)
                .earliest()
                .map(|date| date.fixed_offset()),
            Self::Fixed(offset) => offset.from_local_datetime(naive).single(),
        }
    }

    /// View an instant in this zone
    pub fn at(&self, instant: &DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Named(tz) => instant.with_timezone(tz).fixed_offset(),
            Self::Fixed(offset) => instant.with_timezone(offset),
        }
    }
}

impl fmt::Display for TimeZoneSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(tz) => f.write_str(tz.name()),
            Self::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

/// The configured default time zone, UTC when unset
pub fn default_time_zone() -> TimeZoneSetting {
    let guard = global().read().unwrap_or_else(|e| e.into_inner());
    guard
        .default_timezone
        .as_deref()
        .and_then(|zone| parse_time_zone(zone).ok())
        .unwrap_or_else(TimeZoneSetting::utc)
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Parse an IANA zone name, falling back to a UTC offset
pub fn parse_time_zone(zone: &str) -> Result<TimeZoneSetting> {
    let zone = zone.trim();
    if let Ok(offset) = parse_utc_offset(zone) {
        return Ok(TimeZoneSetting::Fixed(offset));
    }
    zone.parse::<Tz>()
        .map(TimeZoneSetting::Named)
        .map_err(|_| Error::Configuration {
            message: format!(
                "unsupported time zone '{}', expected an IANA name such as Asia/Shanghai or a UTC offset such as +08:00",
                zone
            ),
        })
}

/// Parse `Z`, `UTC`, `+08:00`, `+0800` or `-05`
pub fn parse_utc_offset(zone: &str) -> Result<FixedOffset> {
    let zone = zone.trim();
    if zone.eq_ignore_ascii_case("z") || zone.eq_ignore_ascii_case("utc") {
        return Ok(utc_offset());
    }
    let invalid = || Error::Configuration {
        message: format!("unsupported UTC offset '{}'", zone),
    };

    let (sign, rest) = match zone.as_bytes().first() {
        Some(b'+') => (1, &zone[1..]),
        Some(b'-') => (-1, &zone[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
