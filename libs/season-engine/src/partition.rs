use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;

use fox_api::Record;

use crate::error::EngineError;

// ════════════════════════════════════════════════════════════════
//  Season
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

    /// Closed month table: 3–5, 6–8, 9–11, then 12/1/2.
    pub fn of_month(month: u32) -> Season {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn name(self, locale: SeasonLocale) -> &'static str {
        match (locale, self) {
            (SeasonLocale::English, Season::Spring) => "Spring",
            (SeasonLocale::English, Season::Summer) => "Summer",
            (SeasonLocale::English, Season::Autumn) => "Autumn",
            (SeasonLocale::English, Season::Winter) => "Winter",
            (SeasonLocale::French, Season::Spring) => "Printemps",
            (SeasonLocale::French, Season::Summer) => "Été",
            (SeasonLocale::French, Season::Autumn) => "Automne",
            (SeasonLocale::French, Season::Winter) => "Hiver",
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name(SeasonLocale::English))
    }
}

/// Language of season names in stored object names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonLocale {
    #[default]
    #[serde(alias = "fr")]
    French,
    #[serde(alias = "en")]
    English,
}

// ════════════════════════════════════════════════════════════════
//  PartitionKey
// ════════════════════════════════════════════════════════════════

/// Season/year bucket. Calendar year, so January and December of the same
/// year share `Winter-{year}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey {
    pub year: i32,
    pub season: Season,
}

impl PartitionKey {
    pub fn new(season: Season, year: i32) -> Self {
        Self { year, season }
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.season, self.year)
    }
}

/// Object names carry a four-digit year; a later date could be written but
/// never listed back.
const MAX_YEAR: i32 = 9999;

fn utc(timestamp: u64) -> Result<DateTime<Utc>, EngineError> {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .filter(|date| (0..=MAX_YEAR).contains(&date.year()))
        .ok_or(EngineError::InvalidTimestamp(timestamp))
}

/// Season of a timestamp, month taken in UTC.
pub fn season_of(timestamp: u64) -> Result<Season, EngineError> {
    Ok(Season::of_month(utc(timestamp)?.month()))
}

/// Month and year both come from the same UTC date; mixing zones would
/// misfile records near season and year boundaries.
pub fn partition_key_of(timestamp: u64) -> Result<PartitionKey, EngineError> {
    let date = utc(timestamp)?;
    Ok(PartitionKey::new(Season::of_month(date.month()), date.year()))
}

/// Group records by partition key, each group sorted ascending by timestamp.
///
/// The sort is stable: records with equal timestamps keep their input order,
/// so the same input always yields the same groups.
pub fn classify(records: Vec<Record>) -> Result<BTreeMap<PartitionKey, Vec<Record>>, EngineError> {
    let mut groups: BTreeMap<PartitionKey, Vec<Record>> = BTreeMap::new();
    for record in records {
        let key = partition_key_of(record.timestamp)?;
        groups.entry(key).or_default().push(record);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|r| r.timestamp);
    }
    Ok(groups)
}

// ════════════════════════════════════════════════════════════════
//  Object naming
// ════════════════════════════════════════════════════════════════

/// Maps partition keys to object names `"{Season}-{YYYY}.{ext}"` and back.
#[derive(Debug, Clone)]
pub struct PartitionNaming {
    locale: SeasonLocale,
    extension: String,
}

impl PartitionNaming {
    pub fn new(locale: SeasonLocale, extension: impl Into<String>) -> Self {
        Self { locale, extension: extension.into() }
    }

    pub fn object_name(&self, key: &PartitionKey) -> String {
        format!("{}-{:04}.{}", key.season.name(self.locale), key.year, self.extension)
    }

    /// Parse an object name. Anything not matching the pattern exactly is `None`.
    pub fn parse(&self, name: &str) -> Option<PartitionKey> {
        let stem = name.strip_suffix(&self.extension)?.strip_suffix('.')?;
        let (season, year) = stem.rsplit_once('-')?;
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let season = Season::ALL.into_iter().find(|s| s.name(self.locale) == season)?;
        Some(PartitionKey::new(season, year.parse().ok()?))
    }
}
