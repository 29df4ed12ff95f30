// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

const WIRE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const WIRE_FORMAT_SUBSECOND: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// A quote as stored server-side. The client never edits one; it only
/// replaces or prepends to the list that holds them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub name: String,
    pub message: String,
    #[serde(with = "wire_time")]
    pub time: PrimitiveDateTime,
}

impl Quote {
    pub fn formatted_time(&self) -> String {
        format_quote_time(self.time)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterBucket {
    #[default]
    All,
    Year,
    Month,
    Week,
}

impl FilterBucket {
    pub const ALL: [Self; 4] = [Self::All, Self::Year, Self::Month, Self::Week];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Year => "year",
            Self::Month => "month",
            Self::Week => "week",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Year => "Last Year",
            Self::Month => "Last Month",
            Self::Week => "Last Week",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "year" => Some(Self::Year),
            "month" => Some(Self::Month),
            "week" => Some(Self::Week),
            _ => None,
        }
    }

    /// Maximum quote age the store keeps for this bucket. A month is four
    /// weeks, matching the store rather than the calendar.
    pub fn max_age(self) -> Option<Duration> {
        match self {
            Self::All => None,
            Self::Year => Some(Duration::days(365)),
            Self::Month => Some(Duration::weeks(4)),
            Self::Week => Some(Duration::weeks(1)),
        }
    }

    pub fn cutoff(self, now: PrimitiveDateTime) -> Option<PrimitiveDateTime> {
        self.max_age().and_then(|age| now.checked_sub(age))
    }

    /// Quotes strictly newer than the cutoff survive the filter.
    pub fn admits(self, quote: &Quote, now: PrimitiveDateTime) -> bool {
        match self.cutoff(now) {
            Some(cutoff) => quote.time > cutoff,
            None => true,
        }
    }
}

impl std::fmt::Display for FilterBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the store's offset-less ISO timestamps (with or without
/// fractional seconds) as well as RFC 3339. Offsets are dropped and the
/// wall-clock time is kept.
pub fn parse_quote_time(raw: &str) -> Result<PrimitiveDateTime, time::error::Parse> {
    let raw = raw.trim();
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(PrimitiveDateTime::new(parsed.date(), parsed.time()));
    }
    PrimitiveDateTime::parse(raw, WIRE_FORMAT_SUBSECOND)
        .or_else(|_| PrimitiveDateTime::parse(raw, WIRE_FORMAT))
}

pub fn format_quote_time(value: PrimitiveDateTime) -> String {
    value
        .format(DISPLAY_FORMAT)
        .unwrap_or_else(|_| value.to_string())
}

pub fn format_wire_time(value: PrimitiveDateTime) -> String {
    value
        .format(WIRE_FORMAT)
        .unwrap_or_else(|_| value.to_string())
}

mod wire_time {
    use super::{Deserialize, Deserializer, PrimitiveDateTime, Serializer, parse_quote_time};

    pub fn serialize<S>(value: &PrimitiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_wire_time(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_quote_time(&raw).map_err(|error| {
            serde::de::Error::custom(format!("invalid quote time {raw:?}: {error}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterBucket, Quote, format_quote_time, parse_quote_time};
    use anyhow::Result;
    use time::macros::datetime;

    fn quote_at(time: time::PrimitiveDateTime) -> Quote {
        Quote {
            name: "Bob".to_owned(),
            message: "hi".to_owned(),
            time,
        }
    }

    #[test]
    fn parses_store_timestamps_without_offset() -> Result<()> {
        assert_eq!(
            parse_quote_time("2024-05-01T12:30:00")?,
            datetime!(2024-05-01 12:30:00)
        );
        assert_eq!(
            parse_quote_time("2024-05-01T12:30:00.250000")?,
            datetime!(2024-05-01 12:30:00.25)
        );
        Ok(())
    }

    #[test]
    fn rfc3339_keeps_wall_clock_time() -> Result<()> {
        assert_eq!(
            parse_quote_time("2024-05-01T12:30:00-07:00")?,
            datetime!(2024-05-01 12:30:00)
        );
        Ok(())
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        assert!(parse_quote_time("yesterday").is_err());
    }

    #[test]
    fn quote_decodes_from_store_json() -> Result<()> {
        let quotes: Vec<Quote> = serde_json::from_str(
            r#"[{"name":"Bob","message":"hi","time":"2024-01-02T03:04:05"}]"#,
        )?;
        assert_eq!(quotes, vec![quote_at(datetime!(2024-01-02 03:04:05))]);
        assert_eq!(quotes[0].formatted_time(), "2024-01-02 03:04:05");

        let encoded = serde_json::to_string(&quotes[0])?;
        assert!(encoded.contains(r#""time":"2024-01-02T03:04:05""#));
        Ok(())
    }

    #[test]
    fn bucket_parse_accepts_wire_values_only() {
        for bucket in FilterBucket::ALL {
            assert_eq!(FilterBucket::parse(bucket.as_str()), Some(bucket));
        }
        assert_eq!(FilterBucket::parse(" Week "), Some(FilterBucket::Week));
        assert_eq!(FilterBucket::parse("last week"), None);
    }

    #[test]
    fn bucket_cutoffs_follow_store_windows() {
        let now = datetime!(2026-03-01 12:00:00);
        assert_eq!(FilterBucket::All.cutoff(now), None);
        assert_eq!(
            FilterBucket::Week.cutoff(now),
            Some(datetime!(2026-02-22 12:00:00))
        );
        assert_eq!(
            FilterBucket::Month.cutoff(now),
            Some(datetime!(2026-02-01 12:00:00))
        );
        assert_eq!(
            FilterBucket::Year.cutoff(now),
            Some(datetime!(2025-03-01 12:00:00))
        );
    }

    #[test]
    fn admits_is_strict_at_the_cutoff() {
        let now = datetime!(2026-03-01 12:00:00);
        let on_cutoff = quote_at(datetime!(2026-02-22 12:00:00));
        let just_after = quote_at(datetime!(2026-02-22 12:00:01));
        assert!(!FilterBucket::Week.admits(&on_cutoff, now));
        assert!(FilterBucket::Week.admits(&just_after, now));
        assert!(FilterBucket::All.admits(&on_cutoff, now));
    }

    #[test]
    fn display_format_is_stable() {
        assert_eq!(
            format_quote_time(datetime!(2025-12-31 23:59:59)),
            "2025-12-31 23:59:59"
        );
    }
}
