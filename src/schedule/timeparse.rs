// src/schedule/timeparse.rs
//! Kickoff time extraction from scraped markup.
//!
//! Scraped text is full of unrelated numbers that coincidentally match a
//! time pattern (scores, channel numbers, ad copy). Anything outside the
//! plausible kickoff band is discarded as unparsed rather than trusted.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

/// Plausible local kickoff hours, inclusive.
#[derive(Debug, Clone, Copy)]
pub struct KickoffBand {
    pub min_hour: u32,
    pub max_hour: u32,
    pub tz_offset_hours: i32,
}

impl KickoffBand {
    pub fn new(min_hour: u32, max_hour: u32, tz_offset_hours: i32) -> Self {
        Self {
            min_hour,
            max_hour,
            tz_offset_hours,
        }
    }
}

fn re_time() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2}):(\d{2})\s*(AM|PM)\b").unwrap())
}

fn re_date() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+(\d{1,2})\b")
            .unwrap()
    })
}

fn month_number(abbr: &str) -> Option<u32> {
    let m = match &abbr.to_ascii_lowercase()[..3] {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(m)
}

/// Parse a "Nov 3 ... 7:30 PM" style fragment into a UTC timestamp.
///
/// `reference` anchors the year: a month/day earlier than the reference date
/// rolls into the next year (late-December scrape of a January game).
/// Returns `None` when no date or no plausible time is present.
pub fn parse_kickoff(text: &str, reference: DateTime<Utc>, band: KickoffBand) -> Option<DateTime<Utc>> {
    let date_caps = re_date().captures(text)?;
    let month = month_number(date_caps.get(1)?.as_str())?;
    let day: u32 = date_caps.get(2)?.as_str().parse().ok()?;

    let time_caps = re_time().captures(text)?;
    let mut hour: u32 = time_caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = time_caps.get(2)?.as_str().parse().ok()?;
    let meridiem = time_caps.get(3)?.as_str().to_ascii_uppercase();
    if hour > 12 || minute > 59 {
        return None;
    }
    if meridiem == "PM" && hour != 12 {
        hour += 12;
    }
    if meridiem == "AM" && hour == 12 {
        hour = 0;
    }

    // Plausibility gate: local hour must fall in the kickoff band.
    if hour < band.min_hour || hour > band.max_hour {
        return None;
    }

    let tz = FixedOffset::east_opt(band.tz_offset_hours * 3600)?;
    let mut year = reference.year();
    let mut date = NaiveDate::from_ymd_opt(year, month, day)?;
    if date < reference.date_naive().pred_opt()? {
        year += 1;
        date = NaiveDate::from_ymd_opt(year, month, day)?;
    }

    let local = tz
        .from_local_datetime(&date.and_hms_opt(hour, minute, 0)?)
        .single()?;
    Some(local.with_timezone(&Utc))
}
