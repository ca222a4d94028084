//! Temporal parsing capability: maps a query string to an optional date range.
//!
//! Out of scope as a full natural-language date resolver; production
//! deployments are expected to supply their own [`TemporalParser`].
//! [`HeuristicTemporalParser`] is a minimal deterministic default so the
//! crate is exercisable end-to-end without an external NLP service.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

/// Capability trait: query text + "now" anchor → optional `[start, end]` range.
pub trait TemporalParser: Send + Sync {
    fn parse(&self, query: &str, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)>;
}

/// Recognizes a small set of relative-time phrases anchored to a caller
/// supplied "now": today/yesterday, this/last week, this/last month,
/// and season names qualified by this/last.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicTemporalParser;

impl HeuristicTemporalParser {
    fn day_bounds(day: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(day.year(), day.month(), day.day(), 0, 0, 0).unwrap();
        (start, start + Duration::days(1))
    }

    fn week_bounds(now: DateTime<Utc>, weeks_back: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let days_since_monday = now.weekday().num_days_from_monday() as i64;
        let this_monday = (now - Duration::days(days_since_monday)).date_naive().and_hms_opt(0, 0, 0).unwrap();
        let this_monday = Utc.from_utc_datetime(&this_monday);
        let start = this_monday - Duration::weeks(weeks_back);
        (start, start + Duration::weeks(1))
    }

    fn month_bounds(now: DateTime<Utc>, months_back: i32) -> (DateTime<Utc>, DateTime<Utc>) {
        let total = now.year() * 12 + (now.month() as i32 - 1) - months_back;
        let year = total.div_euclid(12);
        let month = total.rem_euclid(12) + 1;
        let start = Utc.with_ymd_and_hms(year, month as u32, 1, 0, 0, 0).unwrap();
        let next_total = total + 1;
        let next_year = next_total.div_euclid(12);
        let next_month = next_total.rem_euclid(12) + 1;
        let end = Utc.with_ymd_and_hms(next_year, next_month as u32, 1, 0, 0, 0).unwrap();
        (start, end)
    }

    /// Spring = Mar-May, Summer = Jun-Aug, Autumn = Sep-Nov, Winter = Dec-Feb.
    fn season_bounds(now: DateTime<Utc>, years_back: i32, season: &str) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let year = now.year() - years_back;
        let (start_month, end_month, end_year_offset) = match season {
            "spring" => (3, 6, 0),
            "summer" => (6, 9, 0),
            "autumn" | "fall" => (9, 12, 0),
            "winter" => (12, 3, 1),
            _ => return None,
        };
        let start = Utc.with_ymd_and_hms(year, start_month, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(year + end_year_offset, end_month, 1, 0, 0, 0).unwrap();
        Some((start, end))
    }
}

impl TemporalParser for HeuristicTemporalParser {
    fn parse(&self, query: &str, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let q = query.to_lowercase();

        if q.contains("today") {
            return Some(Self::day_bounds(now));
        }
        if q.contains("yesterday") {
            return Some(Self::day_bounds(now - Duration::days(1)));
        }
        if q.contains("last week") {
            return Some(Self::week_bounds(now, 1));
        }
        if q.contains("this week") {
            return Some(Self::week_bounds(now, 0));
        }
        if q.contains("last month") {
            return Some(Self::month_bounds(now, 1));
        }
        if q.contains("this month") {
            return Some(Self::month_bounds(now, 0));
        }
        for season in ["spring", "summer", "autumn", "fall", "winter"] {
            if q.contains(&format!("last {season}")) {
                return Self::season_bounds(now, 1, season);
            }
            if q.contains(&format!("this {season}")) {
                return Self::season_bounds(now, 0, season);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn no_match_returns_none() {
        let parser = HeuristicTemporalParser;
        assert!(parser.parse("what does Alice do", anchor()).is_none());
    }

    #[test]
    fn today_is_a_single_day() {
        let parser = HeuristicTemporalParser;
        let (start, end) = parser.parse("what happened today?", anchor()).unwrap();
        assert_eq!((end - start).num_hours(), 24);
        assert_eq!(start.day(), 15);
    }

    #[test]
    fn last_spring_resolves_to_prior_year() {
        let parser = HeuristicTemporalParser;
        let (start, end) = parser.parse("what happened last spring?", anchor()).unwrap();
        assert_eq!(start.year(), 2023);
        assert_eq!(start.month(), 3);
        assert_eq!(end.month(), 6);
    }

    #[test]
    fn last_month_precedes_this_month() {
        let parser = HeuristicTemporalParser;
        let (_, last_end) = parser.parse("last month", anchor()).unwrap();
        let (this_start, _) = parser.parse("this month", anchor()).unwrap();
        assert_eq!(last_end, this_start);
    }
}
