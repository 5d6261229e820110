/// Season window resolution
///
/// Decides whether an acquisition season is active for a given day, resolving
/// the concrete years the season spans. Seasons may wrap the new year
/// (e.g. November through February); a grace period keeps a site eligible
/// for a few months after the season closes.
use crate::domain::{Season, SeasonSpan};
use crate::errors::{TrackerError, TrackerResult};
use chrono::{Datelike, NaiveDate};

/// Checks whether `today` falls inside `season` extended by `grace_months`.
///
/// Returns `Ok(Some(span))` with the resolved start/end years when in season,
/// `Ok(None)` when out of season (expected, non-fatal), and
/// `InvalidSeasonBounds` for month/day values outside their calendar ranges.
///
/// Pure and deterministic; callers inject `today`.
pub fn check_season(
    season: &Season,
    grace_months: u32,
    today: NaiveDate,
) -> TrackerResult<Option<SeasonSpan>> {
    validate_bounds(season)?;

    let mut start_year = today.year();
    let mut end_year = today.year();

    // A season starting in a later month than it ends wraps the new year.
    if season.start_month > season.end_month {
        if today.month() >= season.start_month {
            end_year += 1;
        } else {
            start_year -= 1;
        }
    }

    let start = clamped_date(start_year, season.start_month, season.start_day);
    let (tail_year, tail_month) = add_months(end_year, season.end_month, grace_months);
    let end = clamped_date(tail_year, tail_month, season.end_day);

    if today < start || today > end {
        return Ok(None);
    }
    Ok(Some(SeasonSpan {
        start_year,
        end_year,
    }))
}

fn validate_bounds(season: &Season) -> TrackerResult<()> {
    let month_ok = |m| (1..=12).contains(&m);
    let day_ok = |d| (1..=31).contains(&d);
    if !month_ok(season.start_month)
        || !month_ok(season.end_month)
        || !day_ok(season.start_day)
        || !day_ok(season.end_day)
    {
        return Err(TrackerError::InvalidSeasonBounds(format!(
            "{:02}{:02} -> {:02}{:02}",
            season.start_month, season.start_day, season.end_month, season.end_day
        )));
    }
    Ok(())
}

/// Adds whole months to a (year, month) pair, carrying into the year.
fn add_months(year: i32, month: u32, months: u32) -> (i32, u32) {
    let total = month + months - 1;
    (year + (total / 12) as i32, total % 12 + 1)
}

/// Builds a date, clamping the day to the last day of the month when the
/// configured day does not exist there (Feb 31 and the like).
fn clamped_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| {
        let (next_year, next_month) = add_months(year, month, 1);
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .expect("month already normalized")
            .pred_opt()
            .expect("date has a predecessor")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn season(start_month: u32, start_day: u32, end_month: u32, end_day: u32) -> Season {
        Season {
            start_month,
            start_day,
            end_month,
            end_day,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_plain_season_inside() {
        let span = check_season(&season(6, 1, 8, 31), 0, day(2024, 7, 15))
            .unwrap()
            .unwrap();
        assert_eq!(
            span,
            SeasonSpan {
                start_year: 2024,
                end_year: 2024
            }
        );
    }

    #[test]
    fn test_plain_season_before_start() {
        assert!(check_season(&season(6, 1, 8, 31), 0, day(2024, 5, 31))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_plain_season_boundaries() {
        let s = season(6, 1, 8, 31);
        assert!(check_season(&s, 0, day(2024, 6, 1)).unwrap().is_some());
        assert!(check_season(&s, 0, day(2024, 8, 31)).unwrap().is_some());
        assert!(check_season(&s, 0, day(2024, 9, 1)).unwrap().is_none());
    }

    #[test]
    fn test_grace_extends_season_tail() {
        // Summer season June 1 - Aug 31 with two grace months keeps the site
        // eligible on Sep 20 of the same year.
        let span = check_season(&season(6, 1, 8, 31), 2, day(2024, 9, 20))
            .unwrap()
            .unwrap();
        assert_eq!(
            span,
            SeasonSpan {
                start_year: 2024,
                end_year: 2024
            }
        );
        // But not past the grace tail (Oct 31 is the last eligible day).
        assert!(check_season(&season(6, 1, 8, 31), 2, day(2024, 11, 1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_wraparound_before_new_year() {
        // Nov 1 - Feb 28, seen from Dec 15: the end slides into next year.
        let span = check_season(&season(11, 1, 2, 28), 0, day(2024, 12, 15))
            .unwrap()
            .unwrap();
        assert_eq!(
            span,
            SeasonSpan {
                start_year: 2024,
                end_year: 2025
            }
        );
    }

    #[test]
    fn test_wraparound_after_new_year() {
        // Same season seen from Jan 15: the start slides back a year.
        let span = check_season(&season(11, 1, 2, 28), 0, day(2025, 1, 15))
            .unwrap()
            .unwrap();
        assert_eq!(
            span,
            SeasonSpan {
                start_year: 2024,
                end_year: 2025
            }
        );
    }

    #[test]
    fn test_wraparound_out_of_season() {
        assert!(check_season(&season(11, 1, 2, 28), 0, day(2024, 6, 15))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_grace_overflows_into_next_year() {
        // Season ends in November; two grace months land the tail in January
        // of the following year.
        let s = season(3, 1, 11, 30);
        assert!(check_season(&s, 2, day(2024, 12, 15)).unwrap().is_some());
        // Relative to the following year the same day is pre-season: the
        // span always anchors on the current year for non-wrapping seasons.
        assert!(check_season(&s, 2, day(2025, 1, 30)).unwrap().is_none());
    }

    #[test]
    fn test_grace_day_clamped_to_month_end() {
        // Dec 1 - Jan 31 with one grace month: the tail targets Feb 31,
        // which clamps to Feb 28.
        let s = season(12, 1, 1, 31);
        assert!(check_season(&s, 1, day(2027, 2, 28)).unwrap().is_some());
        assert!(check_season(&s, 1, day(2027, 3, 1)).unwrap().is_none());
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        assert!(matches!(
            check_season(&season(13, 1, 8, 31), 0, day(2024, 7, 1)),
            Err(TrackerError::InvalidSeasonBounds(_))
        ));
        assert!(matches!(
            check_season(&season(6, 0, 8, 31), 0, day(2024, 7, 1)),
            Err(TrackerError::InvalidSeasonBounds(_))
        ));
        assert!(matches!(
            check_season(&season(6, 1, 8, 32), 0, day(2024, 7, 1)),
            Err(TrackerError::InvalidSeasonBounds(_))
        ));
    }

    #[test]
    fn test_add_months() {
        assert_eq!(add_months(2024, 8, 2), (2024, 10));
        assert_eq!(add_months(2024, 11, 2), (2025, 1));
        assert_eq!(add_months(2024, 12, 0), (2024, 12));
        assert_eq!(add_months(2024, 12, 13), (2026, 1));
    }
}
