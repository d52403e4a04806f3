//! Temporal alignment scoring between a publication year and a grant window.

use chrono::{Datelike, Days, NaiveDate};

/// Grace period after a grant's nominal end during which a publication is
/// still a plausible outcome, in days.
const GRACE_DAYS: u64 = 730;

/// Score how well a publication year fits a grant's active window.
///
/// Returns a value in `[0, 1]`:
///
/// - 0.0 when the year falls outside `[start year, grace end year]`; a zero
///   score excludes the pairing from candidacy entirely;
/// - 1.0 when the year falls inside the grant's active period;
/// - a linear decay of 0.25 per year, floored at 0.5, for years in the
///   grace window after the nominal end.
///
/// The grace end year is the year of `end_date + 730 days`, not
/// `end year + 2`; the two diverge around leap years and year boundaries
/// (e.g. an end date of 2020-01-01 closes the grace window with 2021).
pub fn temporal_score(publication_year: i32, start_date: NaiveDate, end_date: NaiveDate) -> f64 {
    let start_year = start_date.year();
    let grace_end_year = match end_date.checked_add_days(Days::new(GRACE_DAYS)) {
        Some(grace_end) => grace_end.year(),
        // Only reachable at the edge of chrono's representable range.
        None => end_date.year(),
    };

    if publication_year < start_year || publication_year > grace_end_year {
        return 0.0;
    }

    if start_year <= publication_year && publication_year <= end_date.year() {
        1.0
    } else if end_date.year() < publication_year && publication_year <= grace_end_year {
        let years_after = f64::from(publication_year - end_date.year());
        (1.0 - years_after * 0.25).max(0.5)
    } else {
        // Inputs violating start <= end land here.
        0.5
    }
}
