use chrono::NaiveDate;

use crate::error::LeaveError;
use crate::model::leave_request::LeaveDuration;

/// Number of calendar days in `[start, end]`, both ends included.
///
/// `start > end` is a caller error and is rejected rather than clamped.
pub fn inclusive_day_count(start: NaiveDate, end: NaiveDate) -> Result<i64, LeaveError> {
    if start > end {
        return Err(LeaveError::validation(format!(
            "start_date {start} cannot be after end_date {end}"
        )));
    }
    Ok((end - start).num_days() + 1)
}

/// Days charged for a request: the inclusive span, halved for half-day durations.
pub fn requested_days(
    start: NaiveDate,
    end: NaiveDate,
    duration: LeaveDuration,
) -> Result<f64, LeaveError> {
    let days = inclusive_day_count(start, end)? as f64;
    Ok(if duration.is_half_day() { days * 0.5 } else { days })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_day_counts_as_one() {
        let d = date(2024, 2, 29);
        assert_eq!(inclusive_day_count(d, d).unwrap(), 1);
    }

    #[test]
    fn counts_both_ends() {
        assert_eq!(inclusive_day_count(date(2024, 1, 1), date(2024, 1, 5)).unwrap(), 5);
        assert_eq!(inclusive_day_count(date(2023, 12, 30), date(2024, 1, 2)).unwrap(), 4);
    }

    #[test]
    fn rejects_reversed_range() {
        let err = inclusive_day_count(date(2024, 1, 5), date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, LeaveError::Validation { .. }));
    }

    #[test]
    fn half_days_are_halved() {
        let (s, e) = (date(2024, 3, 1), date(2024, 3, 5));
        assert_eq!(requested_days(s, e, LeaveDuration::FullDay).unwrap(), 5.0);
        assert_eq!(requested_days(s, e, LeaveDuration::HalfDayMorning).unwrap(), 2.5);
        assert_eq!(requested_days(s, s, LeaveDuration::HalfDayAfternoon).unwrap(), 0.5);
    }
}
