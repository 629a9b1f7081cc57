use chrono::NaiveDate;

use crate::model::*;

// ── Availability Checker ─────────────────────────────────────────

/// Outcome of checking a requested range against a space's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeDecision {
    Available,
    /// At least one covered slot is already taken.
    Conflict,
    /// Malformed range, or boundary hours outside the working day.
    Invalid,
    /// A boundary date falls outside the materialized horizon.
    OutOfHorizon,
    /// Starts before today; retroactive bookings are rejected.
    InPast,
}

impl RangeDecision {
    pub fn is_available(self) -> bool {
        matches!(self, RangeDecision::Available)
    }
}

/// The booking clock: calendar dates are local to the site.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Decide whether `range` can be booked on `space` as of `today`.
///
/// Pure decision over a snapshot; never mutates, so it is safe to call
/// speculatively. Walks every covered (date, hour) cell and requires all of
/// them free. Interior-day hours go through `slot_status` like boundary
/// hours, so they are validated against the materialized calendar rather
/// than assumed in bounds.
pub fn check_range(space: &SpaceState, range: &BookingRange, today: NaiveDate) -> RangeDecision {
    if !range.is_well_formed() {
        return RangeDecision::Invalid;
    }
    if range.start_hour < space.hours.begin || range.end_hour > space.hours.end {
        return RangeDecision::Invalid;
    }
    if range.start_date < today {
        return RangeDecision::InPast;
    }
    if !space.contains_date(range.start_date) || !space.contains_date(range.end_date) {
        return RangeDecision::OutOfHorizon;
    }

    for date in range.dates() {
        let Some((from, to)) = range.day_window(date, space.hours) else { continue };
        for hour in from..to {
            match space.slot_status(date, hour) {
                Some(SlotStatus::Free) => {}
                Some(SlotStatus::Occupied(_)) => return RangeDecision::Conflict,
                None => return RangeDecision::Invalid,
            }
        }
    }

    RangeDecision::Available
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    /// "Hall" with hours 8–18 and a 5-day horizon starting 2024-01-01.
    fn hall() -> SpaceState {
        SpaceState::new("Hall".into(), WorkingHours::new(8, 18), jan(1), 5)
    }

    #[test]
    fn open_range_is_available() {
        let rs = hall();
        let range = BookingRange::single_day(jan(1), 9, 11);
        assert_eq!(check_range(&rs, &range, jan(1)), RangeDecision::Available);
    }

    #[test]
    fn overlap_is_a_conflict() {
        let mut rs = hall();
        rs.mark_range(&BookingRange::single_day(jan(1), 9, 11), BookingId(1));
        // 10:00–12:00 collides at hour 10
        let range = BookingRange::single_day(jan(1), 10, 12);
        assert_eq!(check_range(&rs, &range, jan(1)), RangeDecision::Conflict);
    }

    #[test]
    fn adjacent_ranges_do_not_conflict() {
        let mut rs = hall();
        rs.mark_range(&BookingRange::single_day(jan(1), 9, 11), BookingId(1));
        let range = BookingRange::single_day(jan(1), 11, 13);
        assert_eq!(check_range(&rs, &range, jan(1)), RangeDecision::Available);
    }

    #[test]
    fn boundary_hours_respect_working_day() {
        let rs = hall();
        let before_opening = BookingRange::single_day(jan(1), 7, 10);
        assert_eq!(check_range(&rs, &before_opening, jan(1)), RangeDecision::Invalid);
        let past_closing = BookingRange::single_day(jan(1), 16, 19);
        assert_eq!(check_range(&rs, &past_closing, jan(1)), RangeDecision::Invalid);
        let exactly_the_working_day = BookingRange::single_day(jan(1), 8, 18);
        assert_eq!(
            check_range(&rs, &exactly_the_working_day, jan(1)),
            RangeDecision::Available
        );
    }

    #[test]
    fn malformed_ranges_are_invalid() {
        let rs = hall();
        let empty = BookingRange::single_day(jan(1), 9, 9);
        assert_eq!(check_range(&rs, &empty, jan(1)), RangeDecision::Invalid);
        let reversed_dates = BookingRange::new(jan(2), 9, jan(1), 11);
        assert_eq!(check_range(&rs, &reversed_dates, jan(1)), RangeDecision::Invalid);
        let reversed_hours = BookingRange::single_day(jan(1), 11, 9);
        assert_eq!(check_range(&rs, &reversed_hours, jan(1)), RangeDecision::Invalid);
    }

    #[test]
    fn past_start_date_rejected() {
        let rs = hall();
        let range = BookingRange::single_day(jan(1), 9, 11);
        assert_eq!(check_range(&rs, &range, jan(2)), RangeDecision::InPast);
    }

    #[test]
    fn dates_outside_horizon_rejected() {
        let rs = hall();
        // Horizon covers Jan 1–5; Jan 6 is out.
        let beyond = BookingRange::single_day(jan(6), 9, 11);
        assert_eq!(check_range(&rs, &beyond, jan(1)), RangeDecision::OutOfHorizon);
        let straddling = BookingRange::new(jan(5), 9, jan(6), 11);
        assert_eq!(check_range(&rs, &straddling, jan(1)), RangeDecision::OutOfHorizon);
    }

    #[test]
    fn past_takes_precedence_over_horizon() {
        // A space whose horizon has entirely elapsed: the range is both in
        // the past and in the horizon, and the past check wins.
        let rs = hall();
        let range = BookingRange::single_day(jan(2), 9, 11);
        let later = jan(1) + Days::new(30);
        assert_eq!(check_range(&rs, &range, later), RangeDecision::InPast);
    }

    #[test]
    fn multi_day_range_covers_interior_days() {
        let mut rs = hall();
        // Book all of Jan 2; a Jan 1 → Jan 3 range must then conflict.
        rs.mark_range(&BookingRange::single_day(jan(2), 8, 18), BookingId(1));
        let range = BookingRange::new(jan(1), 16, jan(3), 10);
        assert_eq!(check_range(&rs, &range, jan(1)), RangeDecision::Conflict);
    }

    #[test]
    fn multi_day_range_available_when_clear() {
        let rs = hall();
        let range = BookingRange::new(jan(1), 16, jan(3), 10);
        assert_eq!(check_range(&rs, &range, jan(1)), RangeDecision::Available);
    }

    #[test]
    fn multi_day_checkout_at_opening_skips_last_day() {
        let mut rs = hall();
        // Ends at 08:00 on Jan 2 — half-open, so Jan 2 contributes nothing.
        rs.mark_range(&BookingRange::single_day(jan(2), 8, 18), BookingId(1));
        let range = BookingRange::new(jan(1), 9, jan(2), 8);
        assert_eq!(check_range(&rs, &range, jan(1)), RangeDecision::Available);
    }

    #[test]
    fn decision_is_stable_without_mutation() {
        let mut rs = hall();
        rs.mark_range(&BookingRange::single_day(jan(1), 9, 11), BookingId(1));
        let range = BookingRange::single_day(jan(1), 10, 12);
        let first = check_range(&rs, &range, jan(1));
        let second = check_range(&rs, &range, jan(1));
        assert_eq!(first, second);
    }
}
