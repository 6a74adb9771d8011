//! Tour phase derivation from the tour window

use chrono::{DateTime, Utc};

use super::{Tour, TourStatus};

/// Phase implied by `now` relative to `[start, end]`
///
/// Both bounds are inclusive for `ongoing`.
pub fn phase_for_window(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> TourStatus {
    if now < start {
        TourStatus::Upcoming
    } else if now <= end {
        TourStatus::Ongoing
    } else {
        TourStatus::Completed
    }
}

/// Current phase of a tour
///
/// Cancelled tours stay cancelled, and a tour without both dates keeps
/// whatever status was stored for it.
pub fn resolve_status(tour: &Tour, now: DateTime<Utc>) -> TourStatus {
    if tour.tour_status == TourStatus::Cancelled {
        return TourStatus::Cancelled;
    }

    match tour.window() {
        Some((start, end)) => phase_for_window(start, end, now),
        None => tour.tour_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn tour(status: TourStatus, window: Option<(DateTime<Utc>, DateTime<Utc>)>) -> Tour {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Tour {
            id: Uuid::new_v4(),
            agency_id: Uuid::new_v4(),
            name: "Atlas trek".to_string(),
            location: "Imlil".to_string(),
            price: 100,
            max_participants: 10,
            start_date: window.map(|(s, _)| s),
            end_date: window.map(|(_, e)| e),
            tour_status: status,
            is_active: true,
            rating: 0.0,
            review_count: 0,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_phase_boundaries_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let end = start + Duration::hours(1);

        assert_eq!(
            phase_for_window(start, end, start - Duration::seconds(1)),
            TourStatus::Upcoming
        );
        assert_eq!(phase_for_window(start, end, start), TourStatus::Ongoing);
        assert_eq!(phase_for_window(start, end, end), TourStatus::Ongoing);
        assert_eq!(
            phase_for_window(start, end, end + Duration::seconds(1)),
            TourStatus::Completed
        );
    }

    #[test]
    fn test_cancelled_is_sticky() {
        let now = Utc::now();
        let t = tour(
            TourStatus::Cancelled,
            Some((now - Duration::hours(2), now + Duration::hours(2))),
        );
        assert_eq!(resolve_status(&t, now), TourStatus::Cancelled);
    }

    #[test]
    fn test_undated_tour_keeps_stored_status() {
        let t = tour(TourStatus::Ongoing, None);
        assert_eq!(resolve_status(&t, Utc::now()), TourStatus::Ongoing);
    }

    #[test]
    fn test_scenario_window_resolution() {
        let t0 = Utc.with_ymd_and_hms(2025, 5, 10, 8, 0, 0).unwrap();
        let t = tour(
            TourStatus::Upcoming,
            Some((t0 + Duration::hours(1), t0 + Duration::hours(2))),
        );

        assert_eq!(resolve_status(&t, t0), TourStatus::Upcoming);
        assert_eq!(
            resolve_status(&t, t0 + Duration::minutes(90)),
            TourStatus::Ongoing
        );
        assert_eq!(
            resolve_status(&t, t0 + Duration::hours(3)),
            TourStatus::Completed
        );
    }

    #[test]
    fn test_completed_tour_moved_back_into_future_resolves_upcoming() {
        let now = Utc::now();
        let t = tour(
            TourStatus::Completed,
            Some((now + Duration::days(1), now + Duration::days(2))),
        );
        assert_eq!(resolve_status(&t, now), TourStatus::Upcoming);
    }
}
