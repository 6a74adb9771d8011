//! Reconciliation tick behaviour over a mixed store

mod common;

use chrono::Duration;

use beyondthemap_server::booking::{Booking, BookingStatus};
use beyondthemap_server::scheduler::{Duty, DutyOutcome};
use beyondthemap_server::store::{BookingFilter, Store, TourFilter, TourPatch};
use beyondthemap_server::tour::{resolve_status, Tour, TourSchedule, TourStatus};

use common::*;

/// Tours and bookings in every state the tick has to look at
async fn seed(h: &Harness) {
    let agency = agency();
    let traveller = traveller();

    let finishing = h.tour(&agency, Duration::hours(1), Duration::hours(2)).await;
    h.paid_booking(&traveller, &finishing).await;
    h.booking(&traveller, finishing.id, finishing.start_date.unwrap())
        .await;

    let starting = h.tour(&agency, Duration::hours(5), Duration::days(2)).await;
    h.paid_booking(&traveller, &starting).await;

    let later = h.tour(&agency, Duration::days(20), Duration::hours(3)).await;
    h.paid_booking(&traveller, &later).await;

    let cancelled = h.tour(&agency, Duration::hours(2), Duration::hours(1)).await;
    h.state
        .tour_service
        .cancel_tour(&agency, cancelled.id)
        .await
        .unwrap();
}

async fn snapshot(h: &Harness) -> (Vec<Tour>, Vec<Booking>) {
    let mut tours = h.store.find_tours(&TourFilter::new()).await.unwrap();
    tours.sort_by_key(|t| t.id);
    let mut bookings = h.store.find_bookings(&BookingFilter::new()).await.unwrap();
    bookings.sort_by_key(|b| b.id);
    (tours, bookings)
}

#[tokio::test]
async fn test_two_ticks_equal_one() {
    let h = Harness::new();
    seed(&h).await;
    h.clock.advance(Duration::hours(30));

    let first = h.reconciler.run_reconciliation_tick().await;
    assert!(first.changed() > 0);
    let (tours, bookings) = snapshot(&h).await;

    let second = h.reconciler.run_reconciliation_tick().await;
    assert_eq!(second.changed(), 0);
    assert_eq!(second.tour_phases, DutyOutcome::Done { changed: 0 });
    assert_eq!(second.booking_completion, DutyOutcome::Done { changed: 0 });
    assert_eq!(second.stale_booking_expiry, DutyOutcome::Done { changed: 0 });

    assert_eq!(snapshot(&h).await, (tours, bookings));
}

#[tokio::test]
async fn test_tick_leaves_every_tour_in_its_implied_phase() {
    let h = Harness::new();
    seed(&h).await;

    for hours in [0, 2, 6, 30, 24 * 30] {
        h.clock.set(start_time() + Duration::hours(hours));
        h.reconciler.run_reconciliation_tick().await;

        for tour in h.store.find_tours(&TourFilter::new()).await.unwrap() {
            assert_eq!(
                tour.tour_status,
                resolve_status(&tour, h.now()),
                "tour {} out of phase at +{}h",
                tour.id,
                hours
            );
        }
    }

    let cancelled = h
        .store
        .find_tours(&TourFilter::new().status(TourStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
}

#[tokio::test]
async fn test_tick_outcomes_after_a_day_and_a_half() {
    let h = Harness::new();
    seed(&h).await;
    h.clock.advance(Duration::hours(30));

    let report = h.reconciler.run_reconciliation_tick().await;
    // finishing -> completed with its paid booking, starting -> ongoing
    assert_eq!(report.tour_phases, DutyOutcome::Done { changed: 3 });
    // starting's booking is dated a quarter hour into the tour
    assert_eq!(report.booking_completion, DutyOutcome::Done { changed: 1 });
    // the unpaid booking on the finished tour
    assert_eq!(report.stale_booking_expiry, DutyOutcome::Done { changed: 1 });

    let completed = h
        .store
        .find_bookings(&BookingFilter::new().status(BookingStatus::Completed))
        .await
        .unwrap();
    assert_eq!(completed.len(), 2);
    let confirmed = h
        .store
        .find_bookings(&BookingFilter::new().status(BookingStatus::Confirmed))
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);
}

#[tokio::test]
async fn test_rescheduled_tour_goes_back_to_upcoming() {
    let h = Harness::new();
    let tour = h.tour(&agency(), Duration::hours(1), Duration::hours(1)).await;
    h.clock.advance(Duration::hours(3));
    h.reconciler.run_duty(Duty::TourPhases).await;
    assert_eq!(h.stored_tour(tour.id).await.tour_status, TourStatus::Completed);

    let schedule = TourSchedule::from_parts(
        Some(h.now() + Duration::days(7)),
        Some(h.now() + Duration::days(8)),
    )
    .unwrap()
    .unwrap();
    h.store
        .update_tour(
            tour.id,
            &TourFilter::new(),
            &TourPatch::at(h.now()).schedule(schedule),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        h.reconciler.run_duty(Duty::TourPhases).await,
        DutyOutcome::Done { changed: 1 }
    );
    assert_eq!(h.stored_tour(tour.id).await.tour_status, TourStatus::Upcoming);
}

#[tokio::test]
async fn test_undated_tour_keeps_its_stored_phase() {
    let h = Harness::new();
    let tour = h
        .state
        .tour_service
        .create_tour(
            &agency(),
            beyondthemap_server::tour::CreateTourRequest {
                name: "Medina food walk".to_string(),
                location: "Fes".to_string(),
                price: 120,
                max_participants: 12,
                start_date: None,
                end_date: None,
            },
        )
        .await
        .unwrap();

    h.clock.advance(Duration::days(400));
    h.reconciler.run_reconciliation_tick().await;
    assert_eq!(h.stored_tour(tour.id).await.tour_status, TourStatus::Upcoming);
    let details = h.state.tour_service.get_tour(tour.id).await.unwrap();
    assert_eq!(details.current_status, TourStatus::Upcoming);
    assert!(details.time_until_start.is_none());
}

#[tokio::test]
async fn test_failing_duty_does_not_stop_the_others() {
    let (h, store) = meddled_harness();
    let agency = agency();
    let traveller = traveller();

    let running = h.tour(&agency, Duration::hours(1), Duration::days(3)).await;
    let paid = h.paid_booking(&traveller, &running).await;
    let later = h.tour(&agency, Duration::days(10), Duration::hours(4)).await;
    let unpaid = h.booking(&traveller, later.id, later.start_date.unwrap()).await;

    h.clock.advance(Duration::hours(26));
    store.fail_tour_updates();
    let report = h.reconciler.run_reconciliation_tick().await;

    assert!(matches!(report.tour_phases, DutyOutcome::Failed(_)));
    assert_eq!(report.booking_completion, DutyOutcome::Done { changed: 1 });
    assert_eq!(report.stale_booking_expiry, DutyOutcome::Done { changed: 1 });

    assert_eq!(h.stored_booking(paid.id).await.status, BookingStatus::Completed);
    assert_eq!(h.stored_booking(unpaid.id).await.status, BookingStatus::Cancelled);
    assert_eq!(h.stored_tour(running.id).await.tour_status, TourStatus::Upcoming);
}
