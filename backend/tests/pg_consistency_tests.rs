//! Consistency tests against a real PostgreSQL database

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use sqlx::PgPool;
    use uuid::Uuid;

    use beyondthemap_server::booking::{
        Booking, BookingOwner, BookingStatus, PaymentMethod, PaymentStatus,
    };
    use beyondthemap_server::db;
    use beyondthemap_server::review::Review;
    use beyondthemap_server::store::{
        BookingFilter, BookingPatch, PgStore, Store, StoreError, TourFilter, TourPatch,
    };
    use beyondthemap_server::tour::{Tour, TourStatus};

    /// Helper to create a migrated test database pool
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/beyondthemap_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        db::run_migrations(&pool)
            .await
            .expect("Failed to migrate test database");
        pool
    }

    fn tour(starts_in: Duration) -> Tour {
        let now = Utc::now();
        Tour {
            id: Uuid::new_v4(),
            agency_id: Uuid::new_v4(),
            name: "Chefchaouen day trip".to_string(),
            location: "Chefchaouen".to_string(),
            price: 300,
            max_participants: 15,
            start_date: Some(now + starts_in),
            end_date: Some(now + starts_in + Duration::hours(8)),
            tour_status: TourStatus::Upcoming,
            is_active: true,
            rating: 0.0,
            review_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn booking(tour: &Tour) -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            tour_id: tour.id,
            owner: BookingOwner::Registered {
                user_id: Uuid::new_v4(),
            },
            booking_date: tour.start_date.unwrap_or(now),
            number_of_participants: 2,
            total_price: tour.price * 2,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: PaymentMethod::Fiat,
            hedera_transaction_id: None,
            fiat_payment: None,
            nft_minted: false,
            nft_serial_number: None,
            special_requests: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_guarded_update_only_applies_once() {
        let store = PgStore::new(setup_test_db().await);
        let tour = store.insert_tour(&tour(Duration::days(2))).await.unwrap();
        let booking = store.insert_booking(&booking(&tour)).await.unwrap();

        let guard = BookingFilter::current_state_of(&booking);
        let patch = BookingPatch::at(Utc::now())
            .status(BookingStatus::Confirmed)
            .payment_status(PaymentStatus::Paid);

        let first = store.update_booking(booking.id, &guard, &patch).await.unwrap();
        let second = store.update_booking(booking.id, &guard, &patch).await.unwrap();

        let confirmed = first.expect("first guarded write should apply");
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.payment_status, PaymentStatus::Paid);
        assert!(second.is_none(), "stale guard must not match");
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_set_update_returns_changed_tours() {
        let store = PgStore::new(setup_test_db().await);
        let now = Utc::now();
        let running = store.insert_tour(&tour(Duration::hours(-1))).await.unwrap();

        let filter = TourFilter::new()
            .status(TourStatus::Upcoming)
            .starts_at_or_before(now)
            .ends_at_or_after(now);
        let patch = TourPatch::at(now).tour_status(TourStatus::Ongoing);

        let changed = store.update_tours(&filter, &patch).await.unwrap();
        assert!(changed.iter().any(|t| t.id == running.id));

        let again = store.update_tours(&filter, &patch).await.unwrap();
        assert!(again.iter().all(|t| t.id != running.id));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_rating_refresh_and_duplicate_review() {
        let store = PgStore::new(setup_test_db().await);
        let tour = store.insert_tour(&tour(Duration::days(-3))).await.unwrap();
        let booking = store.insert_booking(&booking(&tour)).await.unwrap();
        let user_id = booking.owner.user_id().unwrap();

        let now = Utc::now();
        let review = Review {
            id: Uuid::new_v4(),
            tour_id: tour.id,
            user_id,
            booking_id: booking.id,
            rating: 4,
            comment: "Blue streets everywhere".to_string(),
            images: Vec::new(),
            is_verified: true,
            created_at: now,
            updated_at: now,
        };
        store.insert_review(&review).await.unwrap();

        let duplicate = Review {
            id: Uuid::new_v4(),
            ..review.clone()
        };
        let err = store.insert_review(&duplicate).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));

        let rated = store.refresh_tour_rating(tour.id, now).await.unwrap().unwrap();
        assert_eq!(rated.rating, 4.0);
        assert_eq!(rated.review_count, 1);

        assert!(store.delete_review(review.id).await.unwrap());
        let reset = store.refresh_tour_rating(tour.id, now).await.unwrap().unwrap();
        assert_eq!(reset.rating, 0.0);
        assert_eq!(reset.review_count, 0);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_paid_booking_cannot_be_pending() {
        let store = PgStore::new(setup_test_db().await);
        let tour = store.insert_tour(&tour(Duration::days(2))).await.unwrap();
        let booking = store.insert_booking(&booking(&tour)).await.unwrap();

        let patch = BookingPatch::at(Utc::now()).payment_status(PaymentStatus::Paid);
        let result = store
            .update_booking(booking.id, &BookingFilter::new(), &patch)
            .await;
        assert!(result.is_err(), "schema must reject paid while pending");

        let stored: Option<Booking> = store.get_booking(booking.id).await.unwrap();
        assert_eq!(stored.unwrap().payment_status, PaymentStatus::Pending);
    }
}
