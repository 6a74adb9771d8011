//! PostgreSQL store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    BookingFilter, BookingPatch, ReviewFilter, ReviewPatch, Store, StoreError, StoreResult,
    TourFilter, TourPatch,
};
use crate::booking::{
    Booking, BookingOwner, BookingStatus, FiatPayment, PaymentMethod, PaymentStatus,
};
use crate::nft::Nft;
use crate::review::Review;
use crate::tour::Tour;

const UNIQUE_VIOLATION: &str = "23505";

/// Store backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    db_pool: PgPool,
}

impl PgStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db_pool
    }
}

fn map_insert_error(err: sqlx::Error, what: String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::UniqueViolation(what)
        }
        _ => StoreError::Database(err),
    }
}

/// Raw booking row, owner columns split out
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    tour_id: Uuid,
    user_id: Option<Uuid>,
    guest_email: Option<String>,
    guest_name: Option<String>,
    booking_date: DateTime<Utc>,
    number_of_participants: i32,
    total_price: i64,
    status: BookingStatus,
    payment_status: PaymentStatus,
    payment_method: PaymentMethod,
    hedera_transaction_id: Option<String>,
    fiat_payment: Option<Json<FiatPayment>>,
    nft_minted: bool,
    nft_serial_number: Option<String>,
    special_requests: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let owner = match (row.user_id, row.guest_email) {
            (Some(user_id), _) => BookingOwner::Registered { user_id },
            (None, Some(email)) => BookingOwner::Guest {
                email,
                name: row.guest_name,
            },
            (None, None) => {
                return Err(StoreError::Corrupt(format!(
                    "booking {} has no owner",
                    row.id
                )))
            }
        };

        Ok(Booking {
            id: row.id,
            tour_id: row.tour_id,
            owner,
            booking_date: row.booking_date,
            number_of_participants: row.number_of_participants,
            total_price: row.total_price,
            status: row.status,
            payment_status: row.payment_status,
            payment_method: row.payment_method,
            hedera_transaction_id: row.hedera_transaction_id,
            fiat_payment: row.fiat_payment.map(|Json(p)| p),
            nft_minted: row.nft_minted,
            nft_serial_number: row.nft_serial_number,
            special_requests: row.special_requests,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> StoreResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

fn push_tour_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TourFilter) {
    if let Some(statuses) = &filter.statuses {
        if statuses.is_empty() {
            qb.push(" AND FALSE");
        } else {
            qb.push(" AND tour_status IN (");
            let mut list = qb.separated(", ");
            for status in statuses {
                list.push_bind(*status);
            }
            list.push_unseparated(")");
        }
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(agency_id) = filter.agency_id {
        qb.push(" AND agency_id = ").push_bind(agency_id);
    }
    if let Some(at) = filter.starts_at_or_before {
        qb.push(" AND start_date <= ").push_bind(at);
    }
    if let Some(at) = filter.starts_after {
        qb.push(" AND start_date > ").push_bind(at);
    }
    if let Some(at) = filter.ends_at_or_after {
        qb.push(" AND end_date >= ").push_bind(at);
    }
    if let Some(at) = filter.ends_before {
        qb.push(" AND end_date < ").push_bind(at);
    }
}

fn push_tour_patch(qb: &mut QueryBuilder<'_, Postgres>, patch: &TourPatch) {
    qb.push("UPDATE tours SET updated_at = ").push_bind(patch.touched_at);
    if let Some(status) = patch.tour_status {
        qb.push(", tour_status = ").push_bind(status);
    }
    if let Some(is_active) = patch.is_active {
        qb.push(", is_active = ").push_bind(is_active);
    }
    if let Some(price) = patch.price {
        qb.push(", price = ").push_bind(price);
    }
    if let Some(max) = patch.max_participants {
        qb.push(", max_participants = ").push_bind(max);
    }
    if let Some(schedule) = patch.schedule {
        qb.push(", start_date = ").push_bind(schedule.start_date);
        qb.push(", end_date = ").push_bind(schedule.end_date);
    }
}

fn push_booking_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &BookingFilter) {
    if let Some(tour_ids) = &filter.tour_ids {
        qb.push(" AND tour_id = ANY(").push_bind(tour_ids.clone()).push(")");
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(email) = &filter.guest_email {
        qb.push(" AND user_id IS NULL AND lower(guest_email) = lower(")
            .push_bind(email.clone())
            .push(")");
    }
    if let Some(statuses) = &filter.statuses {
        if statuses.is_empty() {
            qb.push(" AND FALSE");
        } else {
            qb.push(" AND status IN (");
            let mut list = qb.separated(", ");
            for status in statuses {
                list.push_bind(*status);
            }
            list.push_unseparated(")");
        }
    }
    if let Some(statuses) = &filter.payment_statuses {
        if statuses.is_empty() {
            qb.push(" AND FALSE");
        } else {
            qb.push(" AND payment_status IN (");
            let mut list = qb.separated(", ");
            for status in statuses {
                list.push_bind(*status);
            }
            list.push_unseparated(")");
        }
    }
    if let Some(minted) = filter.nft_minted {
        qb.push(" AND nft_minted = ").push_bind(minted);
    }
    if let Some(at) = filter.booking_date_before {
        qb.push(" AND booking_date < ").push_bind(at);
    }
    if let Some(at) = filter.created_before {
        qb.push(" AND created_at < ").push_bind(at);
    }
}

fn push_booking_patch(qb: &mut QueryBuilder<'_, Postgres>, patch: &BookingPatch) {
    qb.push("UPDATE bookings SET updated_at = ").push_bind(patch.touched_at);
    if let Some(status) = patch.status {
        qb.push(", status = ").push_bind(status);
    }
    if let Some(status) = patch.payment_status {
        qb.push(", payment_status = ").push_bind(status);
    }
    if let Some(method) = patch.payment_method {
        qb.push(", payment_method = ").push_bind(method);
    }
    if let Some(tx) = &patch.hedera_transaction_id {
        qb.push(", hedera_transaction_id = ").push_bind(tx.clone());
    }
    if let Some(payment) = &patch.fiat_payment {
        qb.push(", fiat_payment = ").push_bind(Json(payment.clone()));
    }
    if let Some(minted) = patch.nft_minted {
        qb.push(", nft_minted = ").push_bind(minted);
    }
    if let Some(serial) = &patch.nft_serial_number {
        qb.push(", nft_serial_number = ").push_bind(serial.clone());
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_tour(&self, tour: &Tour) -> StoreResult<Tour> {
        sqlx::query_as::<_, Tour>(
            r#"
            INSERT INTO tours (
                id, agency_id, name, location, price, max_participants,
                start_date, end_date, tour_status, is_active, rating, review_count,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(tour.id)
        .bind(tour.agency_id)
        .bind(&tour.name)
        .bind(&tour.location)
        .bind(tour.price)
        .bind(tour.max_participants)
        .bind(tour.start_date)
        .bind(tour.end_date)
        .bind(tour.tour_status)
        .bind(tour.is_active)
        .bind(tour.rating)
        .bind(tour.review_count)
        .bind(tour.created_at)
        .bind(tour.updated_at)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| map_insert_error(e, format!("tour {}", tour.id)))
    }

    async fn get_tour(&self, id: Uuid) -> StoreResult<Option<Tour>> {
        let tour = sqlx::query_as::<_, Tour>("SELECT * FROM tours WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(tour)
    }

    async fn find_tours(&self, filter: &TourFilter) -> StoreResult<Vec<Tour>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM tours WHERE 1=1");
        push_tour_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC");

        let tours = qb.build_query_as::<Tour>().fetch_all(&self.db_pool).await?;
        Ok(tours)
    }

    async fn update_tour(
        &self,
        id: Uuid,
        guard: &TourFilter,
        patch: &TourPatch,
    ) -> StoreResult<Option<Tour>> {
        let mut qb = QueryBuilder::new("");
        push_tour_patch(&mut qb, patch);
        qb.push(" WHERE id = ").push_bind(id);
        push_tour_filter(&mut qb, guard);
        qb.push(" RETURNING *");

        let tour = qb
            .build_query_as::<Tour>()
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(tour)
    }

    async fn update_tours(
        &self,
        filter: &TourFilter,
        patch: &TourPatch,
    ) -> StoreResult<Vec<Tour>> {
        let mut qb = QueryBuilder::new("");
        push_tour_patch(&mut qb, patch);
        qb.push(" WHERE 1=1");
        push_tour_filter(&mut qb, filter);
        qb.push(" RETURNING *");

        let tours = qb.build_query_as::<Tour>().fetch_all(&self.db_pool).await?;
        Ok(tours)
    }

    async fn refresh_tour_rating(
        &self,
        tour_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Tour>> {
        let tour = sqlx::query_as::<_, Tour>(
            r#"
            UPDATE tours t
            SET rating = agg.rating,
                review_count = agg.review_count,
                updated_at = $2
            FROM (
                SELECT COALESCE(AVG(rating), 0)::DOUBLE PRECISION AS rating,
                       COUNT(*)::INT AS review_count
                FROM reviews
                WHERE tour_id = $1
            ) agg
            WHERE t.id = $1
            RETURNING t.*
            "#,
        )
        .bind(tour_id)
        .bind(at)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(tour)
    }

    async fn insert_booking(&self, booking: &Booking) -> StoreResult<Booking> {
        let (user_id, guest_email, guest_name) = match &booking.owner {
            BookingOwner::Registered { user_id } => (Some(*user_id), None, None),
            BookingOwner::Guest { email, name } => (None, Some(email.clone()), name.clone()),
        };

        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            INSERT INTO bookings (
                id, tour_id, user_id, guest_email, guest_name, booking_date,
                number_of_participants, total_price, status, payment_status,
                payment_method, hedera_transaction_id, fiat_payment, nft_minted,
                nft_serial_number, special_requests, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(booking.id)
        .bind(booking.tour_id)
        .bind(user_id)
        .bind(guest_email)
        .bind(guest_name)
        .bind(booking.booking_date)
        .bind(booking.number_of_participants)
        .bind(booking.total_price)
        .bind(booking.status)
        .bind(booking.payment_status)
        .bind(booking.payment_method)
        .bind(&booking.hedera_transaction_id)
        .bind(booking.fiat_payment.clone().map(Json))
        .bind(booking.nft_minted)
        .bind(&booking.nft_serial_number)
        .bind(&booking.special_requests)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| map_insert_error(e, format!("booking {}", booking.id)))?;

        row.try_into()
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn find_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM bookings WHERE 1=1");
        push_booking_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC");

        let rows = qb
            .build_query_as::<BookingRow>()
            .fetch_all(&self.db_pool)
            .await?;
        into_bookings(rows)
    }

    async fn update_booking(
        &self,
        id: Uuid,
        guard: &BookingFilter,
        patch: &BookingPatch,
    ) -> StoreResult<Option<Booking>> {
        let mut qb = QueryBuilder::new("");
        push_booking_patch(&mut qb, patch);
        qb.push(" WHERE id = ").push_bind(id);
        push_booking_filter(&mut qb, guard);
        qb.push(" RETURNING *");

        let row = qb
            .build_query_as::<BookingRow>()
            .fetch_optional(&self.db_pool)
            .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn update_bookings(
        &self,
        filter: &BookingFilter,
        patch: &BookingPatch,
    ) -> StoreResult<Vec<Booking>> {
        let mut qb = QueryBuilder::new("");
        push_booking_patch(&mut qb, patch);
        qb.push(" WHERE 1=1");
        push_booking_filter(&mut qb, filter);
        qb.push(" RETURNING *");

        let rows = qb
            .build_query_as::<BookingRow>()
            .fetch_all(&self.db_pool)
            .await?;
        into_bookings(rows)
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<Review> {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (
                id, tour_id, user_id, booking_id, rating, comment, images,
                is_verified, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(review.id)
        .bind(review.tour_id)
        .bind(review.user_id)
        .bind(review.booking_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(&review.images)
        .bind(review.is_verified)
        .bind(review.created_at)
        .bind(review.updated_at)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| map_insert_error(e, format!("review for booking {}", review.booking_id)))
    }

    async fn get_review(&self, id: Uuid) -> StoreResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(review)
    }

    async fn find_reviews(&self, filter: &ReviewFilter) -> StoreResult<Vec<Review>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM reviews WHERE 1=1");
        if let Some(tour_id) = filter.tour_id {
            qb.push(" AND tour_id = ").push_bind(tour_id);
        }
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(booking_id) = filter.booking_id {
            qb.push(" AND booking_id = ").push_bind(booking_id);
        }
        qb.push(" ORDER BY created_at DESC");

        let reviews = qb
            .build_query_as::<Review>()
            .fetch_all(&self.db_pool)
            .await?;
        Ok(reviews)
    }

    async fn update_review(&self, id: Uuid, patch: &ReviewPatch) -> StoreResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET rating = COALESCE($2, rating),
                comment = COALESCE($3, comment),
                images = COALESCE($4, images),
                updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.rating)
        .bind(&patch.comment)
        .bind(&patch.images)
        .bind(patch.touched_at)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(review)
    }

    async fn delete_review(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_nft(&self, nft: &Nft) -> StoreResult<Nft> {
        sqlx::query_as::<_, Nft>(
            r#"
            INSERT INTO nfts (
                id, token_id, kind, owner_id, serial_number, metadata,
                related_tour_id, related_booking_id, hedera_transaction_id,
                minted_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(nft.id)
        .bind(&nft.token_id)
        .bind(nft.kind)
        .bind(nft.owner_id)
        .bind(&nft.serial_number)
        .bind(&nft.metadata)
        .bind(nft.related_tour_id)
        .bind(nft.related_booking_id)
        .bind(&nft.hedera_transaction_id)
        .bind(nft.minted_at)
        .bind(nft.created_at)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| map_insert_error(e, format!("token {}", nft.token_id)))
    }

    async fn get_nft(&self, id: Uuid) -> StoreResult<Option<Nft>> {
        let nft = sqlx::query_as::<_, Nft>("SELECT * FROM nfts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(nft)
    }

    async fn find_nfts(&self, owner_id: Uuid) -> StoreResult<Vec<Nft>> {
        let nfts = sqlx::query_as::<_, Nft>(
            "SELECT * FROM nfts WHERE owner_id = $1 ORDER BY minted_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(nfts)
    }
}
