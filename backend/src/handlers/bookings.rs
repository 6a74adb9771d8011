//! Booking HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{resolve_caller, AuthenticatedUser, GuestContact, OptionalUser};
use crate::booking::{
    Booking, BookingService, CreateBookingRequest, ListBookingsQuery, RecordPaymentRequest,
    UpdateBookingStatusRequest,
};
use crate::error::ApiError;
use crate::models::ApiResponse;

/// POST /api/bookings - registered users, or guests paying by card
pub async fn create_booking(
    State(service): State<Arc<BookingService>>,
    user: OptionalUser,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Booking>>), ApiError> {
    let caller = resolve_caller(user, request.email.clone(), request.customer_name.clone())?;
    let booking = service.create_booking(&caller, request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(booking))))
}

/// GET /api/bookings/my
pub async fn my_bookings(
    State(service): State<Arc<BookingService>>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<Booking>>>, ApiError> {
    let bookings = service.my_bookings(&user.caller()).await?;
    Ok(Json(ApiResponse::ok(bookings)))
}

/// GET /api/bookings/:id
pub async fn get_booking(
    State(service): State<Arc<BookingService>>,
    user: OptionalUser,
    Path(booking_id): Path<Uuid>,
    Query(guest): Query<GuestContact>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let caller = resolve_caller(user, guest.email, None)?;
    let booking = service.get_booking(&caller, booking_id).await?;
    Ok(Json(ApiResponse::ok(booking)))
}

/// GET /api/tours/:id/bookings
pub async fn tour_bookings(
    State(service): State<Arc<BookingService>>,
    user: AuthenticatedUser,
    Path(tour_id): Path<Uuid>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<ApiResponse<Vec<Booking>>>, ApiError> {
    let bookings = service.tour_bookings(&user.caller(), tour_id, query).await?;
    Ok(Json(ApiResponse::ok(bookings)))
}

/// PUT /api/bookings/:id/status
pub async fn update_booking_status(
    State(service): State<Arc<BookingService>>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let booking = service
        .update_booking_status(&user.caller(), booking_id, request.status)
        .await?;
    Ok(Json(ApiResponse::ok(booking)))
}

/// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(service): State<Arc<BookingService>>,
    user: OptionalUser,
    Path(booking_id): Path<Uuid>,
    Query(guest): Query<GuestContact>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let caller = resolve_caller(user, guest.email, None)?;
    let booking = service.cancel_booking(&caller, booking_id).await?;
    Ok(Json(ApiResponse::ok(booking)))
}

/// POST /api/bookings/:id/payment - outcome of a Hedera or wallet payment
pub async fn record_booking_payment(
    State(service): State<Arc<BookingService>>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let booking = service
        .record_external_payment(&user.caller(), booking_id, request)
        .await?;
    Ok(Json(ApiResponse::ok(booking)))
}

/// POST /api/bookings/:id/refund
pub async fn refund_booking(
    State(service): State<Arc<BookingService>>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let booking = service.refund_booking(&user.caller(), booking_id).await?;
    Ok(Json(ApiResponse::ok(booking)))
}
