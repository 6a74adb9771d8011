//! Payment HTTP handlers

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use super::{resolve_caller, AuthenticatedUser, GuestContact, OptionalUser};
use crate::booking::Booking;
use crate::error::ApiError;
use crate::models::ApiResponse;
use crate::payment::{
    ConfirmPaymentRequest, InitiatePaymentRequest, PaymentIntent, PaymentMethodInfo,
    PaymentRecord, PaymentService,
};

/// POST /api/payments/initiate
pub async fn initiate_payment(
    State(service): State<Arc<PaymentService>>,
    user: OptionalUser,
    Query(guest): Query<GuestContact>,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<Json<ApiResponse<PaymentIntent>>, ApiError> {
    let caller = resolve_caller(user, guest.email, None)?;
    let intent = service.initiate_payment(&caller, request).await?;
    Ok(Json(ApiResponse::ok(intent)))
}

/// POST /api/payments/confirm - charge the card and confirm the booking
pub async fn confirm_payment(
    State(service): State<Arc<PaymentService>>,
    user: OptionalUser,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<ApiResponse<Booking>>, ApiError> {
    let caller = resolve_caller(user, request.email.clone(), None)?;
    let booking = service.confirm_payment(&caller, request).await?;
    Ok(Json(ApiResponse::ok(booking)))
}

/// GET /api/payments/history
pub async fn payment_history(
    State(service): State<Arc<PaymentService>>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<PaymentRecord>>>, ApiError> {
    let records = service.payment_history(&user.caller()).await?;
    Ok(Json(ApiResponse::ok(records)))
}

/// GET /api/payments/methods
pub async fn payment_methods(
    State(service): State<Arc<PaymentService>>,
) -> Json<ApiResponse<Vec<PaymentMethodInfo>>> {
    Json(ApiResponse::ok(service.payment_methods()))
}
