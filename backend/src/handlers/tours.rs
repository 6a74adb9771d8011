//! Tour HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::ApiResponse;
use crate::tour::{
    CreateTourRequest, ListToursQuery, Tour, TourDetails, TourService, UpdateTourRequest,
};

/// GET /api/tours
pub async fn list_tours(
    State(service): State<Arc<TourService>>,
    Query(query): Query<ListToursQuery>,
) -> Result<Json<ApiResponse<Vec<TourDetails>>>, ApiError> {
    let tours = service.list_tours(query).await?;
    Ok(Json(ApiResponse::ok(tours)))
}

/// GET /api/tours/:id
pub async fn get_tour(
    State(service): State<Arc<TourService>>,
    Path(tour_id): Path<Uuid>,
) -> Result<Json<ApiResponse<TourDetails>>, ApiError> {
    let tour = service.get_tour(tour_id).await?;
    Ok(Json(ApiResponse::ok(tour)))
}

/// POST /api/tours
pub async fn create_tour(
    State(service): State<Arc<TourService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateTourRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Tour>>), ApiError> {
    request.validate()?;
    let tour = service.create_tour(&user.caller(), request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            success: true,
            data: Some(tour),
            error: None,
        }),
    ))
}

/// PUT /api/tours/:id
pub async fn update_tour(
    State(service): State<Arc<TourService>>,
    user: AuthenticatedUser,
    Path(tour_id): Path<Uuid>,
    Json(request): Json<UpdateTourRequest>,
) -> Result<Json<ApiResponse<Tour>>, ApiError> {
    request.validate()?;
    let tour = service.update_tour(&user.caller(), tour_id, request).await?;
    Ok(Json(ApiResponse::ok(tour)))
}

/// POST /api/tours/:id/cancel
pub async fn cancel_tour(
    State(service): State<Arc<TourService>>,
    user: AuthenticatedUser,
    Path(tour_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Tour>>, ApiError> {
    let tour = service.cancel_tour(&user.caller(), tour_id).await?;
    Ok(Json(ApiResponse::ok(tour)))
}
