//! Review HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::ApiResponse;
use crate::review::{CreateReviewRequest, Review, ReviewService, UpdateReviewRequest};

/// Tour rating after a review was removed
#[derive(Debug, Serialize)]
pub struct ReviewDeleted {
    pub tour_id: Uuid,
    pub rating: f64,
    pub review_count: i32,
}

/// POST /api/tours/:id/reviews
pub async fn create_review(
    State(service): State<Arc<ReviewService>>,
    user: AuthenticatedUser,
    Path(tour_id): Path<Uuid>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Review>>), ApiError> {
    let review = service
        .create_review(&user.caller(), tour_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(review))))
}

/// GET /api/tours/:id/reviews
pub async fn tour_reviews(
    State(service): State<Arc<ReviewService>>,
    Path(tour_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Review>>>, ApiError> {
    let reviews = service.tour_reviews(tour_id).await?;
    Ok(Json(ApiResponse::ok(reviews)))
}

/// GET /api/reviews/my
pub async fn my_reviews(
    State(service): State<Arc<ReviewService>>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<Review>>>, ApiError> {
    let reviews = service.my_reviews(&user.caller()).await?;
    Ok(Json(ApiResponse::ok(reviews)))
}

/// PUT /api/reviews/:id
pub async fn update_review(
    State(service): State<Arc<ReviewService>>,
    user: AuthenticatedUser,
    Path(review_id): Path<Uuid>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<Review>>, ApiError> {
    let review = service
        .update_review(&user.caller(), review_id, request)
        .await?;
    Ok(Json(ApiResponse::ok(review)))
}

/// DELETE /api/reviews/:id
pub async fn delete_review(
    State(service): State<Arc<ReviewService>>,
    user: AuthenticatedUser,
    Path(review_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReviewDeleted>>, ApiError> {
    let tour = service.delete_review(&user.caller(), review_id).await?;
    Ok(Json(ApiResponse::ok(ReviewDeleted {
        tour_id: tour.id,
        rating: tour.rating,
        review_count: tour.review_count,
    })))
}
