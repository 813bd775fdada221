use axum::{
    extract::{Query, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AppResult;
use crate::handlers::bookings::{BookingPageResponse, BookingResponse};
use crate::repository::BookingFilter;
use crate::services::NewBookingRequest;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub tour_id: i64,
    pub schedule_id: Option<i64>,
    #[serde(default)]
    pub adult_count: i32,
    #[serde(default)]
    pub child_count: i32,
    pub total_amount: Decimal,
    pub special_requests: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MyBookingsQuery {
    pub page: Option<u64>,
    pub size: Option<u64>,
}

/// Create a booking for the authenticated user
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state
        .bookings
        .create(NewBookingRequest {
            tour_id: payload.tour_id,
            schedule_id: payload.schedule_id,
            user_id: claims.sub,
            adult_count: payload.adult_count,
            child_count: payload.child_count,
            total_amount: payload.total_amount,
            special_requests: payload.special_requests,
        })
        .await?;

    Ok(Json(booking.into()))
}

/// Bookings of the authenticated user, newest first
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MyBookingsQuery>,
) -> AppResult<Json<BookingPageResponse>> {
    let filter = BookingFilter {
        user_id: Some(claims.sub),
        ..Default::default()
    };

    let page = state
        .bookings
        .list(&filter, query.page.unwrap_or(0), query.size.unwrap_or(10))
        .await?;

    Ok(Json(page.into()))
}
