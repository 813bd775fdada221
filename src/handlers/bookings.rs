use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::entities::{booking, BookingStatus};
use crate::error::{AppError, AppResult};
use crate::repository::{BookingFilter, Page};
use crate::services::MonthlyStats;
use crate::AppState;

const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    #[serde(flatten)]
    pub booking: booking::Model,
    pub participants: i64,
}

impl From<booking::Model> for BookingResponse {
    fn from(booking: booking::Model) -> Self {
        let participants = booking.participants();
        Self {
            booking,
            participants,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPageResponse {
    pub items: Vec<BookingResponse>,
    pub total_pages: u64,
    pub total_elements: u64,
    pub page: u64,
    pub size: u64,
}

impl From<Page<booking::Model>> for BookingPageResponse {
    fn from(page: Page<booking::Model>) -> Self {
        Self {
            items: page.items.into_iter().map(BookingResponse::from).collect(),
            total_pages: page.total_pages,
            total_elements: page.total_items,
            page: page.page,
            size: page.size,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBookingsQuery {
    pub keyword: Option<String>,
    pub status: Option<String>,
    pub tour_id: Option<i64>,
    pub user_id: Option<i64>,
    pub page: Option<u64>,
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub amount: Value,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub year: i32,
    pub month: u32,
}

pub(crate) fn parse_status(raw: &str) -> AppResult<BookingStatus> {
    BookingStatus::from_str(raw).map_err(AppError::BadRequest)
}

/// Accepts the amount as a JSON number or a numeric string.
fn parse_amount(raw: &Value) -> AppResult<Decimal> {
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(AppError::BadRequest("Refund amount is required".to_string())),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| AppError::BadRequest(format!("Invalid refund amount: {}", text)))
}

/// List bookings with optional filters (admin)
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<ListBookingsQuery>,
) -> AppResult<Json<BookingPageResponse>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let filter = BookingFilter {
        keyword: query.keyword,
        status,
        tour_id: query.tour_id,
        user_id: query.user_id,
    };

    let page = state
        .bookings
        .list(
            &filter,
            query.page.unwrap_or(0),
            query.size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    Ok(Json(page.into()))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state.bookings.get(id).await?;
    Ok(Json(booking.into()))
}

/// Delete a booking together with its gallery (admin)
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.bookings.get(id).await?;
    state.gallery.delete_all(id).await?;
    state.bookings.delete(id).await?;

    Ok(Json(json!({ "message": "Booking deleted successfully" })))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<BookingResponse>> {
    let status = parse_status(&payload.status)?;
    let booking = state.bookings.update_status(id, status).await?;
    Ok(Json(booking.into()))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CancelRequest>,
) -> AppResult<Json<BookingResponse>> {
    let booking = state
        .bookings
        .cancel(id, payload.reason.as_deref())
        .await?;
    Ok(Json(booking.into()))
}

pub async fn refund_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<RefundRequest>,
) -> AppResult<Json<BookingResponse>> {
    let amount = parse_amount(&payload.amount)?;
    let booking = state
        .bookings
        .refund(id, amount, payload.reason.as_deref())
        .await?;
    Ok(Json(booking.into()))
}

/// Booking count and revenue for a calendar month
pub async fn monthly_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<MonthlyStats>> {
    let stats = state.bookings.monthly_stats(query.year, query.month).await?;
    Ok(Json(stats))
}
