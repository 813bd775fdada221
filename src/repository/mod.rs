//! Persistence contracts for bookings and their image metadata.
//!
//! Services depend on the traits; `SeaOrm*` types are the database-backed
//! implementations wired up in `main`.

use async_trait::async_trait;
use sea_orm::prelude::{DateTimeWithTimeZone, Decimal};

use crate::entities::{booking, booking_image, BookingStatus};
use crate::error::AppResult;

mod booking_repo;
mod image_repo;
#[cfg(test)]
pub(crate) mod memory;

pub use booking_repo::SeaOrmBookingRepository;
pub use image_repo::SeaOrmImageRepository;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub booking_code: String,
    pub tour_id: i64,
    pub schedule_id: Option<i64>,
    pub user_id: i64,
    pub adult_count: i32,
    pub child_count: i32,
    pub total_amount: Decimal,
    pub status: BookingStatus,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBookingImage {
    pub booking_id: i64,
    pub image_url: String,
    pub image_name: String,
    pub image_size: i64,
    pub mime_type: String,
    pub is_primary: bool,
    pub description: Option<String>,
    pub uploaded_by: String,
}

/// Filters for the administrative booking list.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    /// Substring of the booking code.
    pub keyword: Option<String>,
    pub status: Option<BookingStatus>,
    pub tour_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl BookingFilter {
    pub fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// One page of results. `page` is zero-based.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub total_pages: u64,
    pub page: u64,
    pub size: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_items: u64, page: u64, size: u64) -> Self {
        Self {
            items,
            total_items,
            total_pages: total_items.div_ceil(size.max(1)),
            page,
            size,
        }
    }
}

/// Escape character used with `LIKE ... ESCAPE` patterns.
pub(crate) const LIKE_ESCAPE: char = '\\';

/// Escape `LIKE` metacharacters so `literal` only matches itself.
pub(crate) fn escape_like_literal(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// `%literal%` pattern for a substring match.
pub(crate) fn contains_pattern(literal: &str) -> String {
    format!("%{}%", escape_like_literal(literal))
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<booking::Model>>;

    async fn insert(&self, booking: NewBooking) -> AppResult<booking::Model>;

    /// Persist every field of `booking` and bump `updated_at`.
    async fn update(&self, booking: booking::Model) -> AppResult<booking::Model>;

    async fn delete(&self, id: i64) -> AppResult<bool>;

    /// Newest bookings first.
    async fn find_page(
        &self,
        filter: &BookingFilter,
        page: u64,
        size: u64,
    ) -> AppResult<Page<booking::Model>>;

    /// Bookings created in `[from, to)`.
    async fn count_created_between(
        &self,
        from: DateTimeWithTimeZone,
        to: DateTimeWithTimeZone,
    ) -> AppResult<u64>;

    /// Sum of `total_amount` over bookings created in `[from, to)` whose
    /// status is one of `statuses`.
    async fn sum_total_amount_between(
        &self,
        from: DateTimeWithTimeZone,
        to: DateTimeWithTimeZone,
        statuses: &[BookingStatus],
    ) -> AppResult<Decimal>;
}

#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<booking_image::Model>>;

    /// Newest first, ties broken by id.
    async fn find_by_booking_id(&self, booking_id: i64) -> AppResult<Vec<booking_image::Model>>;

    async fn find_primary_by_booking_id(
        &self,
        booking_id: i64,
    ) -> AppResult<Option<booking_image::Model>>;

    async fn count_by_booking_id(&self, booking_id: i64) -> AppResult<u64>;

    async fn insert(&self, image: NewBookingImage) -> AppResult<booking_image::Model>;

    async fn update_description(
        &self,
        id: i64,
        description: Option<String>,
    ) -> AppResult<Option<booking_image::Model>>;

    /// Make `image_id` the only primary image of `booking_id` in a single
    /// write. Returns the number of rows touched.
    async fn set_primary(&self, booking_id: i64, image_id: i64) -> AppResult<u64>;

    async fn delete_by_id(&self, id: i64) -> AppResult<bool>;

    async fn delete_by_booking_id(&self, booking_id: i64) -> AppResult<u64>;

    /// Case-insensitive substring match on the original file name.
    async fn search_by_name(
        &self,
        booking_id: i64,
        keyword: &str,
    ) -> AppResult<Vec<booking_image::Model>>;
}
