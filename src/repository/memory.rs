use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::prelude::{DateTimeWithTimeZone, Decimal};

use super::{BookingFilter, BookingRepository, ImageRepository, NewBooking, NewBookingImage, Page};
use crate::entities::{booking, booking_image, BookingStatus};
use crate::error::AppResult;

/// Hands out strictly increasing timestamps so "newest first" is stable
/// even when rows are created within the same clock tick.
#[derive(Debug)]
struct Clock {
    last: DateTimeWithTimeZone,
}

impl Clock {
    fn new() -> Self {
        Self {
            last: Utc::now().into(),
        }
    }

    fn tick(&mut self) -> DateTimeWithTimeZone {
        let now: DateTimeWithTimeZone = Utc::now().into();
        self.last = if now > self.last {
            now
        } else {
            self.last + Duration::microseconds(1)
        };
        self.last
    }
}

#[derive(Debug)]
struct Table<T> {
    rows: Vec<T>,
    next_id: i64,
    clock: Clock,
}

impl<T> Table<T> {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
            clock: Clock::new(),
        }
    }
}

#[derive(Debug)]
pub struct MemoryBookingRepository {
    table: Mutex<Table<booking::Model>>,
}

impl MemoryBookingRepository {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table::new()),
        }
    }

    /// Overwrite the creation timestamp of a stored booking.
    pub fn set_created_at(&self, id: i64, created_at: DateTimeWithTimeZone) {
        let mut table = self.table.lock().unwrap();
        if let Some(row) = table.rows.iter_mut().find(|b| b.id == id) {
            row.created_at = created_at;
        }
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<booking::Model>> {
        let table = self.table.lock().unwrap();
        Ok(table.rows.iter().find(|b| b.id == id).cloned())
    }

    async fn insert(&self, new: NewBooking) -> AppResult<booking::Model> {
        let mut table = self.table.lock().unwrap();
        let now = table.clock.tick();
        let model = booking::Model {
            id: table.next_id,
            booking_code: new.booking_code,
            tour_id: new.tour_id,
            schedule_id: new.schedule_id,
            user_id: new.user_id,
            adult_count: new.adult_count,
            child_count: new.child_count,
            total_amount: new.total_amount,
            refunded_amount: None,
            status: new.status,
            special_requests: new.special_requests,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        table.next_id += 1;
        table.rows.push(model.clone());
        Ok(model)
    }

    async fn update(&self, mut booking: booking::Model) -> AppResult<booking::Model> {
        let mut table = self.table.lock().unwrap();
        booking.updated_at = table.clock.tick();
        if let Some(row) = table.rows.iter_mut().find(|b| b.id == booking.id) {
            *row = booking.clone();
        }
        Ok(booking)
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let mut table = self.table.lock().unwrap();
        let before = table.rows.len();
        table.rows.retain(|b| b.id != id);
        Ok(table.rows.len() < before)
    }

    async fn find_page(
        &self,
        filter: &BookingFilter,
        page: u64,
        size: u64,
    ) -> AppResult<Page<booking::Model>> {
        let table = self.table.lock().unwrap();
        let mut matching: Vec<booking::Model> = table
            .rows
            .iter()
            .filter(|b| filter.keyword().is_none_or(|k| b.booking_code.contains(k)))
            .filter(|b| filter.status.is_none_or(|s| b.status == s))
            .filter(|b| filter.tour_id.is_none_or(|t| b.tour_id == t))
            .filter(|b| filter.user_id.is_none_or(|u| b.user_id == u))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip((page * size) as usize)
            .take(size as usize)
            .collect();

        Ok(Page::new(items, total, page, size))
    }

    async fn count_created_between(
        &self,
        from: DateTimeWithTimeZone,
        to: DateTimeWithTimeZone,
    ) -> AppResult<u64> {
        let table = self.table.lock().unwrap();
        Ok(table
            .rows
            .iter()
            .filter(|b| b.created_at >= from && b.created_at < to)
            .count() as u64)
    }

    async fn sum_total_amount_between(
        &self,
        from: DateTimeWithTimeZone,
        to: DateTimeWithTimeZone,
        statuses: &[BookingStatus],
    ) -> AppResult<Decimal> {
        let table = self.table.lock().unwrap();
        Ok(table
            .rows
            .iter()
            .filter(|b| b.created_at >= from && b.created_at < to)
            .filter(|b| statuses.contains(&b.status))
            .map(|b| b.total_amount)
            .sum())
    }
}

#[derive(Debug)]
pub struct MemoryImageRepository {
    table: Mutex<Table<booking_image::Model>>,
}

impl MemoryImageRepository {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table::new()),
        }
    }

    /// Number of primary images stored for a booking.
    pub fn primary_count(&self, booking_id: i64) -> usize {
        let table = self.table.lock().unwrap();
        table
            .rows
            .iter()
            .filter(|i| i.booking_id == booking_id && i.is_primary)
            .count()
    }

    /// Raise the primary flag on one row without touching the others,
    /// simulating a lost race between two writers.
    pub fn force_primary(&self, id: i64) {
        let mut table = self.table.lock().unwrap();
        if let Some(row) = table.rows.iter_mut().find(|i| i.id == id) {
            row.is_primary = true;
        }
    }
}

fn newest_first(images: &mut [booking_image::Model]) {
    images.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl ImageRepository for MemoryImageRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<booking_image::Model>> {
        let table = self.table.lock().unwrap();
        Ok(table.rows.iter().find(|i| i.id == id).cloned())
    }

    async fn find_by_booking_id(&self, booking_id: i64) -> AppResult<Vec<booking_image::Model>> {
        let table = self.table.lock().unwrap();
        let mut images: Vec<_> = table
            .rows
            .iter()
            .filter(|i| i.booking_id == booking_id)
            .cloned()
            .collect();
        newest_first(&mut images);
        Ok(images)
    }

    async fn find_primary_by_booking_id(
        &self,
        booking_id: i64,
    ) -> AppResult<Option<booking_image::Model>> {
        let table = self.table.lock().unwrap();
        Ok(table
            .rows
            .iter()
            .find(|i| i.booking_id == booking_id && i.is_primary)
            .cloned())
    }

    async fn count_by_booking_id(&self, booking_id: i64) -> AppResult<u64> {
        let table = self.table.lock().unwrap();
        Ok(table.rows.iter().filter(|i| i.booking_id == booking_id).count() as u64)
    }

    async fn insert(&self, new: NewBookingImage) -> AppResult<booking_image::Model> {
        let mut table = self.table.lock().unwrap();
        let now = table.clock.tick();
        let model = booking_image::Model {
            id: table.next_id,
            booking_id: new.booking_id,
            image_url: new.image_url,
            image_name: new.image_name,
            image_size: new.image_size,
            mime_type: new.mime_type,
            is_primary: new.is_primary,
            description: new.description,
            uploaded_by: new.uploaded_by,
            created_at: now,
            updated_at: now,
        };
        table.next_id += 1;
        table.rows.push(model.clone());
        Ok(model)
    }

    async fn update_description(
        &self,
        id: i64,
        description: Option<String>,
    ) -> AppResult<Option<booking_image::Model>> {
        let mut table = self.table.lock().unwrap();
        let now = table.clock.tick();
        Ok(table.rows.iter_mut().find(|i| i.id == id).map(|row| {
            row.description = description;
            row.updated_at = now;
            row.clone()
        }))
    }

    async fn set_primary(&self, booking_id: i64, image_id: i64) -> AppResult<u64> {
        let mut table = self.table.lock().unwrap();
        let now = table.clock.tick();
        let mut touched = 0;
        for row in table
            .rows
            .iter_mut()
            .filter(|i| i.booking_id == booking_id && (i.is_primary || i.id == image_id))
        {
            row.is_primary = row.id == image_id;
            row.updated_at = now;
            touched += 1;
        }
        Ok(touched)
    }

    async fn delete_by_id(&self, id: i64) -> AppResult<bool> {
        let mut table = self.table.lock().unwrap();
        let before = table.rows.len();
        table.rows.retain(|i| i.id != id);
        Ok(table.rows.len() < before)
    }

    async fn delete_by_booking_id(&self, booking_id: i64) -> AppResult<u64> {
        let mut table = self.table.lock().unwrap();
        let before = table.rows.len();
        table.rows.retain(|i| i.booking_id != booking_id);
        Ok((before - table.rows.len()) as u64)
    }

    async fn search_by_name(
        &self,
        booking_id: i64,
        keyword: &str,
    ) -> AppResult<Vec<booking_image::Model>> {
        let keyword = keyword.to_lowercase();
        let table = self.table.lock().unwrap();
        let mut images: Vec<_> = table
            .rows
            .iter()
            .filter(|i| i.booking_id == booking_id)
            .filter(|i| i.image_name.to_lowercase().contains(&keyword))
            .cloned()
            .collect();
        newest_first(&mut images);
        Ok(images)
    }
}
