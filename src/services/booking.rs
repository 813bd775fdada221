use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::prelude::{DateTimeWithTimeZone, Decimal};
use sea_orm::Iterable;
use serde::Serialize;

use crate::entities::{booking, BookingStatus};
use crate::error::{AppError, AppResult};
use crate::repository::{BookingFilter, BookingRepository, NewBooking, Page};

const MAX_PAGE_SIZE: u64 = 100;

/// Statuses whose totals count as revenue.
fn revenue_statuses() -> Vec<BookingStatus> {
    BookingStatus::iter()
        .filter(BookingStatus::counts_toward_revenue)
        .collect()
}

/// Hook invoked when a booking becomes cancelled so the schedule owner can
/// hand the seats back. Slot accounting itself lives with the schedule.
#[async_trait]
pub trait SlotRelease: Send + Sync {
    async fn release(&self, booking: &booking::Model) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSlotRelease;

#[async_trait]
impl SlotRelease for NoopSlotRelease {
    async fn release(&self, booking: &booking::Model) -> AppResult<()> {
        tracing::debug!(
            booking_id = booking.id,
            schedule_id = ?booking.schedule_id,
            participants = booking.participants(),
            "No schedule hook configured, skipping slot release"
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewBookingRequest {
    pub tour_id: i64,
    pub schedule_id: Option<i64>,
    pub user_id: i64,
    pub adult_count: i32,
    pub child_count: i32,
    pub total_amount: Decimal,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStats {
    pub year: i32,
    pub month: u32,
    pub count: u64,
    pub revenue: Decimal,
}

/// Booking status lifecycle: create, confirm/complete, cancel, refund.
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    slot_release: Arc<dyn SlotRelease>,
    strict_transitions: bool,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        slot_release: Arc<dyn SlotRelease>,
        strict_transitions: bool,
    ) -> Self {
        Self {
            bookings,
            slot_release,
            strict_transitions,
        }
    }

    pub async fn create(&self, request: NewBookingRequest) -> AppResult<booking::Model> {
        if request.adult_count < 0 || request.child_count < 0 {
            return Err(AppError::BadRequest(
                "Participant counts cannot be negative".to_string(),
            ));
        }
        let participants = request
            .adult_count
            .checked_add(request.child_count)
            .ok_or_else(|| AppError::BadRequest("Too many participants".to_string()))?;
        if participants <= 0 {
            return Err(AppError::BadRequest(
                "A booking needs at least one participant".to_string(),
            ));
        }
        if request.total_amount < Decimal::ZERO {
            return Err(AppError::BadRequest(
                "Total amount cannot be negative".to_string(),
            ));
        }

        let booking = self
            .bookings
            .insert(NewBooking {
                booking_code: generate_booking_code(),
                tour_id: request.tour_id,
                schedule_id: request.schedule_id,
                user_id: request.user_id,
                adult_count: request.adult_count,
                child_count: request.child_count,
                total_amount: request.total_amount,
                status: BookingStatus::Pending,
                special_requests: request.special_requests,
            })
            .await?;

        tracing::info!(
            booking_id = booking.id,
            booking_code = %booking.booking_code,
            "Booking created"
        );
        Ok(booking)
    }

    pub async fn get(&self, id: i64) -> AppResult<booking::Model> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking not found with id: {}", id)))
    }

    pub async fn list(
        &self,
        filter: &BookingFilter,
        page: u64,
        size: u64,
    ) -> AppResult<Page<booking::Model>> {
        self.bookings
            .find_page(filter, page, size.clamp(1, MAX_PAGE_SIZE))
            .await
    }

    /// Overwrite the status. Legality is only checked in strict mode;
    /// staff may otherwise move a booking to any state.
    pub async fn update_status(
        &self,
        id: i64,
        status: BookingStatus,
    ) -> AppResult<booking::Model> {
        let mut booking = self.get(id).await?;
        let previous = booking.status;
        self.check_transition(previous, status)?;

        booking.status = status;
        let updated = self.bookings.update(booking).await?;

        tracing::info!(booking_id = id, from = %previous, to = %status, "Booking status updated");

        if status == BookingStatus::Cancelled {
            self.release_slots(previous, &updated).await;
        }
        Ok(updated)
    }

    pub async fn cancel(&self, id: i64, reason: Option<&str>) -> AppResult<booking::Model> {
        let mut booking = self.get(id).await?;
        let previous = booking.status;
        self.check_transition(previous, BookingStatus::Cancelled)?;

        let line = match clean(reason) {
            Some(reason) => format!("Cancelled: {}", reason),
            None => "Cancelled".to_string(),
        };
        booking.status = BookingStatus::Cancelled;
        booking.notes = append_note(booking.notes.take(), line);
        let updated = self.bookings.update(booking).await?;

        tracing::info!(booking_id = id, from = %previous, "Booking cancelled");
        self.release_slots(previous, &updated).await;
        Ok(updated)
    }

    pub async fn refund(
        &self,
        id: i64,
        amount: Decimal,
        reason: Option<&str>,
    ) -> AppResult<booking::Model> {
        let mut booking = self.get(id).await?;

        if amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(
                "Refund amount must be greater than zero".to_string(),
            ));
        }
        if amount > booking.total_amount {
            return Err(AppError::BadRequest(format!(
                "Refund amount {} exceeds booking total {}",
                amount, booking.total_amount
            )));
        }
        self.check_transition(booking.status, BookingStatus::Refunded)?;

        let line = match clean(reason) {
            Some(reason) => format!("Refunded {}: {}", amount, reason),
            None => format!("Refunded {}", amount),
        };
        booking.refunded_amount = Some(amount);
        booking.status = BookingStatus::Refunded;
        booking.notes = append_note(booking.notes.take(), line);
        let updated = self.bookings.update(booking).await?;

        tracing::info!(booking_id = id, amount = %amount, "Booking refunded");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.bookings.delete(id).await? {
            return Err(AppError::NotFound(format!("Booking not found with id: {}", id)));
        }
        tracing::info!(booking_id = id, "Booking deleted");
        Ok(())
    }

    pub async fn count_by_month(&self, year: i32, month: u32) -> AppResult<u64> {
        let (from, to) = month_range(year, month)?;
        self.bookings.count_created_between(from, to).await
    }

    /// Sum of totals for bookings created in the month, excluding
    /// cancelled and refunded ones.
    pub async fn revenue_by_month(&self, year: i32, month: u32) -> AppResult<Decimal> {
        let (from, to) = month_range(year, month)?;
        self.bookings
            .sum_total_amount_between(from, to, &revenue_statuses())
            .await
    }

    pub async fn monthly_stats(&self, year: i32, month: u32) -> AppResult<MonthlyStats> {
        Ok(MonthlyStats {
            year,
            month,
            count: self.count_by_month(year, month).await?,
            revenue: self.revenue_by_month(year, month).await?,
        })
    }

    fn check_transition(&self, from: BookingStatus, to: BookingStatus) -> AppResult<()> {
        if from.can_transition_to(to) {
            return Ok(());
        }
        if self.strict_transitions {
            return Err(AppError::BadRequest(format!(
                "Cannot change booking status from {} to {}",
                from, to
            )));
        }
        tracing::warn!(from = %from, to = %to, "Applying status change outside the state machine");
        Ok(())
    }

    async fn release_slots(&self, previous: BookingStatus, booking: &booking::Model) {
        if matches!(previous, BookingStatus::Cancelled | BookingStatus::Refunded) {
            return;
        }
        if let Err(err) = self.slot_release.release(booking).await {
            tracing::warn!(booking_id = booking.id, error = %err, "Slot release failed");
        }
    }
}

/// `BK` + `yyMMdd` + six random uppercase alphanumerics.
pub fn generate_booking_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();

    format!("BK{}{}", Utc::now().format("%y%m%d"), suffix)
}

fn month_range(
    year: i32,
    month: u32,
) -> AppResult<(DateTimeWithTimeZone, DateTimeWithTimeZone)> {
    let invalid = || AppError::BadRequest(format!("Invalid month: {}-{}", year, month));

    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or_else(invalid)?;

    let from = start.and_hms_opt(0, 0, 0).ok_or_else(invalid)?.and_utc();
    let to = end.and_hms_opt(0, 0, 0).ok_or_else(invalid)?.and_utc();
    Ok((from.into(), to.into()))
}

fn clean(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn append_note(notes: Option<String>, line: String) -> Option<String> {
    match notes {
        Some(existing) if !existing.trim().is_empty() => Some(format!("{}\n{}", existing, line)),
        _ => Some(line),
    }
}
