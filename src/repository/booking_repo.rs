use async_trait::async_trait;
use chrono::Utc;
use sea_orm::prelude::{DateTimeWithTimeZone, Decimal};
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};

use super::{contains_pattern, BookingFilter, BookingRepository, NewBooking, Page, LIKE_ESCAPE};
use crate::entities::{booking, BookingStatus};
use crate::error::AppResult;

#[derive(Clone, Debug)]
pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Filtered bookings, newest first.
fn page_query(filter: &BookingFilter) -> Select<booking::Entity> {
    let mut query = booking::Entity::find();

    if let Some(keyword) = filter.keyword() {
        query = query.filter(
            Expr::col(booking::Column::BookingCode)
                .like(LikeExpr::new(contains_pattern(keyword)).escape(LIKE_ESCAPE)),
        );
    }
    if let Some(status) = filter.status {
        query = query.filter(booking::Column::Status.eq(status));
    }
    if let Some(tour_id) = filter.tour_id {
        query = query.filter(booking::Column::TourId.eq(tour_id));
    }
    if let Some(user_id) = filter.user_id {
        query = query.filter(booking::Column::UserId.eq(user_id));
    }

    query
        .order_by_desc(booking::Column::CreatedAt)
        .order_by_desc(booking::Column::Id)
}

/// `SUM(total_amount)` over bookings created in `[from, to)` with one of `statuses`.
fn revenue_query(
    from: DateTimeWithTimeZone,
    to: DateTimeWithTimeZone,
    statuses: &[BookingStatus],
) -> Select<booking::Entity> {
    booking::Entity::find()
        .select_only()
        .column_as(booking::Column::TotalAmount.sum(), "revenue")
        .filter(booking::Column::CreatedAt.gte(from))
        .filter(booking::Column::CreatedAt.lt(to))
        .filter(booking::Column::Status.is_in(statuses.iter().copied()))
}

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<booking::Model>> {
        Ok(booking::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn insert(&self, new: NewBooking) -> AppResult<booking::Model> {
        let now: DateTimeWithTimeZone = Utc::now().into();

        let active = booking::ActiveModel {
            booking_code: Set(new.booking_code),
            tour_id: Set(new.tour_id),
            schedule_id: Set(new.schedule_id),
            user_id: Set(new.user_id),
            adult_count: Set(new.adult_count),
            child_count: Set(new.child_count),
            total_amount: Set(new.total_amount),
            refunded_amount: Set(None),
            status: Set(new.status),
            special_requests: Set(new.special_requests),
            notes: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(active.insert(&self.db).await?)
    }

    async fn update(&self, booking: booking::Model) -> AppResult<booking::Model> {
        let mut active = booking::ActiveModel::from(booking).reset_all();
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = booking::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn find_page(
        &self,
        filter: &BookingFilter,
        page: u64,
        size: u64,
    ) -> AppResult<Page<booking::Model>> {
        let paginator = page_query(filter).paginate(&self.db, size);

        let total_items = paginator.num_items().await?;
        let items = paginator.fetch_page(page).await?;

        Ok(Page::new(items, total_items, page, size))
    }

    async fn count_created_between(
        &self,
        from: DateTimeWithTimeZone,
        to: DateTimeWithTimeZone,
    ) -> AppResult<u64> {
        let count = booking::Entity::find()
            .filter(booking::Column::CreatedAt.gte(from))
            .filter(booking::Column::CreatedAt.lt(to))
            .count(&self.db)
            .await?;

        Ok(count)
    }

    async fn sum_total_amount_between(
        &self,
        from: DateTimeWithTimeZone,
        to: DateTimeWithTimeZone,
        statuses: &[BookingStatus],
    ) -> AppResult<Decimal> {
        let total = revenue_query(from, to, statuses)
            .into_tuple::<Option<Decimal>>()
            .one(&self.db)
            .await?;

        Ok(total.flatten().unwrap_or(Decimal::ZERO))
    }
}
