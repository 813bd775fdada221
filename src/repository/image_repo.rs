use async_trait::async_trait;
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set, UpdateMany,
};

use super::{contains_pattern, ImageRepository, NewBookingImage, LIKE_ESCAPE};
use crate::entities::booking_image;
use crate::error::AppResult;

#[derive(Clone, Debug)]
pub struct SeaOrmImageRepository {
    db: DatabaseConnection,
}

impl SeaOrmImageRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// UPDATE booking_image SET is_primary = (id = $image_id), updated_at = $now
/// WHERE booking_id = $booking_id AND (is_primary OR id = $image_id)
fn set_primary_query(
    booking_id: i64,
    image_id: i64,
    now: DateTimeWithTimeZone,
) -> UpdateMany<booking_image::Entity> {
    booking_image::Entity::update_many()
        .col_expr(
            booking_image::Column::IsPrimary,
            Expr::col(booking_image::Column::Id).eq(image_id),
        )
        .col_expr(booking_image::Column::UpdatedAt, Expr::value(now))
        .filter(booking_image::Column::BookingId.eq(booking_id))
        .filter(
            Condition::any()
                .add(booking_image::Column::IsPrimary.eq(true))
                .add(booking_image::Column::Id.eq(image_id)),
        )
}

/// Case-insensitive literal substring match on the file name, newest first.
fn search_query(booking_id: i64, keyword: &str) -> Select<booking_image::Entity> {
    let pattern = contains_pattern(&keyword.to_lowercase());

    booking_image::Entity::find()
        .filter(booking_image::Column::BookingId.eq(booking_id))
        .filter(
            Expr::expr(Func::lower(Expr::col(booking_image::Column::ImageName)))
                .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE)),
        )
        .order_by_desc(booking_image::Column::CreatedAt)
        .order_by_desc(booking_image::Column::Id)
}

#[async_trait]
impl ImageRepository for SeaOrmImageRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<booking_image::Model>> {
        Ok(booking_image::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_booking_id(&self, booking_id: i64) -> AppResult<Vec<booking_image::Model>> {
        let images = booking_image::Entity::find()
            .filter(booking_image::Column::BookingId.eq(booking_id))
            .order_by_desc(booking_image::Column::CreatedAt)
            .order_by_desc(booking_image::Column::Id)
            .all(&self.db)
            .await?;

        Ok(images)
    }

    async fn find_primary_by_booking_id(
        &self,
        booking_id: i64,
    ) -> AppResult<Option<booking_image::Model>> {
        let image = booking_image::Entity::find()
            .filter(booking_image::Column::BookingId.eq(booking_id))
            .filter(booking_image::Column::IsPrimary.eq(true))
            .order_by_desc(booking_image::Column::UpdatedAt)
            .one(&self.db)
            .await?;

        Ok(image)
    }

    async fn count_by_booking_id(&self, booking_id: i64) -> AppResult<u64> {
        let count = booking_image::Entity::find()
            .filter(booking_image::Column::BookingId.eq(booking_id))
            .count(&self.db)
            .await?;

        Ok(count)
    }

    async fn insert(&self, new: NewBookingImage) -> AppResult<booking_image::Model> {
        let now: DateTimeWithTimeZone = Utc::now().into();

        let active = booking_image::ActiveModel {
            booking_id: Set(new.booking_id),
            image_url: Set(new.image_url),
            image_name: Set(new.image_name),
            image_size: Set(new.image_size),
            mime_type: Set(new.mime_type),
            is_primary: Set(new.is_primary),
            description: Set(new.description),
            uploaded_by: Set(new.uploaded_by),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(active.insert(&self.db).await?)
    }

    async fn update_description(
        &self,
        id: i64,
        description: Option<String>,
    ) -> AppResult<Option<booking_image::Model>> {
        let Some(image) = booking_image::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut active: booking_image::ActiveModel = image.into();
        active.description = Set(description);
        active.updated_at = Set(Utc::now().into());

        Ok(Some(active.update(&self.db).await?))
    }

    async fn set_primary(&self, booking_id: i64, image_id: i64) -> AppResult<u64> {
        let result = set_primary_query(booking_id, image_id, Utc::now().into())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn delete_by_id(&self, id: i64) -> AppResult<bool> {
        let result = booking_image::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_by_booking_id(&self, booking_id: i64) -> AppResult<u64> {
        let result = booking_image::Entity::delete_many()
            .filter(booking_image::Column::BookingId.eq(booking_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn search_by_name(
        &self,
        booking_id: i64,
        keyword: &str,
    ) -> AppResult<Vec<booking_image::Model>> {
        let images = search_query(booking_id, keyword).all(&self.db).await?;

        Ok(images)
    }
}
