use sea_orm_migration::{prelude::*, schema::*};

use super::m20250610_000001_create_bookings::Booking;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BookingImage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BookingImage::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(big_integer(BookingImage::BookingId).not_null())
                    .col(string_len(BookingImage::ImageUrl, 500).not_null().unique_key())
                    .col(string_len(BookingImage::ImageName, 255).not_null())
                    .col(big_integer(BookingImage::ImageSize).not_null())
                    .col(string_len(BookingImage::MimeType, 100).not_null())
                    .col(boolean(BookingImage::IsPrimary).not_null().default(false))
                    .col(string_len_null(BookingImage::Description, 1000))
                    .col(string_len(BookingImage::UploadedBy, 100).not_null())
                    .col(
                        timestamp_with_time_zone(BookingImage::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(BookingImage::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_image_booking")
                            .from(BookingImage::Table, BookingImage::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_image_booking_id")
                    .table(BookingImage::Table)
                    .col(BookingImage::BookingId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BookingImage::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BookingImage {
    Table,
    Id,
    BookingId,
    ImageUrl,
    ImageName,
    ImageSize,
    MimeType,
    IsPrimary,
    Description,
    UploadedBy,
    CreatedAt,
    UpdatedAt,
}
