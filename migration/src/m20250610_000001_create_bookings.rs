use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Tour, schedule and user rows live with their own components;
        // only the ids are kept here.
        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Booking::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string_len(Booking::BookingCode, 32).not_null().unique_key())
                    .col(big_integer(Booking::TourId).not_null())
                    .col(big_integer_null(Booking::ScheduleId))
                    .col(big_integer(Booking::UserId).not_null())
                    .col(integer(Booking::AdultCount).not_null().default(0))
                    .col(integer(Booking::ChildCount).not_null().default(0))
                    .col(decimal_len(Booking::TotalAmount, 12, 2).not_null())
                    .col(decimal_len_null(Booking::RefundedAmount, 12, 2))
                    .col(string_len(Booking::Status, 20).not_null().default("PENDING"))
                    .col(text_null(Booking::SpecialRequests))
                    .col(text_null(Booking::Notes))
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Booking::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_created_at")
                    .table(Booking::Table)
                    .col(Booking::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    BookingCode,
    TourId,
    ScheduleId,
    UserId,
    AdultCount,
    ChildCount,
    TotalAmount,
    RefundedAmount,
    Status,
    SpecialRequests,
    Notes,
    CreatedAt,
    UpdatedAt,
}
