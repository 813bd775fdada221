use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
    #[sea_orm(string_value = "REFUNDED")]
    Refunded,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Refunded => "REFUNDED",
        }
    }

    /// Transition table of the booking state machine.
    ///
    /// `PENDING -> CONFIRMED -> COMPLETED`, any non-terminal state may be
    /// cancelled, and only a cancelled booking may be refunded. Re-applying
    /// the current state is always allowed.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;

        if *self == next {
            return true;
        }

        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Cancelled, Refunded)
        )
    }

    /// Whether a booking in this state contributes to revenue figures.
    pub fn counts_toward_revenue(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled | BookingStatus::Refunded)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "REFUNDED" => Ok(BookingStatus::Refunded),
            other => Err(format!("Unknown booking status: {}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub booking_code: String,
    pub tour_id: i64,
    pub schedule_id: Option<i64>,
    pub user_id: i64,
    pub adult_count: i32,
    pub child_count: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub refunded_amount: Option<Decimal>,
    pub status: BookingStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub special_requests: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Adults plus children; widened so extreme counts cannot overflow.
    pub fn participants(&self) -> i64 {
        i64::from(self.adult_count) + i64::from(self.child_count)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::booking_image::Entity")]
    Images,
}

impl Related<super::booking_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
