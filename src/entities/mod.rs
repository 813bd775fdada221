pub mod booking;
pub mod booking_image;

pub use booking::BookingStatus;
