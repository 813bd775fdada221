pub mod bookings;
pub mod customer;
pub mod images;
