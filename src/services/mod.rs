pub mod booking;
pub mod gallery;

pub use booking::{BookingService, MonthlyStats, NewBookingRequest, NoopSlotRelease, SlotRelease};
pub use gallery::{GalleryService, UploadFile, UploadOutcome};
