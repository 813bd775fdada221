pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod services;
pub mod storage;
pub mod utils;

use std::sync::Arc;

pub use config::Config;
pub use error::{AppError, AppResult};

use repository::{BookingRepository, ImageRepository};
use services::{BookingService, GalleryService, SlotRelease};
use storage::ImageStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub bookings: Arc<BookingService>,
    pub gallery: Arc<GalleryService>,
}

impl AppState {
    pub fn new(
        config: Config,
        bookings: Arc<dyn BookingRepository>,
        images: Arc<dyn ImageRepository>,
        store: Arc<dyn ImageStore>,
        slot_release: Arc<dyn SlotRelease>,
    ) -> Self {
        let booking_service = BookingService::new(
            bookings.clone(),
            slot_release,
            config.strict_status_transitions,
        );
        let gallery_service =
            GalleryService::new(bookings, images, store, config.max_image_bytes);

        Self {
            config,
            bookings: Arc::new(booking_service),
            gallery: Arc::new(gallery_service),
        }
    }
}
