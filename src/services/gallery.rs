use std::sync::Arc;

use crate::entities::booking_image;
use crate::error::{AppError, AppResult};
use crate::repository::{BookingRepository, ImageRepository, NewBookingImage};
use crate::storage::{storage_name_for, ImageStore};

// Column widths of `booking_image`.
const MAX_IMAGE_NAME_CHARS: usize = 255;
const MAX_MIME_TYPE_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 1000;
const MAX_UPLOADED_BY_CHARS: usize = 100;

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Result of one file in a batch upload.
#[derive(Debug)]
pub struct UploadOutcome {
    pub file_name: String,
    pub result: AppResult<booking_image::Model>,
}

/// Per-booking image gallery.
///
/// Keeps exactly one primary image for every booking that has images, and
/// keeps metadata rows and stored bytes in step: bytes are written before a
/// row exists, and rows are removed even if the bytes cannot be.
pub struct GalleryService {
    bookings: Arc<dyn BookingRepository>,
    images: Arc<dyn ImageRepository>,
    store: Arc<dyn ImageStore>,
    max_image_bytes: usize,
}

impl GalleryService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        images: Arc<dyn ImageRepository>,
        store: Arc<dyn ImageStore>,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            bookings,
            images,
            store,
            max_image_bytes,
        }
    }

    pub async fn upload(
        &self,
        booking_id: i64,
        file: UploadFile,
        description: Option<String>,
        uploaded_by: &str,
    ) -> AppResult<booking_image::Model> {
        self.ensure_booking(booking_id).await?;
        self.validate(&file)?;
        let description = clean_description(description)?;
        check_length("Uploader", uploaded_by, MAX_UPLOADED_BY_CHARS)?;

        let storage_name = storage_name_for(&file.file_name);
        let image_url = self.store.write(&storage_name, &file.bytes).await?;

        // First image of the booking becomes its primary image.
        let existing = self.images.count_by_booking_id(booking_id).await?;

        let inserted = self
            .images
            .insert(NewBookingImage {
                booking_id,
                image_url,
                image_name: file.file_name,
                image_size: file.bytes.len() as i64,
                mime_type: file.content_type,
                is_primary: existing == 0,
                description,
                uploaded_by: uploaded_by.to_string(),
            })
            .await;

        let image = match inserted {
            Ok(image) => image,
            Err(err) => {
                self.remove_bytes(&storage_name).await;
                return Err(err);
            }
        };

        tracing::info!(
            booking_id,
            image_id = image.id,
            storage_name = %storage_name,
            size = image.image_size,
            is_primary = image.is_primary,
            "Booking image uploaded"
        );
        Ok(image)
    }

    /// Upload each file in order. A failing file does not stop the batch;
    /// its error is reported in the returned outcome instead.
    pub async fn upload_batch(
        &self,
        booking_id: i64,
        files: Vec<UploadFile>,
        uploaded_by: &str,
    ) -> AppResult<Vec<UploadOutcome>> {
        self.ensure_booking(booking_id).await?;

        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            let file_name = file.file_name.clone();
            let result = self.upload(booking_id, file, None, uploaded_by).await;
            if let Err(err) = &result {
                tracing::warn!(booking_id, file_name = %file_name, error = %err, "Batch upload skipped file");
            }
            outcomes.push(UploadOutcome { file_name, result });
        }

        Ok(outcomes)
    }

    pub async fn get(&self, image_id: i64) -> AppResult<booking_image::Model> {
        self.images
            .find_by_id(image_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Image not found with id: {}", image_id)))
    }

    /// Like [`GalleryService::get`], but an image owned by another booking is
    /// reported as missing.
    pub async fn get_for_booking(
        &self,
        booking_id: i64,
        image_id: i64,
    ) -> AppResult<booking_image::Model> {
        let image = self.get(image_id).await?;
        if image.booking_id != booking_id {
            return Err(AppError::NotFound(format!(
                "Image {} does not belong to booking {}",
                image_id, booking_id
            )));
        }
        Ok(image)
    }

    pub async fn list(&self, booking_id: i64) -> AppResult<Vec<booking_image::Model>> {
        self.images.find_by_booking_id(booking_id).await
    }

    pub async fn primary(&self, booking_id: i64) -> AppResult<Option<booking_image::Model>> {
        self.images.find_primary_by_booking_id(booking_id).await
    }

    pub async fn count(&self, booking_id: i64) -> AppResult<u64> {
        self.images.count_by_booking_id(booking_id).await
    }

    pub async fn total_size(&self, booking_id: i64) -> AppResult<i64> {
        let images = self.images.find_by_booking_id(booking_id).await?;
        Ok(images.iter().map(|i| i.image_size).sum())
    }

    /// Case-insensitive file name search, newest first. A blank keyword
    /// lists the whole gallery.
    pub async fn search(
        &self,
        booking_id: i64,
        keyword: &str,
    ) -> AppResult<Vec<booking_image::Model>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return self.list(booking_id).await;
        }
        self.images.search_by_name(booking_id, keyword).await
    }

    pub async fn update_description(
        &self,
        image_id: i64,
        description: Option<String>,
    ) -> AppResult<booking_image::Model> {
        let description = clean_description(description)?;
        self.images
            .update_description(image_id, description)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Image not found with id: {}", image_id)))
    }

    pub async fn set_primary(&self, image_id: i64) -> AppResult<booking_image::Model> {
        let image = self.get(image_id).await?;
        self.images.set_primary(image.booking_id, image.id).await?;

        tracing::info!(booking_id = image.booking_id, image_id, "Primary image changed");
        self.get(image_id).await
    }

    pub async fn delete(&self, image_id: i64) -> AppResult<()> {
        let image = self.get(image_id).await?;
        self.remove_stored(&image).await;

        if image.is_primary {
            let successor = self
                .images
                .find_by_booking_id(image.booking_id)
                .await?
                .into_iter()
                .find(|other| other.id != image.id);

            // Promoting also clears the flag on the image being deleted.
            if let Some(next) = successor {
                self.images.set_primary(image.booking_id, next.id).await?;
                tracing::info!(
                    booking_id = image.booking_id,
                    image_id = next.id,
                    "Promoted image to primary"
                );
            }
        }

        self.images.delete_by_id(image.id).await?;
        tracing::info!(booking_id = image.booking_id, image_id, "Booking image deleted");
        Ok(())
    }

    /// Remove every image of a booking. Returns the number of rows removed.
    pub async fn delete_all(&self, booking_id: i64) -> AppResult<u64> {
        let images = self.images.find_by_booking_id(booking_id).await?;
        for image in &images {
            self.remove_stored(image).await;
        }

        let removed = self.images.delete_by_booking_id(booking_id).await?;
        tracing::info!(booking_id, removed, "All booking images deleted");
        Ok(removed)
    }

    async fn ensure_booking(&self, booking_id: i64) -> AppResult<()> {
        self.bookings
            .find_by_id(booking_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Booking not found with id: {}", booking_id)))
    }

    fn validate(&self, file: &UploadFile) -> AppResult<()> {
        if file.bytes.is_empty() {
            return Err(AppError::BadRequest("File is empty".to_string()));
        }
        if !file.content_type.starts_with("image/") {
            return Err(AppError::BadRequest("File must be an image".to_string()));
        }
        if file.bytes.len() > self.max_image_bytes {
            return Err(AppError::BadRequest(format!(
                "File size must not exceed {} bytes",
                self.max_image_bytes
            )));
        }
        check_length("File name", &file.file_name, MAX_IMAGE_NAME_CHARS)?;
        check_length("MIME type", &file.content_type, MAX_MIME_TYPE_CHARS)?;
        Ok(())
    }

    async fn remove_stored(&self, image: &booking_image::Model) {
        match self.store.name_from_url(&image.image_url) {
            Some(name) => self.remove_bytes(name).await,
            None => tracing::warn!(
                image_id = image.id,
                image_url = %image.image_url,
                "Cannot derive storage name from image url"
            ),
        }
    }

    /// Storage failures here are logged and swallowed; the metadata change
    /// goes ahead and the file is left for an orphan sweep.
    async fn remove_bytes(&self, storage_name: &str) {
        match self.store.delete(storage_name).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(storage_name = %storage_name, "Image bytes already absent")
            }
            Err(err) => {
                tracing::warn!(storage_name = %storage_name, error = %err, "Failed to delete image bytes")
            }
        }
    }
}

/// Trimmed description; blank becomes `None`.
fn clean_description(description: Option<String>) -> AppResult<Option<String>> {
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if let Some(text) = &description {
        check_length("Description", text, MAX_DESCRIPTION_CHARS)?;
    }
    Ok(description)
}

fn check_length(field: &str, value: &str, max_chars: usize) -> AppResult<()> {
    if value.chars().count() > max_chars {
        return Err(AppError::BadRequest(format!(
            "{} must not exceed {} characters",
            field, max_chars
        )));
    }
    Ok(())
}
