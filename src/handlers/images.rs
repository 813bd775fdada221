use axum::{
    extract::{multipart::Field, Multipart, Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::entities::booking_image;
use crate::error::{AppError, AppResult};
use crate::services::{UploadFile, UploadOutcome};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListImagesQuery {
    pub keyword: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryResponse {
    pub items: Vec<booking_image::Model>,
    /// Number of images matching the keyword.
    pub total_count: usize,
    /// Number of images in the whole gallery.
    pub image_count: u64,
    pub total_size: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedUpload {
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUploadResponse {
    pub items: Vec<booking_image::Model>,
    pub uploaded_count: usize,
    pub failed: Vec<FailedUpload>,
}

impl From<Vec<UploadOutcome>> for BatchUploadResponse {
    fn from(outcomes: Vec<UploadOutcome>) -> Self {
        let mut items = Vec::new();
        let mut failed = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(image) => items.push(image),
                Err(err) => failed.push(FailedUpload {
                    file_name: outcome.file_name,
                    error: err.to_string(),
                }),
            }
        }

        Self {
            uploaded_count: items.len(),
            items,
            failed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateDescriptionRequest {
    pub description: Option<String>,
}

/// Fields of an upload form. `file` and `files` are both accepted.
#[derive(Debug, Default)]
struct UploadForm {
    files: Vec<UploadFile>,
    description: Option<String>,
    uploaded_by: Option<String>,
}

async fn read_upload_form(multipart: &mut Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "files" => form.files.push(read_file(field).await?),
            "description" => form.description = Some(read_text(field).await?),
            "uploadedBy" => {
                let value = read_text(field).await?;
                if !value.trim().is_empty() {
                    form.uploaded_by = Some(value.trim().to_string());
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

async fn read_file(field: Field<'_>) -> AppResult<UploadFile> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read file {}: {}", file_name, e)))?;

    Ok(UploadFile {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    })
}

async fn read_text(field: Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form field: {}", e)))
}

/// Gallery of a booking, optionally filtered by file name
pub async fn list_images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ListImagesQuery>,
) -> AppResult<Json<GalleryResponse>> {
    state.bookings.get(id).await?;

    let items = state
        .gallery
        .search(id, query.keyword.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(GalleryResponse {
        total_count: items.len(),
        image_count: state.gallery.count(id).await?,
        total_size: state.gallery.total_size(id).await?,
        items,
    }))
}

pub async fn upload_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> AppResult<Json<booking_image::Model>> {
    let form = read_upload_form(&mut multipart).await?;
    if form.files.len() > 1 {
        return Err(AppError::BadRequest(
            "Only one file may be uploaded here, use upload-multiple for several".to_string(),
        ));
    }
    let file = form
        .files
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    let uploaded_by = form.uploaded_by.unwrap_or(claims.username);

    let image = state
        .gallery
        .upload(id, file, form.description, &uploaded_by)
        .await?;
    Ok(Json(image))
}

pub async fn upload_images(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> AppResult<Json<BatchUploadResponse>> {
    let form = read_upload_form(&mut multipart).await?;
    if form.files.is_empty() {
        return Err(AppError::BadRequest("No files provided".to_string()));
    }
    let uploaded_by = form.uploaded_by.unwrap_or(claims.username);

    let outcomes = state
        .gallery
        .upload_batch(id, form.files, &uploaded_by)
        .await?;
    Ok(Json(outcomes.into()))
}

pub async fn primary_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<booking_image::Model>> {
    state
        .gallery
        .primary(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Booking {} has no primary image", id)))
}

pub async fn get_image(
    State(state): State<AppState>,
    Path((id, image_id)): Path<(i64, i64)>,
) -> AppResult<Json<booking_image::Model>> {
    let image = state.gallery.get_for_booking(id, image_id).await?;
    Ok(Json(image))
}

pub async fn delete_image(
    State(state): State<AppState>,
    Path((id, image_id)): Path<(i64, i64)>,
) -> AppResult<Json<Value>> {
    state.gallery.get_for_booking(id, image_id).await?;
    state.gallery.delete(image_id).await?;

    Ok(Json(json!({ "message": "Image deleted successfully" })))
}

pub async fn delete_all_images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.bookings.get(id).await?;
    let removed = state.gallery.delete_all(id).await?;

    Ok(Json(json!({
        "message": "All images deleted successfully",
        "deletedCount": removed,
    })))
}

pub async fn set_primary_image(
    State(state): State<AppState>,
    Path((id, image_id)): Path<(i64, i64)>,
) -> AppResult<Json<booking_image::Model>> {
    state.gallery.get_for_booking(id, image_id).await?;
    let image = state.gallery.set_primary(image_id).await?;
    Ok(Json(image))
}

pub async fn update_description(
    State(state): State<AppState>,
    Path((id, image_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateDescriptionRequest>,
) -> AppResult<Json<booking_image::Model>> {
    state.gallery.get_for_booking(id, image_id).await?;

    let image = state
        .gallery
        .update_description(image_id, payload.description)
        .await?;
    Ok(Json(image))
}
