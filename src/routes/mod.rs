use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::services::ServeDir;

use crate::handlers::{bookings, customer, images};
use crate::middleware::auth::{auth_middleware, require_staff};
use crate::middleware::user_rate_limit::create_customer_governor;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let customer_governor = create_customer_governor();

    // Multipart uploads get their own body limit
    let upload_routes = Router::new()
        .route("/bookings/{id}/images/upload", post(images::upload_image))
        .route(
            "/bookings/{id}/images/upload-multiple",
            post(images::upload_images),
        )
        .layer(DefaultBodyLimit::max(state.config.max_request_bytes));

    // Admin routes (requires auth + admin or staff role)
    let admin_routes = Router::new()
        // Booking management
        .route("/bookings", get(bookings::list_bookings))
        .route(
            "/bookings/{id}",
            get(bookings::get_booking).delete(bookings::delete_booking),
        )
        .route("/bookings/{id}/status", put(bookings::update_status))
        .route("/bookings/{id}/cancel", put(bookings::cancel_booking))
        .route("/bookings/{id}/refund", put(bookings::refund_booking))
        .route("/stats/bookings", get(bookings::monthly_stats))
        // Booking gallery
        .route(
            "/bookings/{id}/images",
            get(images::list_images).delete(images::delete_all_images),
        )
        .route("/bookings/{id}/images/primary", get(images::primary_image))
        .route(
            "/bookings/{id}/images/{image_id}",
            get(images::get_image).delete(images::delete_image),
        )
        .route(
            "/bookings/{id}/images/{image_id}/set-primary",
            put(images::set_primary_image),
        )
        .route(
            "/bookings/{id}/images/{image_id}/description",
            put(images::update_description),
        )
        .merge(upload_routes)
        .layer(middleware::from_fn(require_staff))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Customer routes (requires auth, any role)
    // Rate limit: 100 requests per minute per user
    let customer_routes = Router::new()
        .route("/", post(customer::create_booking).get(customer::my_bookings))
        .layer(customer_governor)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Uploaded images are public static files
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .nest("/api/admin", admin_routes)
        .nest("/api/bookings", customer_routes)
        .nest_service(&state.config.upload_url_prefix, uploads)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::repository::memory::{MemoryBookingRepository, MemoryImageRepository};
    use crate::services::NoopSlotRelease;
    use crate::storage::memory::MemoryImageStore;
    use crate::utils::jwt::{create_token, Role};

    const BOUNDARY: &str = "gallery-boundary";

    struct TestApp {
        router: Router,
        staff_token: String,
        customer_token: String,
        _dir: tempfile::TempDir,
    }

    fn test_app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_tests(dir.path().to_path_buf());
        let staff_token = create_token(1, "mai.staff", Role::Staff, &config.jwt_secret);
        let customer_token = create_token(42, "an.customer", Role::Customer, &config.jwt_secret);

        let state = AppState::new(
            config,
            Arc::new(MemoryBookingRepository::new()),
            Arc::new(MemoryImageRepository::new()),
            Arc::new(MemoryImageStore::new()),
            Arc::new(NoopSlotRelease),
        );

        TestApp {
            router: create_router(state),
            staff_token,
            customer_token,
            _dir: dir,
        }
    }

    impl TestApp {
        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        async fn json(
            &self,
            method: &str,
            uri: &str,
            token: &str,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let builder = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token));
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.send(request).await;
            let status = response.status();
            (status, read_json(response).await)
        }

        async fn create_booking(&self) -> Value {
            let (status, body) = self
                .json(
                    "POST",
                    "/api/bookings",
                    &self.customer_token,
                    Some(json!({
                        "tourId": 3,
                        "adultCount": 2,
                        "childCount": 1,
                        "totalAmount": "450.00"
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{}", body);
            body
        }

        async fn upload(&self, booking_id: i64, parts: &[(&str, &str, &str, &[u8])]) -> (StatusCode, Value) {
            let endpoint = if parts.len() > 1 { "upload-multiple" } else { "upload" };
            self.upload_to(booking_id, endpoint, parts).await
        }

        async fn upload_to(
            &self,
            booking_id: i64,
            endpoint: &str,
            parts: &[(&str, &str, &str, &[u8])],
        ) -> (StatusCode, Value) {
            let uri = format!("/api/admin/bookings/{}/images/{}", booking_id, endpoint);
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.staff_token))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap();

            let response = self.send(request).await;
            let status = response.status();
            (status, read_json(response).await)
        }
    }

    async fn read_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        if bytes.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    }

    /// Parts are (field name, file name, content type, bytes).
    fn multipart_body(parts: &[(&str, &str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (field, file_name, content_type, bytes) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    field, file_name
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app = test_app();
        let request = Request::builder()
            .uri("/api/admin/bookings")
            .body(Body::empty())
            .unwrap();

        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_customer_cannot_use_admin_routes() {
        let app = test_app();
        let (status, body) = app
            .json("GET", "/api/admin/bookings", &app.customer_token, None)
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Staff access required");
    }

    #[tokio::test]
    async fn test_customer_creates_and_lists_own_bookings() {
        let app = test_app();
        let created = app.create_booking().await;

        assert_eq!(created["status"], "PENDING");
        assert_eq!(created["userId"], 42);
        assert_eq!(created["participants"], 3);
        assert!(created["bookingCode"].as_str().unwrap().starts_with("BK"));

        let (status, page) = app.json("GET", "/api/bookings", &app.customer_token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["totalElements"], 1);
        assert_eq!(page["items"][0]["id"], created["id"]);
    }

    #[tokio::test]
    async fn test_staff_lifecycle_endpoints() {
        let app = test_app();
        let id = app.create_booking().await["id"].as_i64().unwrap();

        let (status, body) = app
            .json(
                "PUT",
                &format!("/api/admin/bookings/{}/status", id),
                &app.staff_token,
                Some(json!({ "status": "confirmed" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "CONFIRMED");

        let (status, _) = app
            .json(
                "PUT",
                &format!("/api/admin/bookings/{}/status", id),
                &app.staff_token,
                Some(json!({ "status": "SHIPPED" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .json(
                "PUT",
                &format!("/api/admin/bookings/{}/cancel", id),
                &app.staff_token,
                Some(json!({ "reason": "weather" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "CANCELLED");
        assert_eq!(body["notes"], "Cancelled: weather");

        let (status, body) = app
            .json(
                "PUT",
                &format!("/api/admin/bookings/{}/refund", id),
                &app.staff_token,
                Some(json!({ "amount": 500, "reason": "too much" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

        let (status, body) = app
            .json(
                "PUT",
                &format!("/api/admin/bookings/{}/refund", id),
                &app.staff_token,
                Some(json!({ "amount": 450, "reason": "weather" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "REFUNDED");

        let (status, page) = app
            .json(
                "GET",
                "/api/admin/bookings?status=REFUNDED&tourId=3",
                &app.staff_token,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["totalElements"], 1);
        assert_eq!(page["totalPages"], 1);
    }

    #[tokio::test]
    async fn test_unknown_booking_is_not_found() {
        let app = test_app();
        let (status, body) = app
            .json("GET", "/api/admin/bookings/999", &app.staff_token, None)
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Booking not found with id: 999");
    }

    #[tokio::test]
    async fn test_gallery_endpoints() {
        let app = test_app();
        let id = app.create_booking().await["id"].as_i64().unwrap();

        let (status, first) = app
            .upload(id, &[("file", "Beach.jpg", "image/jpeg", &b"jpeg-bytes"[..])])
            .await;
        assert_eq!(status, StatusCode::OK, "{}", first);
        assert_eq!(first["isPrimary"], true);
        assert_eq!(first["uploadedBy"], "mai.staff");
        assert_eq!(first["imageSize"], 10);

        let (status, batch) = app
            .upload(
                id,
                &[
                    ("files", "Mountain.png", "image/png", &b"png-bytes"[..]),
                    ("files", "notes.txt", "text/plain", &b"hello"[..]),
                    ("files", "empty.jpg", "image/jpeg", &b""[..]),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", batch);
        assert_eq!(batch["uploadedCount"], 1);
        assert_eq!(batch["failed"].as_array().unwrap().len(), 2);
        assert_eq!(batch["items"][0]["isPrimary"], false);
        let second_id = batch["items"][0]["id"].as_i64().unwrap();

        let (status, gallery) = app
            .json(
                "GET",
                &format!("/api/admin/bookings/{}/images?keyword=beach", id),
                &app.staff_token,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(gallery["totalCount"], 1);
        assert_eq!(gallery["imageCount"], 2);
        assert_eq!(gallery["totalSize"], 19);

        let (status, promoted) = app
            .json(
                "PUT",
                &format!("/api/admin/bookings/{}/images/{}/set-primary", id, second_id),
                &app.staff_token,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(promoted["isPrimary"], true);

        let (status, primary) = app
            .json(
                "GET",
                &format!("/api/admin/bookings/{}/images/primary", id),
                &app.staff_token,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(primary["id"], second_id);

        // Image addressed under another booking
        let other = app.create_booking().await["id"].as_i64().unwrap();
        let (status, _) = app
            .json(
                "GET",
                &format!("/api/admin/bookings/{}/images/{}", other, second_id),
                &app.staff_token,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .json(
                "DELETE",
                &format!("/api/admin/bookings/{}/images/{}", id, second_id),
                &app.staff_token,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, primary) = app
            .json(
                "GET",
                &format!("/api/admin/bookings/{}/images/primary", id),
                &app.staff_token,
                None,
            )
            .await;
        assert_eq!(primary["id"], first["id"]);
    }

    #[tokio::test]
    async fn test_single_upload_rejects_several_files() {
        let app = test_app();
        let id = app.create_booking().await["id"].as_i64().unwrap();

        let (status, body) = app
            .upload_to(
                id,
                "upload",
                &[
                    ("file", "a.jpg", "image/jpeg", &b"a"[..]),
                    ("file", "b.jpg", "image/jpeg", &b"b"[..]),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

        let (_, gallery) = app
            .json(
                "GET",
                &format!("/api/admin/bookings/{}/images", id),
                &app.staff_token,
                None,
            )
            .await;
        assert_eq!(gallery["imageCount"], 0);
    }

    #[tokio::test]
    async fn test_delete_booking_clears_gallery() {
        let app = test_app();
        let id = app.create_booking().await["id"].as_i64().unwrap();
        app.upload(id, &[("file", "a.jpg", "image/jpeg", &b"a"[..])]).await;

        let (status, _) = app
            .json(
                "DELETE",
                &format!("/api/admin/bookings/{}", id),
                &app.staff_token,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .json(
                "GET",
                &format!("/api/admin/bookings/{}/images", id),
                &app.staff_token,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_monthly_stats_endpoint() {
        let app = test_app();
        app.create_booking().await;
        let now = chrono::Utc::now();
        let uri = format!(
            "/api/admin/stats/bookings?year={}&month={}",
            chrono::Datelike::year(&now),
            chrono::Datelike::month(&now)
        );

        let (status, stats) = app.json("GET", &uri, &app.staff_token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["count"], 1);
        assert_eq!(stats["revenue"], "450.00");
    }
}
