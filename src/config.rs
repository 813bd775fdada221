use std::env;
use std::path::PathBuf;

const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    /// Directory holding uploaded booking images.
    pub upload_dir: PathBuf,
    /// Public URL prefix the upload directory is served under.
    pub upload_url_prefix: String,
    pub max_image_bytes: usize,
    /// Body limit for multipart upload routes.
    pub max_request_bytes: usize,
    /// Reject status changes that the booking state machine does not allow.
    pub strict_status_transitions: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            db_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("DATABASE_MAX_CONNECTIONS must be a number"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads/booking-images".to_string())
                .into(),
            upload_url_prefix: env::var("UPLOAD_URL_PREFIX")
                .unwrap_or_else(|_| "/uploads/booking-images".to_string())
                .trim_end_matches('/')
                .to_string(),
            max_image_bytes: env::var("MAX_IMAGE_BYTES")
                .map(|v| v.parse().expect("MAX_IMAGE_BYTES must be a number"))
                .unwrap_or(DEFAULT_MAX_IMAGE_BYTES),
            max_request_bytes: env::var("MAX_REQUEST_BYTES")
                .map(|v| v.parse().expect("MAX_REQUEST_BYTES must be a number"))
                .unwrap_or(DEFAULT_MAX_REQUEST_BYTES),
            strict_status_transitions: env::var("STRICT_STATUS_TRANSITIONS")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
impl Config {
    pub(crate) fn for_tests(upload_dir: PathBuf) -> Self {
        Self {
            database_url: "postgres://localhost/test".to_string(),
            db_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            upload_dir,
            upload_url_prefix: "/uploads/booking-images".to_string(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            strict_status_transitions: false,
        }
    }
}
