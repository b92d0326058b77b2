//! Object storage for uploaded files, using Apache OpenDAL.
//!
//! Backends:
//! - S3-compatible: AWS S3, Cloudflare R2, MinIO
//! - Local filesystem (development only)
//!
//! ```text
//! upload ──► validate_upload ──► op.write("uploads/{millis}-{uuid}.{ext}")
//! download ◄── op.presign_read(key, ttl) | public_base_url/key
//! ```

mod config;
mod error;
mod service;

pub use config::{StorageBackend, StorageConfig};
pub use error::StorageError;
pub use service::{SignedUrl, StorageService, UPLOAD_PREFIX};
