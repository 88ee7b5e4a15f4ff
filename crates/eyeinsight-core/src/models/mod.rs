//! Data models for EyeInsight entities.
//!
//! - `User`, `SignupProfile`: account records exchanged with the auth endpoints
//! - `ScanRecord`: a retinal scan and its prediction
//! - `ScanFilter`, `ScanStatus`: report list filtering and classification

mod de;
pub mod scan;
pub mod user;

pub use scan::{ScanFilter, ScanListResponse, ScanRecord, ScanStatus, UploadResponse};
pub use user::{SignupProfile, User};
