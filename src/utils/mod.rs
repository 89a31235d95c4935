//! Utility modules for error handling, configuration and path organization

pub mod config;
pub mod error;
pub mod organizer;

// Re-export for convenience
pub use config::{DateFormat, FolderStructure, OrganizationPreferences};
pub use error::FavloaderError;
pub use organizer::{organized_path, DownloadManifest, ManifestItem};
