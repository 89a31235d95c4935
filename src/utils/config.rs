//! Organization preferences
//!
//! Serialized field names and enum values match the strings the settings
//! UI historically stored, so existing preference blobs keep loading.

use serde::{Deserialize, Serialize};

/// How organized downloads are grouped into folders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderStructure {
    Date,
    Prompt,
    Flat,
}

/// Rendering style for date folders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    #[serde(rename = "yyyy-mm-dd")]
    Dash,
    #[serde(rename = "yyyy/mm/dd")]
    Slash,
}

/// User preferences for folder structure and filename generation
///
/// Every field carries a serde default so a partially stored blob merges
/// over the defaults instead of failing to load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationPreferences {
    #[serde(default = "default_folder_structure")]
    pub folder_structure: FolderStructure,

    /// Filename pattern with `{id}`, `{ext}`, `{date}`, `{prompt}` placeholders
    #[serde(default = "default_filename_template")]
    pub filename_template: String,

    #[serde(default = "default_date_format")]
    pub date_format: DateFormat,

    /// Whether a manifest file is produced alongside the downloads
    #[serde(default = "default_include_metadata")]
    pub include_metadata: bool,
}

fn default_folder_structure() -> FolderStructure {
    FolderStructure::Date
}

fn default_filename_template() -> String {
    "{id}.{ext}".to_string()
}

fn default_date_format() -> DateFormat {
    DateFormat::Dash
}

fn default_include_metadata() -> bool {
    true
}

impl Default for OrganizationPreferences {
    fn default() -> Self {
        Self {
            folder_structure: default_folder_structure(),
            filename_template: default_filename_template(),
            date_format: default_date_format(),
            include_metadata: default_include_metadata(),
        }
    }
}
