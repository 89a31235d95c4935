//! Organized path computation for discovered media
//!
//! Pure functions mapping a media item plus user preferences to a
//! relative `folder/filename` destination, along with the download
//! manifest generation and export built on the same rules. No I/O
//! happens here; everything is deterministic for a fixed input.

use crate::feed::models::{MediaItem, MediaType};
use crate::utils::config::{DateFormat, FolderStructure, OrganizationPreferences};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed root folder every organized path lives under
pub const ORGANIZED_ROOT: &str = "grok-imagine";

/// Maximum prompt length used in filenames
const PROMPT_FILENAME_LIMIT: usize = 30;

/// Maximum prompt length used in folder names
const PROMPT_FOLDER_LIMIT: usize = 50;

/// File extension for a resource URL.
///
/// Shares the classifier's URL substring heuristic, so the extension is
/// always consistent with the item's derived media type.
pub fn media_extension(url: &str) -> &'static str {
    MediaType::from_url(url).extension()
}

/// Compute the organized `folder/filename` destination for an item.
pub fn organized_path(item: &MediaItem, prefs: &OrganizationPreferences) -> String {
    let ext = media_extension(&item.url);
    let filename = render_filename(item, &prefs.filename_template, ext);

    let folder = match prefs.folder_structure {
        FolderStructure::Flat => ORGANIZED_ROOT.to_string(),
        FolderStructure::Date => format!(
            "{}/{}",
            ORGANIZED_ROOT,
            format_date_folder(item.date.as_deref(), prefs.date_format)
        ),
        FolderStructure::Prompt => format!(
            "{}/{}",
            ORGANIZED_ROOT,
            sanitize_prompt(item.prompt.as_deref())
        ),
    };

    format!("{}/{}", folder, filename)
}

/// Render a filename from the template.
///
/// Each placeholder is substituted at its first occurrence only; a
/// template repeating `{id}` keeps the later occurrences verbatim.
/// Runs of `.` in the result collapse to a single `.`.
pub fn render_filename(item: &MediaItem, template: &str, ext: &str) -> String {
    let id = item
        .id
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown");
    let date = item
        .date
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());

    let filename = template
        .replacen("{id}", id, 1)
        .replacen("{ext}", ext, 1)
        .replacen("{date}", &date, 1)
        .replacen("{prompt}", &prompt_token(item.prompt.as_deref()), 1);

    collapse_dots(&filename)
}

/// Prompt token for filenames: first 30 chars, case preserved, every
/// non-alphanumeric char replaced with `_`; `generated` when absent.
fn prompt_token(prompt: Option<&str>) -> String {
    let raw = prompt.filter(|p| !p.is_empty()).unwrap_or("generated");
    raw.chars()
        .take(PROMPT_FILENAME_LIMIT)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Sanitize a prompt into a folder name.
///
/// Truncates to 50 chars, lowercases, strips everything outside
/// `[a-z0-9\s-]`, collapses whitespace/hyphen/underscore runs into a
/// single `_`, trims edge underscores. Empty results fall back to
/// `generated`.
pub fn sanitize_prompt(prompt: Option<&str>) -> String {
    let Some(raw) = prompt.filter(|p| !p.is_empty()) else {
        return "generated".to_string();
    };

    let truncated: String = raw.chars().take(PROMPT_FOLDER_LIMIT).collect();
    let mut sanitized = String::with_capacity(truncated.len());
    let mut prev_sep = true; // swallows leading separators
    for c in truncated.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            sanitized.push(c);
            prev_sep = false;
        } else if c.is_whitespace() || c == '-' {
            if !prev_sep {
                sanitized.push('_');
                prev_sep = true;
            }
        }
        // anything else is stripped outright
    }
    while sanitized.ends_with('_') {
        sanitized.pop();
    }

    if sanitized.is_empty() {
        "generated".to_string()
    } else {
        sanitized
    }
}

/// Date folder string in dash (`yyyy-mm-dd`) or slash (`yyyy/mm/dd`) form.
///
/// Unparseable or missing dates fall back to today.
pub fn format_date_folder(date: Option<&str>, format: DateFormat) -> String {
    let date = parse_item_date(date).unwrap_or_else(|| Utc::now().date_naive());
    match format {
        DateFormat::Dash => date.format("%Y-%m-%d").to_string(),
        DateFormat::Slash => date.format("%Y/%m/%d").to_string(),
    }
}

/// Parse an item's ISO-8601 date string.
pub fn parse_item_date(date: Option<&str>) -> Option<NaiveDate> {
    let raw = date.filter(|s| !s.is_empty())?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    None
}

/// Effective date of an item, falling back to today.
pub fn extract_date(item: &MediaItem) -> NaiveDate {
    parse_item_date(item.date.as_deref()).unwrap_or_else(|| Utc::now().date_naive())
}

/// Whether an item falls within the inclusive date bounds.
pub fn is_in_date_range(
    item: &MediaItem,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> bool {
    let date = extract_date(item);
    if from.is_some_and(|f| date < f) {
        return false;
    }
    if to.is_some_and(|t| date > t) {
        return false;
    }
    true
}

/// Keep only the items within the inclusive date bounds.
pub fn filter_by_date_range(
    items: &[MediaItem],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<MediaItem> {
    items
        .iter()
        .filter(|item| is_in_date_range(item, from, to))
        .cloned()
        .collect()
}

/// Group items by their dash-formatted date.
pub fn group_by_date(items: &[MediaItem]) -> BTreeMap<String, Vec<MediaItem>> {
    let mut groups: BTreeMap<String, Vec<MediaItem>> = BTreeMap::new();
    for item in items {
        let key = format_date_folder(item.date.as_deref(), DateFormat::Dash);
        groups.entry(key).or_default().push(item.clone());
    }
    groups
}

/// Manifest describing one batch of organized downloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadManifest {
    pub export_date: DateTime<Utc>,
    pub total_items: usize,
    pub folder_structure: FolderStructure,
    pub filename_template: String,
    pub items: Vec<ManifestItem>,
}

/// One item of a manifest, with the derived filename and type attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    pub filename: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

/// Build the manifest for a batch of items.
pub fn build_manifest(
    items: &[MediaItem],
    prefs: &OrganizationPreferences,
) -> DownloadManifest {
    let manifest_items = items
        .iter()
        .map(|item| {
            let ext = media_extension(&item.url);
            ManifestItem {
                id: item.id.clone(),
                url: item.url.clone(),
                filename: render_filename(item, &prefs.filename_template, ext),
                date: item
                    .date
                    .clone()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| Utc::now().to_rfc3339()),
                prompt: item.prompt.clone(),
                media_type: item.media_type(),
            }
        })
        .collect();

    DownloadManifest {
        export_date: Utc::now(),
        total_items: items.len(),
        folder_structure: prefs.folder_structure,
        filename_template: prefs.filename_template.clone(),
        items: manifest_items,
    }
}

/// Export a batch manifest as pretty-printed JSON.
pub fn manifest_json(items: &[MediaItem], prefs: &OrganizationPreferences) -> Result<String> {
    let manifest = build_manifest(items, prefs);
    Ok(serde_json::to_string_pretty(&manifest)?)
}

/// Export a batch manifest as CSV (`ID,Date,Type,Prompt,Filename,URL`).
pub fn manifest_csv(items: &[MediaItem], prefs: &OrganizationPreferences) -> String {
    let manifest = build_manifest(items, prefs);
    let mut lines = vec!["ID,Date,Type,Prompt,Filename,URL".to_string()];
    for item in &manifest.items {
        lines.push(format!(
            "{},{},{},{},{},{}",
            item.id.as_deref().unwrap_or_default(),
            item.date,
            item.media_type.as_str(),
            csv_escape(item.prompt.as_deref().unwrap_or_default()),
            item.filename,
            item.url,
        ));
    }
    lines.join("\n")
}

/// Double-quote a CSV field, escaping embedded quotes.
pub(crate) fn csv_escape(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn collapse_dots(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_dot = false;
    for c in name.chars() {
        if c == '.' {
            if prev_dot {
                continue;
            }
            prev_dot = true;
        } else {
            prev_dot = false;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_item() -> MediaItem {
        MediaItem {
            id: Some("abc123".to_string()),
            url: "https://assets.example.com/gen/x.mp4".to_string(),
            date: Some("2024-03-05".to_string()),
            prompt: Some("Mountains at dawn".to_string()),
        }
    }

    #[test]
    fn test_date_folder_path() {
        let prefs = OrganizationPreferences {
            filename_template: "{id}_{date}.{ext}".to_string(),
            ..Default::default()
        };
        assert_eq!(
            organized_path(&sample_item(), &prefs),
            "grok-imagine/2024-03-05/abc123_2024-03-05.mp4"
        );
    }

    #[test]
    fn test_slash_date_folder() {
        let prefs = OrganizationPreferences {
            date_format: DateFormat::Slash,
            ..Default::default()
        };
        assert_eq!(
            organized_path(&sample_item(), &prefs),
            "grok-imagine/2024/03/05/abc123.mp4"
        );
    }

    #[test]
    fn test_flat_folder() {
        let prefs = OrganizationPreferences {
            folder_structure: FolderStructure::Flat,
            ..Default::default()
        };
        assert_eq!(organized_path(&sample_item(), &prefs), "grok-imagine/abc123.mp4");
    }

    #[test]
    fn test_prompt_folder() {
        let prefs = OrganizationPreferences {
            folder_structure: FolderStructure::Prompt,
            ..Default::default()
        };
        assert_eq!(
            organized_path(&sample_item(), &prefs),
            "grok-imagine/mountains_at_dawn/abc123.mp4"
        );
    }

    #[test]
    fn test_image_extension_for_non_mp4() {
        let item = MediaItem {
            url: "https://assets.example.com/gen/x.png".to_string(),
            ..sample_item()
        };
        let prefs = OrganizationPreferences::default();
        assert!(organized_path(&item, &prefs).ends_with("abc123.jpg"));
    }

    #[test]
    fn test_dot_runs_collapse() {
        let item = sample_item();
        assert_eq!(render_filename(&item, "{id}..{ext}", "mp4"), "abc123.mp4");
        assert_eq!(render_filename(&item, "a...b.{ext}", "jpg"), "a.b.jpg");
    }

    #[test]
    fn test_single_pass_substitution() {
        // repeated placeholders keep later occurrences verbatim
        let item = sample_item();
        assert_eq!(
            render_filename(&item, "{id}_{id}.{ext}", "mp4"),
            "abc123_{id}.mp4"
        );
    }

    #[test]
    fn test_filename_fallbacks() {
        let item = MediaItem {
            id: None,
            url: "https://assets.example.com/gen/x.mp4".to_string(),
            date: Some("2024-03-05".to_string()),
            prompt: None,
        };
        assert_eq!(
            render_filename(&item, "{id}_{prompt}.{ext}", "mp4"),
            "unknown_generated.mp4"
        );
    }

    #[test]
    fn test_prompt_token_preserves_case() {
        let item = MediaItem {
            prompt: Some("Mountains at dawn!".to_string()),
            ..sample_item()
        };
        assert_eq!(
            render_filename(&item, "{prompt}.{ext}", "jpg"),
            "Mountains_at_dawn_.jpg"
        );
    }

    #[test]
    fn test_prompt_token_truncates_to_thirty() {
        let item = MediaItem {
            prompt: Some("a".repeat(45)),
            ..sample_item()
        };
        let rendered = render_filename(&item, "{prompt}.{ext}", "jpg");
        assert_eq!(rendered, format!("{}.jpg", "a".repeat(30)));
    }

    #[test]
    fn test_sanitize_prompt() {
        assert_eq!(
            sanitize_prompt(Some("A Wild, Crazy--Idea!!")),
            "a_wild_crazy_idea"
        );
        assert_eq!(sanitize_prompt(Some("  spaced   out  ")), "spaced_out");
        assert_eq!(sanitize_prompt(Some("!!!")), "generated");
        assert_eq!(sanitize_prompt(Some("")), "generated");
        assert_eq!(sanitize_prompt(None), "generated");
    }

    #[test]
    fn test_sanitize_prompt_truncates_to_fifty() {
        let long = "word ".repeat(20);
        let sanitized = sanitize_prompt(Some(&long));
        assert!(sanitized.len() <= PROMPT_FOLDER_LIMIT);
        assert!(sanitized.starts_with("word_word"));
    }

    #[test]
    fn test_date_parsing() {
        assert_eq!(
            parse_item_date(Some("2024-03-05")),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(
            parse_item_date(Some("2024-03-05T10:30:00Z")),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(parse_item_date(Some("not a date")), None);
        assert_eq!(parse_item_date(None), None);
    }

    #[test]
    fn test_filter_by_date_range_inclusive() {
        let items: Vec<MediaItem> = ["2024-03-04", "2024-03-05", "2024-03-06"]
            .iter()
            .map(|d| MediaItem {
                date: Some(d.to_string()),
                ..sample_item()
            })
            .collect();

        let from = NaiveDate::from_ymd_opt(2024, 3, 5);
        let to = NaiveDate::from_ymd_opt(2024, 3, 5);
        let filtered = filter_by_date_range(&items, from, to);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].date.as_deref(), Some("2024-03-05"));

        let open_ended = filter_by_date_range(&items, from, None);
        assert_eq!(open_ended.len(), 2);
    }

    #[test]
    fn test_group_by_date() {
        let mut items = vec![sample_item(), sample_item()];
        items[1].date = Some("2024-04-01".to_string());
        let groups = group_by_date(&items);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["2024-03-05"].len(), 1);
        assert_eq!(groups["2024-04-01"].len(), 1);
    }

    #[test]
    fn test_manifest_json_roundtrip() {
        let items = vec![
            sample_item(),
            MediaItem {
                id: Some("def456".to_string()),
                url: "https://assets.example.com/gen/y.jpg".to_string(),
                date: None,
                prompt: None,
            },
        ];
        let prefs = OrganizationPreferences::default();

        let json = manifest_json(&items, &prefs).unwrap();
        let parsed: DownloadManifest = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.items.len(), items.len());
        assert_eq!(parsed.total_items, items.len());
        for (original, exported) in items.iter().zip(&parsed.items) {
            assert_eq!(original.id, exported.id);
            assert_eq!(original.url, exported.url);
        }
    }

    #[test]
    fn test_manifest_csv_escapes_prompt() {
        let item = MediaItem {
            prompt: Some("say \"cheese\", please".to_string()),
            ..sample_item()
        };
        let prefs = OrganizationPreferences::default();
        let csv = manifest_csv(&[item], &prefs);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("ID,Date,Type,Prompt,Filename,URL"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"say \"\"cheese\"\", please\""));
        assert!(row.contains("video"));
    }

    proptest! {
        #[test]
        fn organized_path_is_deterministic(
            id in proptest::option::of("[A-Za-z0-9]{1,12}"),
            prompt in proptest::option::of("[A-Za-z0-9 .,!-]{0,40}"),
            date in proptest::option::of("2024-0[1-9]-1[0-9]"),
            video in any::<bool>(),
        ) {
            let url = if video {
                "https://assets.example.com/gen/clip.mp4".to_string()
            } else {
                "https://assets.example.com/gen/pic.png".to_string()
            };
            let item = MediaItem { id, url, date, prompt };
            let prefs = OrganizationPreferences {
                folder_structure: FolderStructure::Prompt,
                filename_template: "{id}_{prompt}.{ext}".to_string(),
                ..Default::default()
            };

            let first = organized_path(&item, &prefs);
            let second = organized_path(&item, &prefs);
            prop_assert_eq!(&first, &second);
            prop_assert!(!first.is_empty());
            prop_assert!(!first.contains(".."));
            prop_assert!(first.starts_with("grok-imagine/"));
        }
    }
}
