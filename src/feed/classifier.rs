//! Normalizing raw feed nodes into classified media

use crate::feed::models::{MediaType, RawNode};
use crate::utils::error::FavloaderError;
use anyhow::Result;

/// Classification result: derived type plus the page identifiers
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedMedia {
    pub media_type: MediaType,
    /// Page-assigned post id; `None` when the node carried no permalink.
    pub id: Option<String>,
    pub url: String,
}

/// Normalize a raw node into classified media.
///
/// Fails with `UnrecognizedNode` when the node carries no media URL.
/// Cards without a permalink still classify, but with `id: None`;
/// callers needing identifiers filter those out themselves.
pub fn classify(node: &RawNode) -> Result<ClassifiedMedia> {
    match node {
        RawNode::Card {
            media: Some(source),
            permalink,
            ..
        } if !source.url.is_empty() => Ok(ClassifiedMedia {
            media_type: MediaType::from_url(&source.url),
            id: permalink.as_deref().and_then(post_id_from_permalink),
            url: source.url.clone(),
        }),
        RawNode::Media(source) if !source.url.is_empty() => Ok(ClassifiedMedia {
            media_type: MediaType::from_url(&source.url),
            id: None,
            url: source.url.clone(),
        }),
        _ => Err(FavloaderError::UnrecognizedNode.into()),
    }
}

/// Extract the post id from a card permalink.
///
/// Structural, not semantic: the id is the trailing path segment
/// (`…/post/<id>`), with query string and fragment ignored.
pub fn post_id_from_permalink(href: &str) -> Option<String> {
    let path = href
        .split(['?', '#'])
        .next()
        .unwrap_or(href)
        .trim_end_matches('/');
    let segment = path.rsplit('/').next()?;
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::models::MediaSource;

    fn card(url: &str, permalink: Option<&str>) -> RawNode {
        RawNode::Card {
            media: Some(MediaSource {
                url: url.to_string(),
            }),
            permalink: permalink.map(str::to_string),
            caption: None,
            timestamp: None,
        }
    }

    #[test]
    fn test_classify_video_card() {
        let media = classify(&card(
            "https://assets.example.com/gen/clip.mp4",
            Some("https://example.com/post/abc123"),
        ))
        .unwrap();
        assert_eq!(media.media_type, MediaType::Video);
        assert_eq!(media.id.as_deref(), Some("abc123"));
        assert_eq!(media.url, "https://assets.example.com/gen/clip.mp4");
    }

    #[test]
    fn test_classify_image_card_without_permalink() {
        let media = classify(&card("https://assets.example.com/gen/pic.jpg", None)).unwrap();
        assert_eq!(media.media_type, MediaType::Image);
        assert_eq!(media.id, None);
    }

    #[test]
    fn test_classify_bare_media() {
        let media = classify(&RawNode::Media(MediaSource {
            url: "https://assets.example.com/gen/pic.jpg".to_string(),
        }))
        .unwrap();
        assert_eq!(media.media_type, MediaType::Image);
        assert_eq!(media.id, None);
    }

    #[test]
    fn test_unrecognized_nodes_fail() {
        let err = classify(&RawNode::Unrecognized).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FavloaderError>(),
            Some(FavloaderError::UnrecognizedNode)
        ));

        // card with no media source
        let empty = RawNode::Card {
            media: None,
            permalink: Some("/post/abc".to_string()),
            caption: None,
            timestamp: None,
        };
        assert!(classify(&empty).is_err());
    }

    #[test]
    fn test_post_id_extraction() {
        assert_eq!(
            post_id_from_permalink("https://example.com/post/abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(
            post_id_from_permalink("/post/abc123/"),
            Some("abc123".to_string())
        );
        assert_eq!(
            post_id_from_permalink("/post/abc123?ref=grid#frag"),
            Some("abc123".to_string())
        );
        assert_eq!(post_id_from_permalink(""), None);
        assert_eq!(post_id_from_permalink("/"), None);
    }
}
