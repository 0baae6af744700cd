//! Shared key generation for storage backends and the ingestion pipeline.
//!
//! Key format: `documents/{owner}/{filename}`, `pages/{owner}/{doc}/page-{n}.svg`,
//! `thumbnails/{owner}/{doc}.svg`. Owner ids are opaque strings; any character
//! outside `[A-Za-z0-9._-]` is replaced so keys stay path-safe.

use uuid::Uuid;

fn sanitize_segment(segment: &str) -> String {
    if segment.contains("..") {
        return "_".to_string();
    }
    let s: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.is_empty() {
        "_".to_string()
    } else {
        s
    }
}

/// Key for the raw uploaded document.
pub fn document_key(owner_id: &str, filename: &str) -> String {
    format!(
        "documents/{}/{}",
        sanitize_segment(owner_id),
        sanitize_segment(filename)
    )
}

/// Key for one rendered page asset.
pub fn page_asset_key(owner_id: &str, document_id: Uuid, page_number: u32) -> String {
    format!(
        "pages/{}/{}/page-{}.svg",
        sanitize_segment(owner_id),
        document_id,
        page_number
    )
}

/// Key for the cover thumbnail.
pub fn thumbnail_key(owner_id: &str, document_id: Uuid) -> String {
    format!("thumbnails/{}/{}.svg", sanitize_segment(owner_id), document_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_key_layout() {
        let key = document_key("google-123", "abc.pdf");
        assert_eq!(key, "documents/google-123/abc.pdf");
    }

    #[test]
    fn test_keys_sanitize_hostile_segments() {
        let key = document_key("../evil", "../../passwd");
        assert_eq!(key, "documents/_/_");

        let key = page_asset_key("a/b", Uuid::nil(), 2);
        assert_eq!(key.split('/').count(), 4);
        assert!(key.starts_with("pages/a_b/"));
        assert!(key.ends_with("page-2.svg"));
    }

    #[test]
    fn test_thumbnail_key_layout() {
        let id = Uuid::nil();
        let key = thumbnail_key("user", id);
        assert_eq!(
            key,
            "thumbnails/user/00000000-0000-0000-0000-000000000000.svg"
        );
    }

    #[test]
    fn test_empty_owner_falls_back() {
        let key = document_key("", "a.pdf");
        assert_eq!(key, "documents/_/a.pdf");
    }
}
