//! Video URL recognition and canonical id extraction.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use super::VideoId;

/// Known video URL shapes: watch page, short clip, short link.
///
/// Anchored at the start only, so trailing query parameters (`&t=5s`) and
/// fragments are accepted.
#[allow(clippy::expect_used)]
static VIDEO_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com/(watch\?v=|shorts/)|youtu\.be/)[A-Za-z0-9_-]{11}")
        .expect("video URL regex is valid") // Static pattern, safe to panic
});

/// Unanchored variant used to find video URLs inside free text.
#[allow(clippy::expect_used)]
static VIDEO_URL_SEARCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(https?://)?(www\.)?(youtube\.com/(watch\?v=|shorts/)|youtu\.be/)[A-Za-z0-9_-]{11}[^\s<>()]*",
    )
    .expect("video URL search regex is valid") // Static pattern, safe to panic
});

const WATCH_HOSTS: [&str; 2] = ["www.youtube.com", "youtube.com"];
const SHORT_LINK_HOST: &str = "youtu.be";
const SHORTS_PREFIX: &str = "/shorts/";

/// Recognizes `text` as a video URL and returns its canonical id.
///
/// Returns `None` when the text does not start with one of the known URL
/// shapes or when the id cannot be extracted. The id is returned as found;
/// its length and alphabet are not re-validated.
///
/// # Examples
///
/// ```
/// use clipfetch_core::parser::recognize;
///
/// let id = recognize("https://youtu.be/dQw4w9WgXcQ").unwrap();
/// assert_eq!(id.as_str(), "dQw4w9WgXcQ");
/// assert!(recognize("https://example.com/video").is_none());
/// ```
#[must_use]
pub fn recognize(text: &str) -> Option<VideoId> {
    let candidate = text.trim();
    if !VIDEO_URL_PATTERN.is_match(candidate) {
        trace!(len = candidate.len(), "text is not a video URL");
        return None;
    }

    let id = extract_video_id(candidate);
    match &id {
        Some(id) => debug!(id = %id, "recognized video URL"),
        None => debug!(url = %candidate, "video URL matched but id is missing"),
    }
    id
}

/// Extracts the video id from a URL according to its host and path.
///
/// - watch page (`youtube.com/watch`): the `v` query parameter
/// - embed and legacy player paths (`/embed/ID`, `/v/ID`): the second segment
/// - short clips (`/shorts/ID`): the segment after the prefix
/// - short links (`youtu.be/ID`): the whole path without the leading `/`
///
/// A missing scheme is tolerated. Unknown hosts, unknown paths and empty
/// components yield `None`.
#[must_use]
pub fn extract_video_id(raw: &str) -> Option<VideoId> {
    let parsed = parse_lenient(raw.trim())?;
    let host = parsed.host_str()?;
    let path = parsed.path();

    let id = if WATCH_HOSTS.contains(&host) {
        if path == "/watch" {
            parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
        } else if path.starts_with("/embed/") || path.starts_with("/v/") {
            path.split('/').nth(2).map(str::to_string)
        } else if let Some(rest) = path.strip_prefix(SHORTS_PREFIX) {
            rest.split('/').next().map(str::to_string)
        } else {
            None
        }
    } else if host == SHORT_LINK_HOST {
        Some(path.trim_start_matches('/').to_string())
    } else {
        None
    }?;

    if id.is_empty() {
        return None;
    }
    Some(VideoId::new(id))
}

/// Finds every recognizable video URL in free text.
///
/// Returns `(id, url)` pairs in order of appearance, skipping repeats of the
/// same id.
#[must_use]
pub fn extract_video_urls(input: &str) -> Vec<(VideoId, String)> {
    let mut found: Vec<(VideoId, String)> = Vec::new();

    for url_match in VIDEO_URL_SEARCH.find_iter(input) {
        let raw = url_match.as_str().trim_end_matches(['.', ',', ';', '!', '?']);
        let Some(id) = recognize(raw) else {
            continue;
        };
        if found.iter().any(|(seen, _)| *seen == id) {
            trace!(id = %id, "skipping repeated video URL");
            continue;
        }
        found.push((id, raw.to_string()));
    }

    found
}

/// Parses a URL, assuming `https://` when the scheme is missing.
fn parse_lenient(raw: &str) -> Option<Url> {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        Url::parse(raw).ok()
    } else {
        Url::parse(&format!("https://{raw}")).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    // ==================== recognize ====================

    #[test]
    fn test_recognize_short_link() {
        let id = recognize("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), ID);
    }

    #[test]
    fn test_recognize_watch_page_with_extra_params() {
        let id = recognize("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=5s").unwrap();
        assert_eq!(id.as_str(), ID);
    }

    #[test]
    fn test_recognize_watch_page_without_www() {
        let id = recognize("http://youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), ID);
    }

    #[test]
    fn test_recognize_shorts() {
        let id = recognize("https://www.youtube.com/shorts/dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), ID);
    }

    #[test]
    fn test_recognize_without_scheme() {
        let id = recognize("youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), ID);

        let id = recognize("www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), ID);
    }

    #[test]
    fn test_recognize_trims_surrounding_whitespace() {
        let id = recognize("  https://youtu.be/dQw4w9WgXcQ\n").unwrap();
        assert_eq!(id.as_str(), ID);
    }

    #[test]
    fn test_recognize_rejects_other_sites() {
        assert!(recognize("https://example.com/video").is_none());
        assert!(recognize("https://vimeo.com/123456789").is_none());
    }

    #[test]
    fn test_recognize_rejects_plain_text() {
        assert!(recognize("").is_none());
        assert!(recognize("hello world").is_none());
        assert!(recognize("watch https://youtu.be/dQw4w9WgXcQ later").is_none());
    }

    #[test]
    fn test_recognize_rejects_short_ids() {
        assert!(recognize("https://youtu.be/abc").is_none());
    }

    #[test]
    fn test_recognize_rejects_watch_without_leading_v_param() {
        assert!(recognize("https://www.youtube.com/watch?list=PL1&v=dQw4w9WgXcQ").is_none());
    }

    #[test]
    fn test_recognize_returns_overlong_id_as_is() {
        // Shape matches on the first 11 chars; the extracted id is not re-validated.
        let id = recognize("https://youtu.be/dQw4w9WgXcQXYZ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQXYZ");
    }

    // ==================== extract_video_id ====================

    #[test]
    fn test_extract_video_id_embed_and_legacy_paths() {
        let id = extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), ID);
        let id = extract_video_id("https://youtube.com/v/dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), ID);
    }

    #[test]
    fn test_extract_video_id_shorts_with_trailing_segment() {
        let id = extract_video_id("https://youtube.com/shorts/dQw4w9WgXcQ/extra").unwrap();
        assert_eq!(id.as_str(), ID);
    }

    #[test]
    fn test_extract_video_id_missing_components() {
        assert!(extract_video_id("https://www.youtube.com/watch").is_none());
        assert!(extract_video_id("https://www.youtube.com/watch?v=").is_none());
        assert!(extract_video_id("https://youtu.be/").is_none());
        assert!(extract_video_id("https://www.youtube.com/channel/xyz").is_none());
    }

    #[test]
    fn test_extract_video_id_unknown_host() {
        assert!(extract_video_id("https://m.example.com/watch?v=dQw4w9WgXcQ").is_none());
    }

    // ==================== extract_video_urls ====================

    #[test]
    fn test_extract_video_urls_finds_all_in_text() {
        let text = "first https://youtu.be/dQw4w9WgXcQ, then\n\
                    https://www.youtube.com/shorts/aaaaaaaaaaa and https://example.com/x";
        let found = extract_video_urls(text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0.as_str(), ID);
        assert_eq!(found[0].1, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(found[1].0.as_str(), "aaaaaaaaaaa");
    }

    #[test]
    fn test_extract_video_urls_skips_repeated_ids() {
        let text = "https://youtu.be/dQw4w9WgXcQ https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        let found = extract_video_urls(text);
        assert_eq!(found.len(), 1);
    }
}
