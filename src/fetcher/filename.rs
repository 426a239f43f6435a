use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};

/// Used when a URL has no usable last path segment.
const FALLBACK_NAME: &str = "download";

static DISPOSITION_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:inline|attachment)\s*;\s*filename\s*=\s*"?([^";]+)"?"#)
        .expect("Content-Disposition pattern is valid")
});

/// Filename announced in a `Content-Disposition` header value.
pub fn disposition_filename(value: &str) -> Option<String> {
    DISPOSITION_FILENAME
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

pub fn header_filename(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(disposition_filename)
}

/// Last non-empty `/`-separated segment of a URL.
pub fn url_filename(url: &str) -> Option<&str> {
    url.split('/').filter(|s| !s.is_empty()).last()
}

/// Where a download of `url` is saved inside `folder`. A server-provided
/// `hint` takes precedence over the URL.
pub fn target_path(folder: &Path, url: &str, hint: Option<&str>) -> PathBuf {
    let name = hint
        .and_then(sanitize)
        .or_else(|| url_filename(url).and_then(sanitize))
        .unwrap_or(FALLBACK_NAME);
    folder.join(name)
}

/// Reduce a name to its final path component.
fn sanitize(name: &str) -> Option<&str> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
}

/// Percent-encode spaces, which feeds sometimes leave in enclosure URLs.
pub fn encode_whitespace(url: &str) -> String {
    url.trim().replace(' ', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_url_filename() {
        assert_eq!(url_filename("http://x/movies/a.mov"), Some("a.mov"));
        assert_eq!(url_filename("http://x/movies/"), Some("movies"));
        assert_eq!(url_filename("http://x/get?id=5"), Some("get?id=5"));
        assert_eq!(url_filename(""), None);
    }

    #[test]
    fn test_target_path_from_url() {
        let path = target_path(Path::new("/downloads"), "http://x/trailers/a_h720p.mov", None);
        assert_eq!(path, PathBuf::from("/downloads/a_h720p.mov"));
    }

    #[test]
    fn test_target_path_prefers_hint() {
        let path = target_path(Path::new("/downloads"), "http://x/get?id=5", Some("movie.mp4"));
        assert_eq!(path, PathBuf::from("/downloads/movie.mp4"));
    }

    #[test]
    fn test_target_path_strips_directories_from_hint() {
        let path = target_path(Path::new("/downloads"), "http://x/a.mov", Some("../../etc/passwd"));
        assert_eq!(path, PathBuf::from("/downloads/passwd"));
    }

    #[test]
    fn test_target_path_fallback() {
        let path = target_path(Path::new("/downloads"), "http://x/..", None);
        assert_eq!(path, PathBuf::from("/downloads/download"));
    }

    #[test]
    fn test_disposition_filename() {
        assert_eq!(
            disposition_filename(r#"attachment; filename="trailer.mov""#).as_deref(),
            Some("trailer.mov")
        );
        assert_eq!(
            disposition_filename("inline; filename=clip.mp4;").as_deref(),
            Some("clip.mp4")
        );
        assert_eq!(
            disposition_filename(r#"Attachment;  filename="my movie.mp4"; size=10"#).as_deref(),
            Some("my movie.mp4")
        );
        assert_eq!(disposition_filename("attachment"), None);
        assert_eq!(disposition_filename("form-data; name=x"), None);
    }

    #[test]
    fn test_header_filename() {
        let mut headers = HeaderMap::new();
        assert_eq!(header_filename(&headers), None);

        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static(r#"attachment; filename="a.mov""#),
        );
        assert_eq!(header_filename(&headers).as_deref(), Some("a.mov"));
    }

    #[test]
    fn test_encode_whitespace() {
        assert_eq!(
            encode_whitespace(" http://x/my trailer.mov\n"),
            "http://x/my%20trailer.mov"
        );
    }
}
