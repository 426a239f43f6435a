/// Marker that embeds a cookie string at the end of a feed URL.
const COOKIE_MARKER: &str = ":COOKIE:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub id: usize,
    pub url: String,
    pub cookies: Option<String>,
    /// Refresh hint in minutes, taken from the last successful fetch.
    pub ttl: Option<u32>,
}

impl Feed {
    /// Create a feed. When no explicit cookies are given, a `:COOKIE:`
    /// suffix on the URL is split off and used instead.
    pub fn new(id: usize, url: &str, cookies: Option<String>) -> Self {
        let (url, embedded) = split_cookies(url);
        let cookies = cookies
            .filter(|c| !c.trim().is_empty())
            .or(embedded);

        Self {
            id,
            url,
            cookies,
            ttl: None,
        }
    }
}

fn split_cookies(url: &str) -> (String, Option<String>) {
    match url.find(COOKIE_MARKER) {
        Some(pos) => {
            let cookies = &url[pos + COOKIE_MARKER.len()..];
            let cookies = (!cookies.is_empty()).then(|| cookies.to_string());
            (url[..pos].to_string(), cookies)
        }
        None => (url.to_string(), None),
    }
}
