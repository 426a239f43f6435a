use regex::Regex;

use crate::app::Result;

/// A download filter: URLs matching `pattern` are fetched, optionally with
/// a custom User-Agent.
#[derive(Debug, Clone)]
pub struct Filter {
    pub pattern: Regex,
    pub agent: Option<String>,
}

impl Filter {
    pub fn new(pattern: &str, agent: Option<String>) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            agent: agent.filter(|a| !a.trim().is_empty()),
        })
    }

    pub fn is_match(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }
}

/// Return the first filter, in list order, whose pattern matches `url`.
pub fn match_url<'a>(filters: &'a [Filter], url: &str) -> Option<&'a Filter> {
    filters.iter().find(|f| f.is_match(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(patterns: &[&str]) -> Vec<Filter> {
        patterns
            .iter()
            .map(|p| Filter::new(p, None).unwrap())
            .collect()
    }

    #[test]
    fn test_first_matching_filter_wins() {
        let list = filters(&[r"\.mkv$", r"\.mp4$"]);
        let matched = match_url(&list, "http://x/a.mp4").unwrap();
        assert_eq!(matched.pattern.as_str(), r"\.mp4$");
    }

    #[test]
    fn test_order_decides_between_overlapping_filters() {
        let mut list = filters(&[r"trailer", r"\.mov$"]);
        list[1].agent = Some("QuickTime/7.6".into());
        let matched = match_url(&list, "http://x/trailer.mov").unwrap();
        assert_eq!(matched.pattern.as_str(), "trailer");
        assert_eq!(matched.agent, None);
    }

    #[test]
    fn test_no_match() {
        let list = filters(&[r"\.mkv$"]);
        assert!(match_url(&list, "http://x/a.mp4").is_none());
    }

    #[test]
    fn test_empty_list_never_matches() {
        assert!(match_url(&[], "http://x/a.mp4").is_none());
    }

    #[test]
    fn test_matches_url_not_substring_anchor() {
        let list = filters(&[r"^http://apple\.com/.*_h720p\.mov$"]);
        assert!(match_url(&list, "http://apple.com/trailers/foo_h720p.mov").is_some());
        assert!(match_url(&list, "http://apple.com/trailers/foo_h480p.mov").is_none());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(Filter::new("(unclosed", None).is_err());
    }

    #[test]
    fn test_blank_agent_is_dropped() {
        let filter = Filter::new(r"\.mov$", Some(" ".into())).unwrap();
        assert_eq!(filter.agent, None);
    }
}
