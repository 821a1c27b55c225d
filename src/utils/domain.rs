//! Registered-domain extraction for link classification.
//!
//! `drugs.rcpsych.co.uk` and `depression.rcpsych.co.uk` must both resolve
//! to `rcpsych` so links within one organisation compare as internal.

use url::Url;

/// Two-part public suffixes common in this corpus. Hosts ending in one of
/// these keep the label before the pair as the registered domain.
const TWO_PART_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "net.uk", "com.au", "org.au",
    "net.au", "edu.au", "gov.au", "co.nz", "org.nz", "govt.nz", "co.za", "org.za", "com.br",
    "co.in", "co.jp", "or.jp", "ne.jp",
];

/// Extract the registered domain from a URL or bare host.
///
/// Returns `None` for relative links, filepaths, and anything without a
/// dotted hostname — callers treat those as internal references.
pub fn registered_domain(link: &str) -> Option<String> {
    let host = host_of(link)?;
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return None;
    }

    let last_two = format!("{}.{}", labels[labels.len() - 2], labels[labels.len() - 1]);
    let idx = if TWO_PART_SUFFIXES.contains(&last_two.as_str()) {
        if labels.len() < 3 {
            return None;
        }
        labels.len() - 3
    } else {
        labels.len() - 2
    };
    Some(labels[idx].to_string())
}

fn host_of(link: &str) -> Option<String> {
    if let Ok(url) = Url::parse(link) {
        return url.host_str().map(|h| h.to_string());
    }
    // Scheme-less links like "www.example.org/page" still carry a host.
    // Anything else without a scheme is assumed to be an internal filepath.
    let trimmed = link.trim();
    if !trimmed.starts_with("www.") {
        return None;
    }
    let candidate = trimmed.split(['/', '?', '#']).next()?;
    if candidate.contains(' ') {
        None
    } else {
        Some(candidate.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_domain_plain() {
        assert_eq!(
            registered_domain("https://www.example.org/page"),
            Some("example".to_string())
        );
    }

    #[test]
    fn test_registered_domain_two_part_suffix() {
        assert_eq!(
            registered_domain("https://drugs.rcpsych.co.uk/a"),
            Some("rcpsych".to_string())
        );
        assert_eq!(
            registered_domain("https://depression.rcpsych.co.uk"),
            Some("rcpsych".to_string())
        );
    }

    #[test]
    fn test_registered_domain_subdomain_collapses() {
        assert_eq!(
            registered_domain("http://news.bbc.co.uk/health"),
            Some("bbc".to_string())
        );
        assert_eq!(
            registered_domain("https://a.b.example.com"),
            Some("example".to_string())
        );
    }

    #[test]
    fn test_registered_domain_schemeless() {
        assert_eq!(
            registered_domain("www.nhs.uk/conditions"),
            Some("nhs".to_string())
        );
    }

    #[test]
    fn test_relative_links_have_no_domain() {
        assert_eq!(registered_domain("/conditions/depression"), None);
        assert_eq!(registered_domain("#section"), None);
        assert_eq!(registered_domain("page.html"), None);
        assert_eq!(registered_domain(""), None);
    }
}
