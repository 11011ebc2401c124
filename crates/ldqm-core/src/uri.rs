use url::{Host, Url};

use crate::error::{CoreError, Result};

/// Second-level labels that are registered under a country code, so the
/// pay-level domain spans three labels instead of two.
const SECOND_LEVEL_SUFFIXES: &[&str] = &[
    "ac", "co", "com", "edu", "gov", "gob", "ltd", "net", "nhs", "org", "plc", "sch",
];

const PERSISTENT_HOSTS: &[&str] = &["purl.org", "w3id.org"];

/// Returns true when `token` is a plausible dereferenceable URI.
///
/// Only absolute `http`/`https` URIs with a non-empty, syntactically valid
/// host qualify. Blank-node labels, literals and relative references are
/// rejected without touching the network.
pub fn is_possible_url(token: &str) -> bool {
    parse_http_url(token).is_ok()
}

/// Parses `token` as an absolute `http`/`https` URL.
pub fn parse_http_url(token: &str) -> Result<Url> {
    if token.is_empty() || token.trim() != token || token.starts_with("_:") {
        return Err(CoreError::InvalidUri(token.to_string()));
    }

    let url = Url::parse(token).map_err(|err| CoreError::InvalidUri(format!("{token}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CoreError::InvalidUri(format!(
            "{token}: unsupported scheme '{}'",
            url.scheme()
        )));
    }

    match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => Ok(url),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => Ok(url),
        _ => Err(CoreError::InvalidUri(format!("{token}: missing host"))),
    }
}

/// Namespace of a URI: everything before the fragment when there is one,
/// otherwise everything before the last path separator.
///
/// Non-http tokens are returned unchanged.
pub fn extract_dataset_ns(uri: &str) -> &str {
    if !uri.starts_with("http") {
        return uri;
    }

    if let Some(idx) = uri.find('#') {
        return &uri[..idx];
    }

    let authority_start = uri.find("://").map(|idx| idx + 3).unwrap_or(0);
    match uri.rfind('/') {
        Some(idx) if idx >= authority_start => &uri[..idx],
        _ => uri,
    }
}

/// Registrable portion of the URI's host, e.g. `dbpedia.org` for
/// `http://de.dbpedia.org/resource/Berlin`.
pub fn pay_level_domain(uri: &str) -> Option<String> {
    let url = parse_http_url(uri).ok()?;
    let host = match url.host()? {
        Host::Domain(domain) => domain.trim_end_matches('.').to_ascii_lowercase(),
        Host::Ipv4(addr) => return Some(addr.to_string()),
        Host::Ipv6(addr) => return Some(addr.to_string()),
    };

    let labels: Vec<&str> = host.split('.').filter(|label| !label.is_empty()).collect();
    let keep = match labels.as_slice() {
        [] => return None,
        [.., second, top] if top.len() == 2 && SECOND_LEVEL_SUFFIXES.contains(second) => 3,
        _ => 2,
    };

    let start = labels.len().saturating_sub(keep);
    Some(labels[start..].join("."))
}

/// True for `purl.org` / `w3id.org` style indirection URIs.
pub fn is_persistent_url(uri: &str) -> bool {
    let Ok(url) = parse_http_url(uri) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();

    PERSISTENT_HOSTS
        .iter()
        .any(|persistent| host == *persistent || host.ends_with(&format!(".{persistent}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_absolute_http_uris() {
        assert!(is_possible_url("http://dbpedia.org/resource/Berlin"));
        assert!(is_possible_url("https://example.org/a#b"));
        assert!(is_possible_url("http://127.0.0.1:8080/x"));
        assert!(is_possible_url("http://localhost/x"));
    }

    #[test]
    fn rejects_non_dereferenceable_tokens() {
        assert!(!is_possible_url("_:b0"));
        assert!(!is_possible_url("\"Berlin\"@de"));
        assert!(!is_possible_url("/relative/path"));
        assert!(!is_possible_url("urn:isbn:0451450523"));
        assert!(!is_possible_url("mailto:someone@example.org"));
        assert!(!is_possible_url("ftp://example.org/file"));
        assert!(!is_possible_url("http://"));
        assert!(!is_possible_url(" http://example.org/"));
        assert!(!is_possible_url(""));
    }

    #[test]
    fn dataset_namespace_prefers_fragment() {
        assert_eq!(
            extract_dataset_ns("http://xmlns.com/foaf/0.1/#Person"),
            "http://xmlns.com/foaf/0.1/"
        );
        assert_eq!(
            extract_dataset_ns("http://dbpedia.org/resource/Berlin"),
            "http://dbpedia.org/resource"
        );
        assert_eq!(extract_dataset_ns("http://example.org"), "http://example.org");
        assert_eq!(extract_dataset_ns("_:b1"), "_:b1");
    }

    #[test]
    fn pay_level_domain_handles_country_suffixes() {
        assert_eq!(
            pay_level_domain("http://de.dbpedia.org/resource/Berlin").as_deref(),
            Some("dbpedia.org")
        );
        assert_eq!(
            pay_level_domain("http://data.bbc.co.uk/things/1").as_deref(),
            Some("bbc.co.uk")
        );
        assert_eq!(
            pay_level_domain("http://192.168.0.1/x").as_deref(),
            Some("192.168.0.1")
        );
        assert_eq!(pay_level_domain("_:b1"), None);
    }

    #[test]
    fn detects_persistent_urls() {
        assert!(is_persistent_url("http://purl.org/dc/terms/title"));
        assert!(is_persistent_url("https://w3id.org/example/thing"));
        assert!(!is_persistent_url("http://example.org/purl.org"));
    }
}
