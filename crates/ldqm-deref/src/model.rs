use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One response in a redirect chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Hop {
    pub fn new(status: u16, location: Option<&str>) -> Self {
        Self {
            status,
            location: location.map(str::to_string),
        }
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Terminal failure that prevented a complete status chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchFailure {
    Timeout,
    Connect(String),
    InvalidUri(String),
    TooManyRedirects(u32),
    InvalidRedirect(String),
    Protocol(String),
}

/// Problem with the final response body. The status chain stays intact
/// but the content is never considered parsable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ContentIssue {
    BodyTooLarge(u64),
    Undecodable,
    Unreadable(String),
}

/// Immutable record of one dereferencing attempt, keyed in the cache by the
/// URI originally requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub uri: String,
    /// Responses from the initial request to the last one received.
    pub hops: Vec<Hop>,
    /// URL of the last request issued.
    pub final_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Final content maps to a known RDF serialisation and was read whole.
    pub parsable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FetchFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_issue: Option<ContentIssue>,
    pub fetched_at: DateTime<Utc>,
}

impl FetchOutcome {
    /// Outcome for a request that failed before or during the chain.
    pub fn failed(uri: &str, hops: Vec<Hop>, final_url: &str, failure: FetchFailure) -> Self {
        Self {
            uri: uri.to_string(),
            hops,
            final_url: final_url.to_string(),
            content_type: None,
            parsable: false,
            failure: Some(failure),
            content_issue: None,
            fetched_at: Utc::now(),
        }
    }

    pub fn first_status(&self) -> Option<u16> {
        self.hops.first().map(|hop| hop.status)
    }

    pub fn final_status(&self) -> Option<u16> {
        self.hops.last().map(|hop| hop.status)
    }

    /// The chain ended on a non-redirect response with no transport failure.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.hops.last().is_some_and(|hop| !hop.is_redirect())
    }

    pub fn status_line(&self) -> String {
        let statuses: Vec<String> = self.hops.iter().map(|hop| hop.status.to_string()).collect();
        match &self.failure {
            Some(failure) if statuses.is_empty() => format!("{failure:?}"),
            Some(failure) => format!("{} -> {failure:?}", statuses.join(" -> ")),
            None => statuses.join(" -> "),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn outcome(hops: &[(u16, Option<&str>)], content_type: Option<&str>, parsable: bool) -> FetchOutcome {
        FetchOutcome {
            uri: "http://example.org/resource".to_string(),
            hops: hops
                .iter()
                .map(|(status, location)| Hop::new(*status, *location))
                .collect(),
            final_url: "http://example.org/resource".to_string(),
            content_type: content_type.map(str::to_string),
            parsable,
            failure: None,
            content_issue: None,
            fetched_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::outcome;
    use super::*;

    #[test]
    fn complete_chain_ends_on_non_redirect() {
        let chain = outcome(&[(303, Some("/doc")), (200, None)], Some("text/turtle"), true);
        assert!(chain.is_complete());
        assert_eq!(chain.first_status(), Some(303));
        assert_eq!(chain.final_status(), Some(200));
        assert_eq!(chain.status_line(), "303 -> 200");

        let failed = FetchOutcome::failed(
            "http://example.org/x",
            vec![Hop::new(301, Some("http://example.org/y"))],
            "http://example.org/y",
            FetchFailure::Timeout,
        );
        assert!(!failed.is_complete());
        assert_eq!(failed.status_line(), "301 -> Timeout");
    }
}
