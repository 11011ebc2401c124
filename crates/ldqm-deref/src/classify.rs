use serde::{Deserialize, Serialize};

use crate::model::FetchOutcome;

/// Dereferenceability verdict for one URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Valid,
    Invalid,
    /// No outcome has been committed for the URI yet.
    Pending,
}

/// Status class reported alongside the verdict, used for problem reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DereferenceCode {
    Sc200,
    Sc301,
    Sc302,
    Sc303,
    Sc303WithoutParsableContent,
    Sc307,
    Sc3xx,
    Sc4xx,
    Sc5xx,
    /// Informational or non-200 success responses.
    Other,
    /// Timeout, connection or protocol failure.
    NetworkFailure,
}

impl DereferenceCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DereferenceCode::Sc200 => "200 OK",
            DereferenceCode::Sc301 => "301 Moved Permanently",
            DereferenceCode::Sc302 => "302 Found",
            DereferenceCode::Sc303 => "303 See Other",
            DereferenceCode::Sc303WithoutParsableContent => "303 without parsable content",
            DereferenceCode::Sc307 => "307 Temporary Redirect",
            DereferenceCode::Sc3xx => "3xx Redirection",
            DereferenceCode::Sc4xx => "4xx Client Error",
            DereferenceCode::Sc5xx => "5xx Server Error",
            DereferenceCode::Other => "unexpected status",
            DereferenceCode::NetworkFailure => "network failure",
        }
    }
}

/// Linked Data dereferencing rules over a committed outcome.
///
/// - `200`: valid when the content is parsable RDF, or RDF is not required.
/// - `301`/`302`/`307`: valid when the chain ends in `200` with parsable RDF
///   (or RDF is not required); otherwise judged by the terminal response.
/// - `303`: valid only when the redirect target serves parsable RDF.
/// - any other `3xx`, `4xx`, `5xx` or transport failure: invalid.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    require_rdf: bool,
}

impl Default for Classifier {
    fn default() -> Self {
        Self { require_rdf: true }
    }
}

impl Classifier {
    pub fn new(require_rdf: bool) -> Self {
        Self { require_rdf }
    }

    pub fn verdict(&self, outcome: Option<&FetchOutcome>) -> Verdict {
        match outcome {
            None => Verdict::Pending,
            Some(outcome) => self.assess(outcome).0,
        }
    }

    /// Verdict and status class for a committed outcome.
    pub fn assess(&self, outcome: &FetchOutcome) -> (Verdict, DereferenceCode) {
        let Some(first) = outcome.first_status() else {
            return (Verdict::Invalid, DereferenceCode::NetworkFailure);
        };

        let terminal_ok = outcome.is_complete() && outcome.final_status() == Some(200);
        let content_ok = outcome.parsable || !self.require_rdf;

        match first {
            200 if outcome.failure.is_none() => {
                let verdict = if content_ok {
                    Verdict::Valid
                } else {
                    Verdict::Invalid
                };
                (verdict, DereferenceCode::Sc200)
            }
            301 | 302 | 307 => {
                let code = match first {
                    301 => DereferenceCode::Sc301,
                    302 => DereferenceCode::Sc302,
                    _ => DereferenceCode::Sc307,
                };
                if terminal_ok && content_ok {
                    (Verdict::Valid, code)
                } else if terminal_ok {
                    (Verdict::Invalid, code)
                } else {
                    (Verdict::Invalid, terminal_code(outcome))
                }
            }
            303 => {
                if terminal_ok && outcome.parsable {
                    (Verdict::Valid, DereferenceCode::Sc303)
                } else {
                    (Verdict::Invalid, DereferenceCode::Sc303WithoutParsableContent)
                }
            }
            _ => (Verdict::Invalid, status_code(first, outcome)),
        }
    }

    /// Final response is `200` and the transfer completed.
    pub fn has_ok_status(&self, outcome: &FetchOutcome) -> bool {
        has_ok_status(outcome)
    }
}

/// Classifies with RDF content required.
pub fn classify(outcome: Option<&FetchOutcome>) -> Verdict {
    Classifier::default().verdict(outcome)
}

/// Gate used by content-type metrics: the chain completed on `200`.
pub fn has_ok_status(outcome: &FetchOutcome) -> bool {
    outcome.is_complete() && outcome.final_status() == Some(200)
}

fn terminal_code(outcome: &FetchOutcome) -> DereferenceCode {
    if outcome.failure.is_some() {
        return DereferenceCode::NetworkFailure;
    }
    match outcome.final_status() {
        Some(status) => status_code(status, outcome),
        None => DereferenceCode::NetworkFailure,
    }
}

fn status_code(status: u16, outcome: &FetchOutcome) -> DereferenceCode {
    match status {
        _ if outcome.failure.is_some() && !(300..400).contains(&status) => {
            DereferenceCode::NetworkFailure
        }
        200 => DereferenceCode::Sc200,
        301 => DereferenceCode::Sc301,
        302 => DereferenceCode::Sc302,
        303 => DereferenceCode::Sc303,
        307 => DereferenceCode::Sc307,
        300..=399 => DereferenceCode::Sc3xx,
        400..=499 => DereferenceCode::Sc4xx,
        500..=599 => DereferenceCode::Sc5xx,
        _ => DereferenceCode::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::outcome;
    use crate::model::{FetchFailure, Hop};

    #[test]
    fn missing_outcome_is_pending() {
        assert_eq!(classify(None), Verdict::Pending);
    }

    #[test]
    fn ok_with_rdf_is_valid() {
        let chain = outcome(&[(200, None)], Some("text/turtle"), true);
        assert_eq!(classify(Some(&chain)), Verdict::Valid);
        assert!(has_ok_status(&chain));
    }

    #[test]
    fn ok_without_rdf_depends_on_requirement() {
        let chain = outcome(&[(200, None)], Some("text/html"), false);
        assert_eq!(classify(Some(&chain)), Verdict::Invalid);
        assert_eq!(Classifier::new(false).verdict(Some(&chain)), Verdict::Valid);
    }

    #[test]
    fn see_other_without_rdf_has_distinct_reason() {
        let chain = outcome(
            &[(303, Some("http://example.org/page")), (200, None)],
            Some("text/html"),
            false,
        );
        let (verdict, code) = Classifier::default().assess(&chain);
        assert_eq!(verdict, Verdict::Invalid);
        assert_eq!(code, DereferenceCode::Sc303WithoutParsableContent);
        assert_eq!(code.as_str(), "303 without parsable content");

        // The requirement is not waived for 303 chains.
        assert_eq!(Classifier::new(false).verdict(Some(&chain)), Verdict::Invalid);
    }

    #[test]
    fn see_other_with_rdf_is_valid() {
        let chain = outcome(
            &[(303, Some("http://example.org/data.ttl")), (200, None)],
            Some("text/turtle"),
            true,
        );
        assert_eq!(
            Classifier::default().assess(&chain),
            (Verdict::Valid, DereferenceCode::Sc303)
        );
    }

    #[test]
    fn not_found_is_invalid() {
        let chain = outcome(&[(404, None)], None, false);
        assert_eq!(
            Classifier::default().assess(&chain),
            (Verdict::Invalid, DereferenceCode::Sc4xx)
        );
        assert!(!has_ok_status(&chain));
    }

    #[test]
    fn moved_permanently_to_rdf_is_valid() {
        let chain = outcome(
            &[(301, Some("https://example.org/resource")), (200, None)],
            Some("application/rdf+xml"),
            true,
        );
        assert_eq!(
            Classifier::default().assess(&chain),
            (Verdict::Valid, DereferenceCode::Sc301)
        );
    }

    #[test]
    fn redirect_to_error_uses_terminal_code() {
        let chain = outcome(&[(302, Some("/gone")), (410, None)], None, false);
        assert_eq!(
            Classifier::default().assess(&chain),
            (Verdict::Invalid, DereferenceCode::Sc4xx)
        );
    }

    #[test]
    fn other_redirects_are_invalid() {
        let chain = outcome(&[(308, Some("/moved")), (200, None)], Some("text/turtle"), true);
        assert_eq!(
            Classifier::default().assess(&chain),
            (Verdict::Invalid, DereferenceCode::Sc3xx)
        );
    }

    #[test]
    fn transport_failures_are_invalid() {
        let timeout = FetchOutcome::failed(
            "http://example.org/slow",
            Vec::new(),
            "http://example.org/slow",
            FetchFailure::Timeout,
        );
        assert_eq!(
            Classifier::default().assess(&timeout),
            (Verdict::Invalid, DereferenceCode::NetworkFailure)
        );

        let looping = FetchOutcome::failed(
            "http://example.org/loop",
            vec![Hop::new(301, Some("/loop")); 6],
            "http://example.org/loop",
            FetchFailure::TooManyRedirects(5),
        );
        assert_eq!(
            Classifier::default().assess(&looping),
            (Verdict::Invalid, DereferenceCode::NetworkFailure)
        );
    }

    #[test]
    fn server_errors_are_invalid() {
        let chain = outcome(&[(503, None)], None, false);
        assert_eq!(
            Classifier::default().assess(&chain),
            (Verdict::Invalid, DereferenceCode::Sc5xx)
        );
    }
}
