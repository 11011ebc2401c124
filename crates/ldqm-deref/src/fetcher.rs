use std::io::Read;
use std::time::Instant;

use chrono::Utc;
use ldqm_core::{RdfLang, parse_http_url};
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use tracing::{debug, trace};

use crate::errors::Result;
use crate::model::{ContentIssue, FetchFailure, FetchOutcome, Hop};
use crate::options::DerefOptions;

/// Blocking HTTP client that follows redirects by hand so every hop is
/// recorded.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    accept: String,
    max_hops: u32,
    max_body_bytes: u64,
}

impl HttpFetcher {
    pub fn new(options: &DerefOptions) -> Result<Self> {
        options.validate()?;
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(options.timeout())
            .user_agent(options.user_agent())
            .build()?;

        Ok(Self {
            client,
            accept: options.accept.clone(),
            max_hops: options.max_hops,
            max_body_bytes: options.max_body_bytes,
        })
    }

    /// Dereferences `uri` with RDF content negotiation. Never fails: transport
    /// and protocol errors are recorded on the returned outcome.
    pub fn fetch(&self, uri: &str) -> FetchOutcome {
        let mut current = match parse_http_url(uri) {
            Ok(url) => url,
            Err(err) => {
                return FetchOutcome::failed(
                    uri,
                    Vec::new(),
                    uri,
                    FetchFailure::InvalidUri(err.to_string()),
                );
            }
        };
        let mut hops: Vec<Hop> = Vec::new();

        loop {
            let response = match self.send(&current) {
                Ok(response) => response,
                Err(err) => {
                    let failure = failure_from(&err);
                    debug!(uri, url = %current, error = %err, "request failed");
                    return FetchOutcome::failed(uri, hops, current.as_str(), failure);
                }
            };

            let status = response.status().as_u16();
            let location = header_value(&response, LOCATION);
            hops.push(Hop::new(status, location.as_deref()));
            trace!(uri, url = %current, status, location = ?location, "hop recorded");

            if !response.status().is_redirection() {
                return self.finish(uri, hops, current, response);
            }

            let Some(location) = location else {
                // A redirect without a target terminates the chain as-is.
                return self.finish(uri, hops, current, response);
            };

            if hops.len() as u32 > self.max_hops {
                return FetchOutcome::failed(
                    uri,
                    hops,
                    current.as_str(),
                    FetchFailure::TooManyRedirects(self.max_hops),
                );
            }

            current = match current.join(&location) {
                Ok(next) if matches!(next.scheme(), "http" | "https") => next,
                Ok(next) => {
                    return FetchOutcome::failed(
                        uri,
                        hops,
                        current.as_str(),
                        FetchFailure::InvalidRedirect(next.to_string()),
                    );
                }
                Err(err) => {
                    return FetchOutcome::failed(
                        uri,
                        hops,
                        current.as_str(),
                        FetchFailure::InvalidRedirect(format!("{location}: {err}")),
                    );
                }
            };
        }
    }

    /// Issues `requests` sequential GETs to `uri` and returns the total
    /// elapsed milliseconds. Failed requests still count towards the total.
    pub fn measure_burst_delay(&self, uri: &str, requests: u32) -> u128 {
        let start = Instant::now();
        for attempt in 0..requests {
            match self.client.get(uri).header(ACCEPT, &self.accept).send() {
                Ok(response) => {
                    trace!(uri, attempt, status = response.status().as_u16(), "burst request")
                }
                Err(err) => debug!(uri, attempt, error = %err, "burst request failed"),
            }
        }
        let elapsed = start.elapsed().as_millis();
        debug!(uri, requests, elapsed_ms = elapsed as u64, "burst measured");
        elapsed
    }

    /// Follows a single redirect hop of a persistent-URL service without
    /// reading the body. Returns `uri` itself when there is no redirect or
    /// the request fails.
    pub fn resolve_persistent_url(&self, uri: &str) -> String {
        let Ok(url) = parse_http_url(uri) else {
            return uri.to_string();
        };

        let response = match self.send(&url) {
            Ok(response) => response,
            Err(err) => {
                debug!(uri, error = %err, "persistent url not resolved");
                return uri.to_string();
            }
        };

        if !response.status().is_redirection() {
            return uri.to_string();
        }

        header_value(&response, LOCATION)
            .and_then(|location| url.join(&location).ok())
            .map(|target| target.to_string())
            .unwrap_or_else(|| uri.to_string())
    }

    /// True when dereferencing `uri` ends in parsable RDF content.
    pub fn has_parsable_content(&self, uri: &str) -> bool {
        self.fetch(uri).parsable
    }

    fn send(&self, url: &Url) -> reqwest::Result<Response> {
        self.client
            .get(url.clone())
            .header(ACCEPT, &self.accept)
            .send()
    }

    fn finish(&self, uri: &str, hops: Vec<Hop>, url: Url, response: Response) -> FetchOutcome {
        let status = response.status();
        let content_type = header_value(&response, CONTENT_TYPE);
        let lang = RdfLang::resolve(content_type.as_deref(), url.as_str());

        let mut body = Vec::new();
        let read = response.take(self.max_body_bytes + 1).read_to_end(&mut body);
        let content_issue = match read {
            Err(err) => Some(ContentIssue::Unreadable(err.to_string())),
            Ok(_) if body.len() as u64 > self.max_body_bytes => {
                Some(ContentIssue::BodyTooLarge(self.max_body_bytes))
            }
            Ok(_) if lang.is_some() && std::str::from_utf8(&body).is_err() => {
                Some(ContentIssue::Undecodable)
            }
            Ok(_) => None,
        };

        let parsable =
            status.is_success() && lang.is_some() && content_issue.is_none() && !body.is_empty();

        debug!(
            uri,
            status = status.as_u16(),
            hops = hops.len(),
            content_type = ?content_type,
            parsable,
            "fetch complete"
        );

        FetchOutcome {
            uri: uri.to_string(),
            hops,
            final_url: url.to_string(),
            content_type,
            parsable,
            failure: None,
            content_issue,
            fetched_at: Utc::now(),
        }
    }
}

fn header_value(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn failure_from(err: &reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::Timeout
    } else if err.is_connect() {
        FetchFailure::Connect(err.to_string())
    } else {
        FetchFailure::Protocol(err.to_string())
    }
}
