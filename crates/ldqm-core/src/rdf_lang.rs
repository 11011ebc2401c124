use serde::{Deserialize, Serialize};

/// `Accept` header used when dereferencing resources: RDF serialisations
/// first, anything else as a last resort so servers still answer.
pub const RDF_ACCEPT_HEADER: &str = "application/rdf+xml, text/turtle, application/n-triples, \
application/ld+json;q=0.9, application/n-quads;q=0.9, application/trig;q=0.9, \
text/n3;q=0.8, application/trix+xml;q=0.5, */*;q=0.1";

/// Known RDF serialisations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RdfLang {
    RdfXml,
    Turtle,
    NTriples,
    NQuads,
    TriG,
    JsonLd,
    N3,
    TriX,
}

impl RdfLang {
    pub const ALL: [RdfLang; 8] = [
        RdfLang::RdfXml,
        RdfLang::Turtle,
        RdfLang::NTriples,
        RdfLang::NQuads,
        RdfLang::TriG,
        RdfLang::JsonLd,
        RdfLang::N3,
        RdfLang::TriX,
    ];

    /// Canonical media type.
    pub fn media_type(self) -> &'static str {
        match self {
            RdfLang::RdfXml => "application/rdf+xml",
            RdfLang::Turtle => "text/turtle",
            RdfLang::NTriples => "application/n-triples",
            RdfLang::NQuads => "application/n-quads",
            RdfLang::TriG => "application/trig",
            RdfLang::JsonLd => "application/ld+json",
            RdfLang::N3 => "text/n3",
            RdfLang::TriX => "application/trix+xml",
        }
    }

    fn alternate_media_types(self) -> &'static [&'static str] {
        match self {
            RdfLang::RdfXml => &["application/xml+rdf", "text/rdf+xml"],
            RdfLang::Turtle => &["application/x-turtle", "application/turtle"],
            RdfLang::NTriples => &["text/n-triples"],
            RdfLang::NQuads => &["text/n-quads", "text/x-nquads"],
            RdfLang::TriG => &["application/x-trig"],
            RdfLang::JsonLd => &[],
            RdfLang::N3 => &["text/rdf+n3"],
            RdfLang::TriX => &["application/trix"],
        }
    }

    fn extensions(self) -> &'static [&'static str] {
        match self {
            RdfLang::RdfXml => &["rdf", "owl"],
            RdfLang::Turtle => &["ttl"],
            RdfLang::NTriples => &["nt"],
            RdfLang::NQuads => &["nq"],
            RdfLang::TriG => &["trig"],
            RdfLang::JsonLd => &["jsonld"],
            RdfLang::N3 => &["n3"],
            RdfLang::TriX => &["trix"],
        }
    }

    /// Maps a `Content-Type` header value (parameters allowed) to a
    /// serialisation.
    pub fn from_content_type(content_type: &str) -> Option<RdfLang> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence.is_empty() {
            return None;
        }

        Self::ALL.into_iter().find(|lang| {
            lang.media_type() == essence || lang.alternate_media_types().contains(&essence.as_str())
        })
    }

    /// Guesses a serialisation from the file extension of a path or URL.
    /// Query strings and fragments are ignored.
    pub fn from_filename(name: &str) -> Option<RdfLang> {
        let path = name.split(['?', '#']).next().unwrap_or_default();
        let file = path.rsplit('/').next().unwrap_or(path);
        let (_, extension) = file.rsplit_once('.')?;
        let extension = extension.to_ascii_lowercase();

        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&extension.as_str()))
    }

    /// Content type first, file extension as a fallback.
    pub fn resolve(content_type: Option<&str>, location: &str) -> Option<RdfLang> {
        content_type
            .and_then(RdfLang::from_content_type)
            .or_else(|| RdfLang::from_filename(location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_ignores_parameters_and_case() {
        assert_eq!(
            RdfLang::from_content_type("text/turtle; charset=utf-8"),
            Some(RdfLang::Turtle)
        );
        assert_eq!(
            RdfLang::from_content_type("Application/RDF+XML"),
            Some(RdfLang::RdfXml)
        );
        assert_eq!(RdfLang::from_content_type("text/html"), None);
        assert_eq!(RdfLang::from_content_type(""), None);
    }

    #[test]
    fn filename_fallback_uses_extension() {
        assert_eq!(
            RdfLang::from_filename("http://example.org/data/dump.ttl?x=1"),
            Some(RdfLang::Turtle)
        );
        assert_eq!(RdfLang::from_filename("ontology.OWL"), Some(RdfLang::RdfXml));
        assert_eq!(RdfLang::from_filename("http://example.org/page.html"), None);
        assert_eq!(RdfLang::from_filename("http://example.org/resource"), None);
    }

    #[test]
    fn resolve_prefers_content_type() {
        assert_eq!(
            RdfLang::resolve(Some("application/ld+json"), "http://example.org/x.ttl"),
            Some(RdfLang::JsonLd)
        );
        assert_eq!(
            RdfLang::resolve(Some("text/plain"), "http://example.org/x.nt"),
            Some(RdfLang::NTriples)
        );
    }

    #[test]
    fn generic_xml_is_not_taken_for_rdf() {
        assert_eq!(RdfLang::from_filename("http://example.org/sitemap.xml"), None);
        assert_eq!(
            RdfLang::resolve(Some("application/xml"), "http://example.org/sitemap.xml"),
            None
        );
        assert_eq!(
            RdfLang::resolve(Some("application/xml"), "http://example.org/vocab.rdf"),
            Some(RdfLang::RdfXml)
        );
    }
}
