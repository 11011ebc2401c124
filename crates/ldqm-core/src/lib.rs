//! Shared contracts for the Linked Data quality metrics workspace.
//!
//! This crate holds the URI token classifier, the content-type to RDF
//! serialisation mapping, and the minimal statement model that metrics
//! consume while streaming a dataset, with a line-based N-Triples reader.

pub mod error;
pub mod ntriples;
pub mod rdf_lang;
pub mod statement;
pub mod uri;

pub use error::{CoreError, Result};
pub use ntriples::{parse_line, parse_ntriples};
pub use rdf_lang::{RdfLang, RDF_ACCEPT_HEADER};
pub use statement::{Node, RDF_TYPE, Statement};
pub use uri::{
    extract_dataset_ns, is_persistent_url, is_possible_url, parse_http_url, pay_level_domain,
};
