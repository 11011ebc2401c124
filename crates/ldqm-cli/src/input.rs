use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ldqm_core::{CoreError, Node, Statement, parse_line};

use crate::CliError;

/// Predicate attached to bare URI lines.
pub const LISTED_PREDICATE: &str = "http://www.w3.org/2000/01/rdf-schema#seeAlso";

/// Reads one statement per line. A line holding a single bare URI stands for
/// a statement about that URI; blank lines and `#` comments are skipped.
pub fn read_statements(path: &Path) -> Result<Vec<Statement>, CliError> {
    let reader = BufReader::new(File::open(path)?);
    let mut statements = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(statement) = parse_record(&line).map_err(|err| at_line(err, idx + 1))? {
            statements.push(statement);
        }
    }
    Ok(statements)
}

fn parse_record(line: &str) -> Result<Option<Statement>, CoreError> {
    let trimmed = line.trim();
    let bare = !trimmed.is_empty()
        && !trimmed.starts_with(['<', '_', '#'])
        && !trimmed.contains(char::is_whitespace);
    if bare {
        return Ok(Some(Statement::new(
            Node::iri(trimmed),
            LISTED_PREDICATE,
            Node::literal(""),
        )));
    }
    parse_line(line)
}

fn at_line(err: CoreError, line: usize) -> CoreError {
    match err {
        CoreError::Parse { message, .. } => CoreError::Parse { line, message },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_uris_become_subjects() {
        let statement = parse_record("http://example.org/a")
            .expect("parse")
            .expect("statement");
        assert_eq!(statement.subject, Node::iri("http://example.org/a"));
        assert_eq!(statement.predicate, LISTED_PREDICATE);
    }

    #[test]
    fn statements_and_comments_are_parsed() {
        assert!(parse_record("# comment").expect("parse").is_none());
        assert!(parse_record("   ").expect("parse").is_none());
        let statement = parse_record("<http://a.org/s> <http://a.org/p> <http://a.org/o> .")
            .expect("parse")
            .expect("statement");
        assert_eq!(statement.object, Node::iri("http://a.org/o"));
    }
}
