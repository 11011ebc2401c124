use crate::error::{CoreError, Result};
use crate::statement::{Node, Statement};

/// Parses a whole N-Triples (or N-Quads) document. Blank lines and comments
/// are skipped; the first malformed line aborts with its 1-based number.
pub fn parse_ntriples(input: &str) -> Result<Vec<Statement>> {
    let mut statements = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        if let Some(statement) = parse_line(line).map_err(|err| with_line(err, idx + 1))? {
            statements.push(statement);
        }
    }
    Ok(statements)
}

/// Parses one line. Returns `None` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<Statement>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut cursor = Cursor::new(trimmed);
    let subject = match cursor.term()? {
        node @ (Node::Iri(_) | Node::Blank(_)) => node,
        Node::Literal { .. } => return Err(cursor.error("literal in subject position")),
    };
    let predicate = match cursor.term()? {
        Node::Iri(iri) => iri,
        _ => return Err(cursor.error("predicate must be an IRI")),
    };
    let object = cursor.term()?;

    cursor.skip_whitespace();
    let graph = if cursor.peek() == Some('<') {
        match cursor.term()? {
            Node::Iri(iri) => Some(iri),
            _ => None,
        }
    } else {
        None
    };

    cursor.skip_whitespace();
    if cursor.peek() != Some('.') {
        return Err(cursor.error("expected '.'"));
    }
    cursor.bump();
    cursor.skip_whitespace();
    if !cursor.rest().is_empty() && !cursor.rest().starts_with('#') {
        return Err(cursor.error("trailing content after '.'"));
    }

    let mut statement = Statement::new(subject, predicate, object);
    statement.graph = graph;
    Ok(Some(statement))
}

fn with_line(err: CoreError, line: usize) -> CoreError {
    match err {
        CoreError::Parse { message, .. } => CoreError::Parse { line, message },
        other => other,
    }
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: &str) -> CoreError {
        CoreError::Parse {
            line: 1,
            message: format!("{message} at column {}", self.pos + 1),
        }
    }

    fn term(&mut self) -> Result<Node> {
        self.skip_whitespace();
        match self.peek() {
            Some('<') => self.iri().map(Node::Iri),
            Some('_') => self.blank(),
            Some('"') => self.literal(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of line")),
        }
    }

    fn iri(&mut self) -> Result<String> {
        self.bump();
        let start = self.pos;
        loop {
            match self.bump() {
                Some('>') => return Ok(self.input[start..self.pos - 1].to_string()),
                Some(ch) if ch.is_whitespace() => return Err(self.error("whitespace inside IRI")),
                Some(_) => {}
                None => return Err(self.error("unterminated IRI")),
            }
        }
    }

    fn blank(&mut self) -> Result<Node> {
        if !self.rest().starts_with("_:") {
            return Err(self.error("malformed blank node"));
        }
        self.pos += 2;
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.'))
        {
            self.bump();
        }
        // A trailing '.' terminates the statement, not the label.
        let mut label = &self.input[start..self.pos];
        while let Some(stripped) = label.strip_suffix('.') {
            label = stripped;
            self.pos -= 1;
        }
        if label.is_empty() {
            return Err(self.error("empty blank node label"));
        }
        Ok(Node::blank(label))
    }

    fn literal(&mut self) -> Result<Node> {
        self.bump();
        let mut lexical = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => lexical.push(self.escape()?),
                Some(ch) => lexical.push(ch),
                None => return Err(self.error("unterminated literal")),
            }
        }

        let mut language = None;
        let mut datatype = None;
        if self.peek() == Some('@') {
            self.bump();
            let start = self.pos;
            while self
                .peek()
                .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '-')
            {
                self.bump();
            }
            if start == self.pos {
                return Err(self.error("empty language tag"));
            }
            language = Some(self.input[start..self.pos].to_string());
        } else if self.rest().starts_with("^^") {
            self.pos += 2;
            if self.peek() != Some('<') {
                return Err(self.error("datatype must be an IRI"));
            }
            datatype = Some(self.iri()?);
        }

        Ok(Node::Literal {
            lexical,
            datatype,
            language,
        })
    }

    fn escape(&mut self) -> Result<char> {
        match self.bump() {
            Some('t') => Ok('\t'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('b') => Ok('\u{8}'),
            Some('f') => Ok('\u{c}'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some('\\') => Ok('\\'),
            Some('u') => self.unicode(4),
            Some('U') => self.unicode(8),
            _ => Err(self.error("invalid escape sequence")),
        }
    }

    fn unicode(&mut self, digits: usize) -> Result<char> {
        let hex = self
            .rest()
            .get(..digits)
            .ok_or_else(|| self.error("truncated unicode escape"))?;
        let value = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid unicode escape"))?;
        self.pos += digits;
        char::from_u32(value).ok_or_else(|| self.error("invalid code point"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iri_triple() {
        let statement = parse_line(
            "<http://example.org/s> <http://example.org/p> <http://example.org/o> .",
        )
        .expect("parse")
        .expect("statement");
        assert_eq!(statement.subject, Node::iri("http://example.org/s"));
        assert_eq!(statement.predicate, "http://example.org/p");
        assert_eq!(statement.object, Node::iri("http://example.org/o"));
        assert_eq!(statement.graph, None);
    }

    #[test]
    fn parses_literals_and_blank_nodes() {
        let tagged = parse_line(r#"_:b0 <http://example.org/name> "Café \"x\""@fr ."#)
            .expect("parse")
            .expect("statement");
        assert_eq!(tagged.subject, Node::blank("b0"));
        assert_eq!(tagged.object.token(), "\"Café \"x\"\"@fr");

        let typed = parse_line(
            "<http://a.org/s> <http://a.org/p> \"1\"^^<http://www.w3.org/2001/XMLSchema#int> .",
        )
        .expect("parse")
        .expect("statement");
        assert_eq!(
            typed.object,
            Node::Literal {
                lexical: "1".to_string(),
                datatype: Some("http://www.w3.org/2001/XMLSchema#int".to_string()),
                language: None,
            }
        );

        let blank_object = parse_line("<http://a.org/s> <http://a.org/p> _:node1.")
            .expect("parse")
            .expect("statement");
        assert_eq!(blank_object.object, Node::blank("node1"));
    }

    #[test]
    fn reads_quads_and_skips_comments() {
        let doc = "# header\n\n<http://a.org/s> <http://a.org/p> <http://a.org/o> <http://a.org/g> .\n";
        let statements = parse_ntriples(doc).expect("parse");
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].graph.as_deref(), Some("http://a.org/g"));
    }

    #[test]
    fn reports_line_numbers() {
        let doc = "<http://a.org/s> <http://a.org/p> <http://a.org/o> .\n\"lit\" <http://a.org/p> <http://a.org/o> .";
        match parse_ntriples(doc) {
            Err(CoreError::Parse { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("subject"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_terminator_is_rejected() {
        assert!(parse_line("<http://a.org/s> <http://a.org/p> <http://a.org/o>").is_err());
    }
}
