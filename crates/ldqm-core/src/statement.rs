use serde::{Deserialize, Serialize};

/// `rdf:type`; metrics skip instance declarations when harvesting URIs.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Term in subject or object position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Node {
    Iri(String),
    Blank(String),
    Literal {
        lexical: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
}

impl Node {
    pub fn iri(value: impl Into<String>) -> Self {
        Node::Iri(value.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Node::Blank(label.into())
    }

    pub fn literal(lexical: impl Into<String>) -> Self {
        Node::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Node::Iri(value) => Some(value),
            _ => None,
        }
    }

    /// Token form: the bare IRI, `_:label`, or a quoted literal.
    pub fn token(&self) -> String {
        match self {
            Node::Iri(value) => value.clone(),
            Node::Blank(label) => format!("_:{label}"),
            Node::Literal {
                lexical,
                datatype,
                language,
            } => match (language, datatype) {
                (Some(lang), _) => format!("\"{lexical}\"@{lang}"),
                (None, Some(dt)) => format!("\"{lexical}\"^^<{dt}>"),
                (None, None) => format!("\"{lexical}\""),
            },
        }
    }
}

/// A single statement of the dataset under assessment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Node,
    pub predicate: String,
    pub object: Node,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,
}

impl Statement {
    pub fn new(subject: Node, predicate: impl Into<String>, object: Node) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
            graph: None,
        }
    }

    pub fn is_type_declaration(&self) -> bool {
        self.predicate == RDF_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_distinguish_term_kinds() {
        assert_eq!(Node::iri("http://a.org/x").token(), "http://a.org/x");
        assert_eq!(Node::blank("b0").token(), "_:b0");
        assert_eq!(Node::literal("hi").token(), "\"hi\"");
        let tagged = Node::Literal {
            lexical: "Berlin".to_string(),
            datatype: None,
            language: Some("de".to_string()),
        };
        assert_eq!(tagged.token(), "\"Berlin\"@de");
    }

    #[test]
    fn statement_serializes_with_tagged_nodes() {
        let stmt = Statement::new(
            Node::iri("http://a.org/s"),
            RDF_TYPE,
            Node::iri("http://a.org/C"),
        );
        assert!(stmt.is_type_declaration());
        let json = serde_json::to_value(&stmt).expect("serialize");
        assert_eq!(json["subject"]["kind"], "iri");
        assert!(json.get("graph").is_none());
    }
}
