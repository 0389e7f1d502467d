//! Rewriting of host search strings containing a semantic clause.
//!
//! Everything after the first `vec:` is a natural-language query; everything
//! before it stays a regular host filter. The semantic part is replaced by a
//! disjunction of note ids that the host can evaluate natively.

use crate::types::NoteId;

/// Marker separating the regular filter from the semantic query.
pub const DELIMITER: &str = "vec:";

/// Default host field used to match note ids.
pub const DEFAULT_ID_FIELD: &str = "id";

/// A raw search string split at the semantic delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedQuery<'a> {
    /// No delimiter; the string is handed to the host as is.
    Plain(&'a str),

    /// Regular clause and semantic query, both trimmed.
    Semantic { regular: &'a str, semantic: &'a str },
}

impl<'a> ParsedQuery<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match raw.split_once(DELIMITER) {
            Some((regular, semantic)) => ParsedQuery::Semantic {
                regular: regular.trim(),
                semantic: semantic.trim(),
            },
            None => ParsedQuery::Plain(raw),
        }
    }

    /// The semantic query, if any.
    pub fn semantic(&self) -> Option<&'a str> {
        match self {
            ParsedQuery::Plain(_) => None,
            ParsedQuery::Semantic { semantic, .. } => Some(semantic),
        }
    }
}

/// Builds host search strings from semantic results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRewriter {
    id_field: String,
}

impl Default for QueryRewriter {
    fn default() -> Self {
        Self::new(DEFAULT_ID_FIELD)
    }
}

impl QueryRewriter {
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
        }
    }

    /// `(id:1 OR id:2)`; `()` for no ids.
    pub fn disjunction(&self, ids: &[NoteId]) -> String {
        let terms: Vec<String> = ids
            .iter()
            .map(|id| format!("{}:{}", self.id_field, id))
            .collect();
        format!("({})", terms.join(" OR "))
    }

    /// Combine the regular clause of `parsed` with the semantic hits.
    ///
    /// Plain queries come back unchanged and `ids` is ignored.
    pub fn rewrite(&self, parsed: &ParsedQuery<'_>, ids: &[NoteId]) -> String {
        match parsed {
            ParsedQuery::Plain(raw) => (*raw).to_string(),
            ParsedQuery::Semantic { regular, .. } => {
                let disjunction = self.disjunction(ids);
                if regular.is_empty() {
                    disjunction
                } else {
                    format!("{} {}", regular, disjunction)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[i64]) -> Vec<NoteId> {
        raw.iter().copied().map(NoteId).collect()
    }

    #[test]
    fn test_parse_plain() {
        assert_eq!(ParsedQuery::parse("deck:French"), ParsedQuery::Plain("deck:French"));
        assert_eq!(ParsedQuery::parse("  spaced  ").semantic(), None);
    }

    #[test]
    fn test_parse_splits_on_first_delimiter() {
        let parsed = ParsedQuery::parse(" deck:French  vec: animals vec: pets ");
        assert_eq!(
            parsed,
            ParsedQuery::Semantic {
                regular: "deck:French",
                semantic: "animals vec: pets",
            }
        );
    }

    #[test]
    fn test_rewrite_with_regular_clause() {
        let rewriter = QueryRewriter::default();
        let parsed = ParsedQuery::parse("deck:French vec:animals");
        assert_eq!(
            rewriter.rewrite(&parsed, &ids(&[11, 42])),
            "deck:French (id:11 OR id:42)"
        );
    }

    #[test]
    fn test_rewrite_semantic_only() {
        let rewriter = QueryRewriter::default();
        let parsed = ParsedQuery::parse("vec:animals");
        assert_eq!(rewriter.rewrite(&parsed, &ids(&[7])), "(id:7)");
    }

    #[test]
    fn test_rewrite_no_hits_matches_nothing() {
        let rewriter = QueryRewriter::default();
        let parsed = ParsedQuery::parse("tag:x vec:nothing");
        assert_eq!(rewriter.rewrite(&parsed, &[]), "tag:x ()");
        assert_eq!(rewriter.rewrite(&ParsedQuery::parse("vec:"), &[]), "()");
    }

    #[test]
    fn test_rewrite_plain_passthrough() {
        let rewriter = QueryRewriter::default();
        let parsed = ParsedQuery::parse(" deck:French ");
        assert_eq!(rewriter.rewrite(&parsed, &ids(&[1])), " deck:French ");
    }

    #[test]
    fn test_custom_id_field() {
        let rewriter = QueryRewriter::new("nid");
        assert_eq!(rewriter.disjunction(&ids(&[1, 2])), "(nid:1 OR nid:2)");
    }
}
