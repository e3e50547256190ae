//! # Rastreador de Offsets e Construtor de Spans
//!
//! Mantém o cursor de caracteres da sentença em construção. Cada token ocupa
//! `chars(token)` posições mais **um** espaço separador, exatamente como o
//! `join(" ")` que monta o texto da sentença. Os spans só são válidos enquanto
//! essa igualdade se mantém, por isso todo token avança o cursor, tenha ele
//! tag reconhecida ou não.
//!
//! ```text
//! "EU rejects"
//!  0123456789
//!  EU      → [0, 2)   cursor 0 → 3
//!  rejects → [3, 10)  cursor 3 → 11
//! ```

use crate::reader::Row;
use crate::tagger::{EntitySpan, Tag, TagMatch};

/// Resultado de processar uma linha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Fronteira de sentença: o chamador deve finalizar a sentença e chamar [`OffsetTracker::reset`].
    Boundary,
    /// Um token foi consumido; `spans` pode estar vazio (linha malformada ou tag desconhecida).
    Token {
        start: usize,
        end: usize,
        spans: Vec<EntitySpan>,
    },
}

/// Cursor de caracteres de uma sentença, com a política de classificação de tags.
#[derive(Debug, Clone, Default)]
pub struct OffsetTracker {
    cursor: usize,
    policy: TagMatch,
}

impl OffsetTracker {
    pub fn new(policy: TagMatch) -> Self {
        Self { cursor: 0, policy }
    }

    /// Posição (em caracteres) onde o próximo token vai começar.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Consome uma linha, emitindo um span por rótulo que casar com a tag.
    pub fn process(&mut self, row: &Row) -> Step {
        let Some(record) = row.record() else {
            return Step::Boundary;
        };

        let start = self.cursor;
        let end = start + record.text.chars().count();

        let spans = match record.tag {
            Some(raw) => Tag::matching(raw, self.policy)
                .into_iter()
                .map(|tag| EntitySpan::new(start, end, tag))
                .collect(),
            None => Vec::new(),
        };

        self.cursor = end + 1;
        Step::Token { start, end, spans }
    }

    /// Volta o cursor para o início da sentença.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::EntityCategory;

    fn token(line: &str) -> Row {
        Row::parse(line)
    }

    #[test]
    fn test_cursor_reserves_separator() {
        let mut tracker = OffsetTracker::default();
        let step = tracker.process(&token("EU NNP B-NP B-ORG"));
        assert_eq!(
            step,
            Step::Token {
                start: 0,
                end: 2,
                spans: vec![EntitySpan::new(0, 2, Tag::Begin(EntityCategory::Org))],
            }
        );
        assert_eq!(tracker.cursor(), 3);

        let step = tracker.process(&token("rejects VBZ B-VP O"));
        assert_eq!(
            step,
            Step::Token {
                start: 3,
                end: 10,
                spans: vec![EntitySpan::new(3, 10, Tag::Outside)],
            }
        );
        assert_eq!(tracker.cursor(), 11);
    }

    #[test]
    fn test_malformed_row_advances_without_spans() {
        let mut tracker = OffsetTracker::default();
        let step = tracker.process(&token("Peter NNP"));
        assert_eq!(
            step,
            Step::Token {
                start: 0,
                end: 5,
                spans: vec![]
            }
        );
        assert_eq!(tracker.cursor(), 6);
    }

    #[test]
    fn test_unknown_tag_advances_without_spans() {
        let mut tracker = OffsetTracker::default();
        tracker.process(&token("1996-08-22 CD I-NP B-DATE"));
        assert_eq!(tracker.cursor(), 11);
    }

    #[test]
    fn test_ambiguous_tag_emits_one_span_per_label() {
        let mut tracker = OffsetTracker::default();
        let Step::Token { spans, .. } = tracker.process(&token("Bonn NNP I-NP B-LOC/B-ORG"))
        else {
            panic!("expected token step");
        };
        assert_eq!(
            spans,
            vec![
                EntitySpan::new(0, 4, Tag::Begin(EntityCategory::Loc)),
                EntitySpan::new(0, 4, Tag::Begin(EntityCategory::Org)),
            ]
        );
    }

    #[test]
    fn test_offsets_count_characters_not_bytes() {
        let mut tracker = OffsetTracker::default();
        tracker.process(&token("Zürich NNP I-NP B-LOC"));
        assert_eq!(tracker.cursor(), 7);
    }

    #[test]
    fn test_boundary_signal_and_reset() {
        let mut tracker = OffsetTracker::new(TagMatch::Exact);
        tracker.process(&token("EU NNP B-NP B-ORG"));
        assert_eq!(tracker.process(&Row::Boundary), Step::Boundary);
        // a fronteira não mexe no cursor; quem reseta é o chamador
        assert_eq!(tracker.cursor(), 3);
        tracker.reset();
        assert_eq!(tracker.cursor(), 0);
    }
}
