//! # Acumulador de Sentenças
//!
//! Junta os tokens de uma sentença e os spans emitidos para eles até a próxima
//! linha vazia, quando o par `(texto, {"entities": [...]})` é emitido de uma vez.

use serde::{Deserialize, Serialize};

use crate::tagger::EntitySpan;

/// As anotações de uma sentença, no formato que o treinador consome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    pub entities: Vec<EntitySpan>,
}

/// Uma sentença convertida: texto com tokens separados por espaço simples e seus spans.
///
/// Serializa como `["EU rejects", {"entities": [[0, 2, "B-ORG"], [3, 10, "O"]]}]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "(String, Annotations)", from = "(String, Annotations)")]
pub struct SentenceRecord {
    pub text: String,
    pub annotations: Annotations,
}

impl SentenceRecord {
    pub fn new(text: impl Into<String>, entities: Vec<EntitySpan>) -> Self {
        Self {
            text: text.into(),
            annotations: Annotations { entities },
        }
    }

    pub fn entities(&self) -> &[EntitySpan] {
        &self.annotations.entities
    }

    /// Sentença degenerada, produzida por duas linhas vazias seguidas.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.annotations.entities.is_empty()
    }
}

impl From<SentenceRecord> for (String, Annotations) {
    fn from(record: SentenceRecord) -> Self {
        (record.text, record.annotations)
    }
}

impl From<(String, Annotations)> for SentenceRecord {
    fn from((text, annotations): (String, Annotations)) -> Self {
        Self { text, annotations }
    }
}

/// Estado em construção de uma sentença.
#[derive(Debug, Clone, Default)]
pub struct SentenceAccumulator {
    tokens: Vec<String>,
    spans: Vec<EntitySpan>,
}

impl SentenceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_token(&mut self, text: impl Into<String>) {
        self.tokens.push(text.into());
    }

    pub fn push_spans(&mut self, spans: impl IntoIterator<Item = EntitySpan>) {
        self.spans.extend(spans);
    }

    /// Número de tokens ainda não emitidos.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Emite a sentença e esvazia o acumulador.
    ///
    /// Sem tokens, emite `SentenceRecord("", {entities: []})`: sentenças
    /// degeneradas não são filtradas.
    pub fn finalize(&mut self) -> SentenceRecord {
        let text = self.tokens.join(" ");
        self.tokens.clear();
        SentenceRecord::new(text, std::mem::take(&mut self.spans))
    }
}
