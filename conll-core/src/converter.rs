//! # Conversor CoNLL-2003 → Sentenças Anotadas
//!
//! Orquestra os três componentes em uma única passada:
//!
//! 1. [`CorpusReader`] classifica cada linha em um [`Row`].
//! 2. [`OffsetTracker`] calcula `[start, end)` do token e emite os spans.
//! 3. [`SentenceAccumulator`] junta tokens e spans até a linha vazia.
//!
//! Todo o estado mutável vive em uma [`ConversionSession`], criada a cada
//! chamada de [`Converter::convert`]. Duas conversões nunca compartilham cursor
//! nem listas.
//!
//! ## Exemplo
//!
//! ```rust
//! use conll_core::converter::convert_reader;
//! use conll_core::ConvertOptions;
//!
//! let corpus = "EU NNP B-NP B-ORG\nrejects VBZ B-VP O\n\n";
//! let output = convert_reader(corpus.as_bytes(), ConvertOptions::default()).unwrap();
//!
//! assert_eq!(output.sentences[0].text, "EU rejects");
//! assert_eq!(output.sentences[0].entities().len(), 2);
//! ```

use std::io::BufRead;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::offsets::{OffsetTracker, Step};
use crate::reader::{CorpusReader, Row};
use crate::sentence::{SentenceAccumulator, SentenceRecord};
use crate::tagger::TagMatch;

/// Opções da conversão. O `Default` reproduz o comportamento histórico do conversor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Como a coluna de tag é comparada com os rótulos conhecidos.
    pub tag_match: TagMatch,
    /// Emite os tokens que sobram depois da última linha vazia.
    ///
    /// Desligado por padrão: uma sentença sem linha vazia no fim do arquivo é descartada.
    pub flush_trailing_sentence: bool,
}

/// Uma entrada da lista plana de tokens.
///
/// Serializa como string: o texto do token, ou `" "` para o separador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatToken {
    /// O texto de uma linha não vazia.
    Token(String),
    /// Uma linha vazia, representada por um espaço simples.
    Separator,
}

impl FlatToken {
    pub const SEPARATOR: &'static str = " ";

    pub fn as_str(&self) -> &str {
        match self {
            FlatToken::Token(text) => text,
            FlatToken::Separator => Self::SEPARATOR,
        }
    }
}

impl Serialize for FlatToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FlatToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(if text == Self::SEPARATOR {
            FlatToken::Separator
        } else {
            FlatToken::Token(text)
        })
    }
}

/// Resultado completo de uma conversão.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusOutput {
    /// Pares `(texto, anotações)` na ordem do arquivo.
    pub sentences: Vec<SentenceRecord>,
    /// Textos das sentenças concatenados **sem** separador.
    ///
    /// Apenas diagnóstico: offsets de spans não valem sobre este texto.
    pub plain_text: String,
    /// Todos os tokens, com um [`FlatToken::Separator`] por linha vazia.
    pub tokens: Vec<FlatToken>,
}

/// Estado de uma única conversão: cursor, sentença em construção e saída.
#[derive(Debug, Default)]
pub struct ConversionSession {
    tracker: OffsetTracker,
    sentence: SentenceAccumulator,
    output: CorpusOutput,
    options: ConvertOptions,
}

impl ConversionSession {
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            tracker: OffsetTracker::new(options.tag_match),
            sentence: SentenceAccumulator::new(),
            output: CorpusOutput::default(),
            options,
        }
    }

    /// Processa uma linha classificada.
    pub fn feed(&mut self, row: &Row) {
        match self.tracker.process(row) {
            Step::Boundary => {
                self.output.tokens.push(FlatToken::Separator);
                self.finalize_sentence();
            }
            Step::Token { spans, .. } => {
                if let Some(record) = row.record() {
                    self.output.tokens.push(FlatToken::Token(record.text.to_string()));
                    self.sentence.append_token(record.text);
                }
                self.sentence.push_spans(spans);
            }
        }
    }

    fn finalize_sentence(&mut self) {
        let record = self.sentence.finalize();
        self.tracker.reset();
        debug!(
            sentence = self.output.sentences.len(),
            chars = record.text.chars().count(),
            entities = record.entities().len(),
            "sentence finalized"
        );
        self.output.plain_text.push_str(&record.text);
        self.output.sentences.push(record);
    }

    /// Encerra a sessão e devolve a saída acumulada.
    pub fn finish(mut self) -> CorpusOutput {
        if !self.sentence.is_empty() {
            if self.options.flush_trailing_sentence {
                self.finalize_sentence();
            } else {
                warn!(
                    tokens = self.sentence.len(),
                    "dropping tokens after the last sentence boundary"
                );
            }
        }
        self.output
    }
}

/// Converte um corpus lido de qualquer fonte bufferizada.
pub fn convert_reader<R: BufRead>(reader: R, options: ConvertOptions) -> Result<CorpusOutput> {
    convert_rows(CorpusReader::new(reader), options)
}

fn convert_rows<R: BufRead>(rows: CorpusReader<R>, options: ConvertOptions) -> Result<CorpusOutput> {
    let mut session = ConversionSession::new(options);
    for row in rows {
        session.feed(&row?);
    }
    Ok(session.finish())
}

/// Conversor de um arquivo CoNLL-2003.
///
/// Não faz nada ao ser construído; a leitura só acontece em [`Converter::convert`].
#[derive(Debug, Clone)]
pub struct Converter {
    path: PathBuf,
    options: ConvertOptions,
}

impl Converter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options: ConvertOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lê o arquivo inteiro e devolve as sentenças convertidas.
    ///
    /// Falha se o arquivo não puder ser aberto ou lido; não há recuperação parcial.
    pub fn convert(&self) -> Result<CorpusOutput> {
        info!(path = %self.path.display(), "start conversion");
        let output = convert_rows(CorpusReader::open(&self.path)?, self.options)?;
        info!(
            path = %self.path.display(),
            sentences = output.sentences.len(),
            tokens = output.tokens.len(),
            "conversion done"
        );
        Ok(output)
    }
}
