//! # Leitor de Corpus CoNLL-2003
//!
//! Lê o arquivo coluna-a-coluna e classifica cada linha em um [`Row`]:
//!
//! ```text
//! EU NNP B-NP B-ORG        → Row::Token   (4 campos)
//! rejects VBZ B-VP O       → Row::Token
//!                          → Row::Boundary (linha vazia = fim de sentença)
//! Peter NNP                → Row::Malformed (qualquer outra aridade)
//! ```
//!
//! Os campos são separados por espaço simples, sem aspas. Espaços logo após um
//! separador (ou no início da linha) são ignorados; um separador no fim da
//! linha gera um último campo vazio.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::error::{ConllError, Result};

/// Número de colunas de uma linha de token bem-formada: token, POS, chunk, NER.
pub const TOKEN_ROW_FIELDS: usize = 4;

/// Uma linha do corpus já classificada pela sua aridade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    /// Linha com exatamente 4 campos. Só o primeiro e o quarto são usados.
    Token { text: String, tag: String },
    /// Linha vazia: fronteira de sentença.
    Boundary,
    /// Qualquer outra aridade. O token entra no texto, mas nenhum span é gerado.
    Malformed { text: String, fields: usize },
}

/// Visão efêmera de uma linha de token: o texto e, se houver, a tag bruta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRecord<'a> {
    pub text: &'a str,
    pub tag: Option<&'a str>,
}

impl Row {
    /// Classifica uma linha (já sem o `\n` final).
    pub fn parse(line: &str) -> Row {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let fields = split_fields(line);
        match fields.len() {
            0 => Row::Boundary,
            TOKEN_ROW_FIELDS => Row::Token {
                text: fields[0].to_string(),
                tag: fields[3].to_string(),
            },
            n => Row::Malformed {
                text: fields[0].to_string(),
                fields: n,
            },
        }
    }

    /// O registro de token desta linha, ou `None` para uma fronteira.
    pub fn record(&self) -> Option<TokenRecord<'_>> {
        match self {
            Row::Token { text, tag } => Some(TokenRecord {
                text: text.as_str(),
                tag: Some(tag.as_str()),
            }),
            Row::Malformed { text, .. } => Some(TokenRecord {
                text: text.as_str(),
                tag: None,
            }),
            Row::Boundary => None,
        }
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self, Row::Boundary)
    }
}

/// Divide uma linha em campos separados por espaço.
///
/// Linha vazia → nenhum campo. `"a  b"` → `["a", "b"]`; `"a b "` → `["a", "b", ""]`.
pub fn split_fields(line: &str) -> Vec<&str> {
    if line.is_empty() {
        return Vec::new();
    }
    let mut fields = Vec::new();
    let mut rest = line;
    loop {
        let field = rest.trim_start_matches(' ');
        match field.find(' ') {
            Some(pos) => {
                fields.push(&field[..pos]);
                rest = &field[pos + 1..];
            }
            None => {
                fields.push(field);
                break;
            }
        }
    }
    fields
}

/// Iterador preguiçoso sobre as linhas classificadas de um corpus.
///
/// Cada item é um `Result`: um erro de leitura no meio do arquivo aborta a conversão.
pub struct CorpusReader<R> {
    lines: Lines<R>,
    origin: Option<PathBuf>,
}

impl CorpusReader<BufReader<File>> {
    /// Abre o arquivo do corpus.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ConllError::read(path, e))?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            origin: Some(path.to_path_buf()),
        })
    }
}

impl<R: BufRead> CorpusReader<R> {
    /// Lê de qualquer fonte bufferizada (útil para testes e stdin).
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            origin: None,
        }
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        Some(match line {
            Ok(line) => Ok(Row::parse(&line)),
            Err(e) => Err(match &self.origin {
                Some(path) => ConllError::read(path, e),
                None => ConllError::Io(e),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fields_skips_initial_space() {
        assert!(split_fields("").is_empty());
        assert_eq!(split_fields("EU NNP B-NP B-ORG"), vec!["EU", "NNP", "B-NP", "B-ORG"]);
        assert_eq!(split_fields("a  b"), vec!["a", "b"]);
        assert_eq!(split_fields("  a b"), vec!["a", "b"]);
        assert_eq!(split_fields("a b "), vec!["a", "b", ""]);
        assert_eq!(split_fields(" "), vec![""]);
        // tab não é separador
        assert_eq!(split_fields("a\tb"), vec!["a\tb"]);
    }

    #[test]
    fn test_row_classification() {
        assert_eq!(Row::parse(""), Row::Boundary);
        assert_eq!(
            Row::parse("EU NNP B-NP B-ORG"),
            Row::Token {
                text: "EU".into(),
                tag: "B-ORG".into()
            }
        );
        assert_eq!(
            Row::parse("Peter NNP"),
            Row::Malformed {
                text: "Peter".into(),
                fields: 2
            }
        );
        // separador final gera um quinto campo vazio
        assert_eq!(
            Row::parse("EU NNP B-NP B-ORG "),
            Row::Malformed {
                text: "EU".into(),
                fields: 5
            }
        );
        assert_eq!(
            Row::parse("EU NNP B-NP B-ORG\r"),
            Row::Token {
                text: "EU".into(),
                tag: "B-ORG".into()
            }
        );
    }

    #[test]
    fn test_record_view() {
        let row = Row::parse("rejects VBZ B-VP O");
        let record = row.record().unwrap();
        assert_eq!(record.text, "rejects");
        assert_eq!(record.tag, Some("O"));

        let row = Row::parse("rejects VBZ");
        assert_eq!(row.record().unwrap().tag, None);

        assert!(Row::Boundary.record().is_none());
    }

    #[test]
    fn test_reader_yields_rows_lazily() {
        let input = "EU NNP B-NP B-ORG\n\nPeter NNP B-NP B-PER\n";
        let rows: Vec<Row> = CorpusReader::new(input.as_bytes())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].is_boundary());
    }

    #[test]
    fn test_open_missing_file_is_read_error() {
        let err = CorpusReader::open("/definitely/not/here.conll").err().unwrap();
        assert!(matches!(err, ConllError::Read { .. }));
    }
}
