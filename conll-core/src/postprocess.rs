//! # Pós-processador da Saída Etiquetada
//!
//! Converte o arquivo `token<TAB>tag` escrito pela avaliação em um `.tsv`
//! limpo, linha a linha:
//!
//! | Entrada         | Saída          |
//! |-----------------|----------------|
//! | `####\tO`       | (nada)         |
//! | ` \tO`          | linha vazia    |
//! | `word\tLOC`     | `word\tLOC`    |
//! | (linha vazia)   | linha vazia    |
//!
//! Linhas sem os campos necessários são registradas em log e puladas. Aplicar
//! o pós-processador sobre a própria saída não muda nada.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{ConllError, Result};

/// Token sentinela que é descartado.
pub const SENTINEL: &str = "####";
/// Token que marca fronteira de sentença.
pub const BOUNDARY: &str = " ";

/// O que uma linha da entrada vira na saída.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaggedLine<'a> {
    /// Linha sentinela: não escreve nada.
    Sentinel,
    /// Fronteira de sentença: escreve uma linha vazia.
    Boundary,
    /// Par token/tag.
    Pair { token: &'a str, tag: &'a str },
    /// Linha sem os campos necessários.
    Invalid,
}

impl<'a> TaggedLine<'a> {
    /// Classifica uma linha (já sem o `\n` final).
    pub fn parse(line: &'a str) -> Self {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            return TaggedLine::Boundary;
        }
        let mut fields = line.split('\t');
        let token = fields.next().unwrap_or_default();
        match token {
            SENTINEL => TaggedLine::Sentinel,
            BOUNDARY => TaggedLine::Boundary,
            "" => TaggedLine::Invalid,
            _ => match fields.next() {
                Some(tag) => TaggedLine::Pair { token, tag },
                None => TaggedLine::Invalid,
            },
        }
    }
}

/// Contadores de uma execução do pós-processador.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostprocessStats {
    pub lines: usize,
    pub pairs: usize,
    pub boundaries: usize,
    pub skipped: usize,
}

/// Caminho de saída: o nome do arquivo de entrada com `.tsv` acrescentado.
pub fn tsv_path(path: impl AsRef<Path>) -> PathBuf {
    let mut out = path.as_ref().as_os_str().to_os_string();
    out.push(".tsv");
    PathBuf::from(out)
}

/// Processa um fluxo qualquer, escrevendo o TSV em `output`.
pub fn postprocess_stream<R: BufRead, W: Write>(input: R, mut output: W) -> Result<PostprocessStats> {
    let mut stats = PostprocessStats::default();
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        stats.lines += 1;
        match TaggedLine::parse(&line) {
            TaggedLine::Sentinel => {}
            TaggedLine::Boundary => {
                writeln!(output)?;
                stats.boundaries += 1;
            }
            TaggedLine::Pair { token, tag } => {
                writeln!(output, "{token}\t{tag}")?;
                stats.pairs += 1;
            }
            TaggedLine::Invalid => {
                warn!(line = i + 1, content = ?line, "skipping line without token and tag");
                stats.skipped += 1;
            }
        }
    }
    output.flush()?;
    Ok(stats)
}

/// Pós-processa `tagged_file`, escrevendo `<tagged_file>.tsv`. Retorna o caminho gerado.
pub fn postprocess(tagged_file: impl AsRef<Path>) -> Result<PathBuf> {
    let input_path = tagged_file.as_ref();
    let output_path = tsv_path(input_path);

    let input = File::open(input_path).map_err(|e| ConllError::read(input_path, e))?;
    let output = File::create(&output_path).map_err(|e| ConllError::write(&output_path, e))?;

    let stats = postprocess_stream(BufReader::new(input), BufWriter::new(output))?;
    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        pairs = stats.pairs,
        skipped = stats.skipped,
        "postprocess done"
    );
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> (String, PostprocessStats) {
        let mut out = Vec::new();
        let stats = postprocess_stream(input.as_bytes(), &mut out).unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn test_line_classification() {
        assert_eq!(
            TaggedLine::parse("word\tLOC"),
            TaggedLine::Pair {
                token: "word",
                tag: "LOC"
            }
        );
        assert_eq!(TaggedLine::parse(" \tO"), TaggedLine::Boundary);
        assert_eq!(TaggedLine::parse("####\tO"), TaggedLine::Sentinel);
        assert_eq!(TaggedLine::parse(""), TaggedLine::Boundary);
        assert_eq!(TaggedLine::parse("\tO"), TaggedLine::Invalid);
        assert_eq!(TaggedLine::parse("word"), TaggedLine::Invalid);
        // só a segunda coluna é mantida
        assert_eq!(
            TaggedLine::parse("word\tLOC\t"),
            TaggedLine::Pair {
                token: "word",
                tag: "LOC"
            }
        );
        // tag vazia ainda é um par
        assert_eq!(
            TaggedLine::parse("word\t"),
            TaggedLine::Pair {
                token: "word",
                tag: ""
            }
        );
    }

    #[test]
    fn test_three_branches() {
        let (out, stats) = run("word\tLOC\n \tO\n####\tO\nother\tO\n");
        assert_eq!(out, "word\tLOC\n\nother\tO\n");
        assert_eq!(stats.lines, 4);
        assert_eq!(stats.pairs, 2);
        assert_eq!(stats.boundaries, 1);
        assert_eq!(stats.skipped, 0);
    }

    #[test]
    fn test_invalid_lines_are_skipped() {
        let (out, stats) = run("word\tLOC\n\tO\nlonely\nnext\tPER\n");
        assert_eq!(out, "word\tLOC\nnext\tPER\n");
        assert_eq!(stats.skipped, 2);
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let (first, _) = run("EU\tORG\nrejects\t\n \t\n####\tO\nPeter\tPER\n \t\n");
        let (second, _) = run(&first);
        assert_eq!(first, second);
    }

    #[test]
    fn test_tsv_path_appends_extension() {
        assert_eq!(tsv_path("out/tagged"), PathBuf::from("out/tagged.tsv"));
        assert_eq!(tsv_path("tagged.txt"), PathBuf::from("tagged.txt.tsv"));
    }

    #[test]
    fn test_postprocess_file() {
        let dir = tempfile::tempdir().unwrap();
        let tagged = dir.path().join("tagged");
        std::fs::write(&tagged, "EU\tORG\n \t\n").unwrap();

        let out = postprocess(&tagged).unwrap();
        assert_eq!(out, dir.path().join("tagged.tsv"));
        assert_eq!(std::fs::read_to_string(out).unwrap(), "EU\tORG\n\n");
    }

    #[test]
    fn test_postprocess_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = postprocess(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, ConllError::Read { .. }));
    }
}
