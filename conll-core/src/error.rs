//! # Erros do conversor e do ciclo de treino
//!
//! Todas as operações públicas de `conll-core` retornam [`Result`]. Falhas de
//! I/O carregam o caminho do arquivo envolvido sempre que ele é conhecido.

use std::path::PathBuf;

use thiserror::Error;

/// Erros que podem ocorrer na conversão, no pós-processamento ou no treino.
#[derive(Debug, Error)]
pub enum ConllError {
    /// O arquivo não pôde ser aberto ou uma linha não pôde ser lida.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// O arquivo de saída não pôde ser criado ou escrito.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Erro de I/O sem caminho associado (leitores e escritores genéricos).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Falha ao (de)serializar JSON (modelo, metadados, registros).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Uma string que não pertence ao conjunto de tags CoNLL.
    #[error("unknown label: {0:?}")]
    UnknownLabel(String),

    /// O diretório do modelo não contém `model.json`.
    #[error("no model found at {0}")]
    ModelNotFound(PathBuf),

    /// O corpus de treino não produziu nenhuma sentença.
    #[error("training corpus {0} contains no sentences")]
    EmptyCorpus(PathBuf),
}

impl ConllError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConllError::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConllError::Write {
            path: path.into(),
            source,
        }
    }
}

/// Alias de resultado para as operações deste crate.
pub type Result<T> = std::result::Result<T, ConllError>;
