//! # conll-core: Conversão de Corpora CoNLL-2003 e Treino de NER
//!
//! Este crate lê arquivos no formato CoNLL-2003 (uma linha por token, quatro
//! colunas separadas por espaço, linha vazia entre sentenças) e os converte em
//! sentenças anotadas com spans de **caracteres**, o formato que o treinador
//! de NER consome.
//!
//! ## Arquitetura
//!
//! 1.  **Leitura** ([`reader`]): cada linha vira um [`reader::Row`] (token, fronteira ou malformada).
//! 2.  **Offsets** ([`offsets`]): um cursor por sentença calcula `[start, end)` e casa a tag com os rótulos BIO ([`tagger`]).
//! 3.  **Sentenças** ([`sentence`]): tokens e spans são acumulados até a linha vazia.
//! 4.  **Conversão** ([`converter`]): orquestra os passos anteriores sobre um arquivo.
//! 5.  **Treino** ([`pipeline`], [`trainer`]): um Perceptron médio ([`perceptron`]) sobre as features de [`features`].
//! 6.  **Pós-processamento** ([`postprocess`]): limpa o arquivo etiquetado em um `.tsv`.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use conll_core::{converter::convert_reader, ConvertOptions, Tag};
//!
//! let corpus = "Peter NNP B-NP B-PER\nBlackburn NNP I-NP I-PER\n\n";
//! let output = convert_reader(corpus.as_bytes(), ConvertOptions::default()).unwrap();
//!
//! let sentence = &output.sentences[0];
//! assert_eq!(sentence.text, "Peter Blackburn");
//! for span in sentence.entities() {
//!     println!("{:?} -> {}", span.slice(&sentence.text), span.tag);
//! }
//! assert_eq!(sentence.entities()[1].tag, Tag::from_label("I-PER").unwrap());
//! ```

pub mod converter;
pub mod error;
pub mod features;
pub mod offsets;
pub mod perceptron;
pub mod pipeline;
pub mod postprocess;
pub mod reader;
pub mod sentence;
pub mod tagger;
pub mod trainer;

pub use converter::{ConvertOptions, Converter, CorpusOutput, FlatToken};
pub use error::{ConllError, Result};
pub use pipeline::{Losses, NerPipeline};
pub use postprocess::postprocess;
pub use sentence::{Annotations, SentenceRecord};
pub use tagger::{EntityCategory, EntitySpan, Tag, TagMatch};
pub use trainer::{TrainConfig, TrainReport};
