//! # Treino e Avaliação Ponta a Ponta
//!
//! [`run`] executa o fluxo completo sobre um par de arquivos CoNLL-2003:
//! converte treino e teste, treina o [`NerPipeline`] por `n_iter` épocas,
//! etiqueta o teste, grava o arquivo etiquetado, pós-processa esse arquivo e,
//! se houver `output_dir`, salva o modelo.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::converter::{ConvertOptions, Converter};
use crate::error::{ConllError, Result};
use crate::pipeline::{gold_tags, Losses, NerPipeline, NER_PIPE};
use crate::postprocess::postprocess;
use crate::sentence::SentenceRecord;
use crate::tagger::Tag;

/// Metadados gravados ao lado do modelo.
pub const META_FILE: &str = "meta.json";

/// Configuração do treino.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Diretório de um modelo salvo para continuar o treino.
    pub model: Option<PathBuf>,
    /// Onde salvar o modelo treinado. Sem ele, nada é salvo.
    pub output_dir: Option<PathBuf>,
    pub n_iter: usize,
    /// Probabilidade de descartar cada feature em um passo de treino.
    pub drop: f64,
    pub seed: u64,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    /// Arquivo `token\ttag` escrito pela avaliação.
    pub tagged_output: PathBuf,
    pub convert: ConvertOptions,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model: None,
            output_dir: None,
            n_iter: 5,
            drop: 0.5,
            seed: 42,
            train_path: PathBuf::from("data/conll03/eng.train"),
            test_path: PathBuf::from("data/conll03/eng.testa"),
            tagged_output: PathBuf::from("tagged_output"),
            convert: ConvertOptions::default(),
        }
    }
}

/// Acertos por token sobre o conjunto de teste.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub correct: usize,
    pub total: usize,
}

impl Evaluation {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Conteúdo de `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMeta {
    pub config: TrainConfig,
    pub labels: Vec<Tag>,
    pub evaluation: Evaluation,
}

/// O que uma execução de [`run`] produziu.
#[derive(Debug, Clone)]
pub struct TrainReport {
    /// Perdas de cada época, na ordem.
    pub losses: Vec<Losses>,
    pub evaluation: Evaluation,
    pub tagged_output: PathBuf,
    pub tsv_output: PathBuf,
    pub model_dir: Option<PathBuf>,
}

/// Etiqueta todas as sentenças em paralelo e compara com os rótulos de referência.
///
/// Devolve a avaliação e os pares `(token, tag predita)` de cada sentença, na
/// ordem de entrada.
pub fn evaluate(
    nlp: &NerPipeline,
    sentences: &[SentenceRecord],
) -> (Evaluation, Vec<Vec<(String, Tag)>>) {
    let tagged: Vec<(Vec<(String, Tag)>, Evaluation)> = sentences
        .par_iter()
        .map(|sentence| {
            let predicted = nlp.tag(&sentence.text);
            let gold = gold_tags(&sentence.text, &sentence.annotations);
            let correct = predicted
                .iter()
                .zip(&gold)
                .filter(|((_, pred), gold)| pred == *gold)
                .count();
            let eval = Evaluation {
                correct,
                total: gold.len(),
            };
            (predicted, eval)
        })
        .collect();

    let mut total = Evaluation::default();
    let mut out = Vec::with_capacity(tagged.len());
    for (predicted, eval) in tagged {
        total.correct += eval.correct;
        total.total += eval.total;
        out.push(predicted);
    }
    (total, out)
}

/// Grava `token\ttag` por linha, com uma linha ` \t` depois de cada sentença.
pub fn write_tagged<W: Write>(mut out: W, tagged: &[Vec<(String, Tag)>]) -> Result<()> {
    for sentence in tagged {
        for (token, tag) in sentence {
            writeln!(out, "{token}\t{tag}")?;
        }
        writeln!(out, " \t")?;
    }
    out.flush()?;
    Ok(())
}

fn write_tagged_file(path: &Path, tagged: &[Vec<(String, Tag)>]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ConllError::write(parent, e))?;
    }
    let file = File::create(path).map_err(|e| ConllError::write(path, e))?;
    write_tagged(BufWriter::new(file), tagged).map_err(|e| match e {
        ConllError::Io(source) => ConllError::write(path, source),
        other => other,
    })
}

fn save_meta(dir: &Path, meta: &ModelMeta) -> Result<()> {
    let path = dir.join(META_FILE);
    let json = serde_json::to_string_pretty(meta)?;
    fs::write(&path, json).map_err(|e| ConllError::write(&path, e))
}

/// Executa treino, avaliação, pós-processamento e gravação do modelo.
pub fn run(config: &TrainConfig) -> Result<TrainReport> {
    let mut nlp = match &config.model {
        Some(dir) => NerPipeline::from_disk(dir)?,
        None => {
            info!("created blank model");
            NerPipeline::blank()
        }
    };

    let train = Converter::new(&config.train_path)
        .with_options(config.convert)
        .convert()?;
    if train.sentences.is_empty() {
        return Err(ConllError::EmptyCorpus(config.train_path.clone()));
    }
    let test = Converter::new(&config.test_path)
        .with_options(config.convert)
        .convert()?;

    for sentence in &train.sentences {
        for span in sentence.entities() {
            nlp.add_label(span.tag);
        }
    }
    nlp.begin_training();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut examples: Vec<&SentenceRecord> = train.sentences.iter().collect();
    let mut history = Vec::with_capacity(config.n_iter);

    for epoch in 0..config.n_iter {
        examples.shuffle(&mut rng);
        let mut losses = Losses::new();
        for example in &examples {
            nlp.update(
                &example.text,
                &example.annotations,
                config.drop,
                &mut rng,
                &mut losses,
            )?;
        }
        info!(
            epoch = epoch + 1,
            loss = losses.get(NER_PIPE).copied().unwrap_or_default(),
            "losses"
        );
        history.push(losses);
    }
    nlp.finish_training();

    if test.sentences.is_empty() {
        warn!(path = %config.test_path.display(), "test corpus has no sentences");
    }
    let (evaluation, tagged) = evaluate(&nlp, &test.sentences);
    info!(
        correct = evaluation.correct,
        total = evaluation.total,
        accuracy = evaluation.accuracy(),
        "evaluation"
    );

    write_tagged_file(&config.tagged_output, &tagged)?;
    let tsv_output = postprocess(&config.tagged_output)?;

    let model_dir = match &config.output_dir {
        Some(dir) => {
            nlp.to_disk(dir)?;
            save_meta(
                dir,
                &ModelMeta {
                    config: config.clone(),
                    labels: nlp.labels().to_vec(),
                    evaluation,
                },
            )?;
            info!(dir = %dir.display(), "saved model");
            Some(dir.clone())
        }
        None => None,
    };

    Ok(TrainReport {
        losses: history,
        evaluation,
        tagged_output: config.tagged_output.clone(),
        tsv_output,
        model_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::{EntityCategory, EntitySpan};

    const TRAIN: &str = "\
-DOCSTART- -X- -X- O

EU NNP B-NP B-ORG
rejects VBZ B-VP O
German JJ B-NP B-MISC
call NN I-NP O
. . O O

Peter NNP B-NP B-PER
Blackburn NNP I-NP I-PER

BRUSSELS NNP B-NP B-LOC
1996-08-22 CD I-NP O

";

    const TEST: &str = "\
Peter NNP B-NP B-PER
rejects VBZ B-VP O

";

    fn config(dir: &Path) -> TrainConfig {
        let train_path = dir.join("eng.train");
        let test_path = dir.join("eng.testa");
        fs::write(&train_path, TRAIN).unwrap();
        fs::write(&test_path, TEST).unwrap();
        TrainConfig {
            n_iter: 3,
            drop: 0.0,
            train_path,
            test_path,
            tagged_output: dir.join("out").join("tagged"),
            output_dir: Some(dir.join("model")),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = TrainConfig::default();
        assert_eq!(config.n_iter, 5);
        assert_eq!(config.drop, 0.5);
        assert_eq!(config.train_path, PathBuf::from("data/conll03/eng.train"));
        assert_eq!(config.test_path, PathBuf::from("data/conll03/eng.testa"));
        assert!(config.model.is_none());
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn test_config_fills_missing_fields() {
        let config: TrainConfig = serde_json::from_str(r#"{"n_iter": 10}"#).unwrap();
        assert_eq!(config.n_iter, 10);
        assert_eq!(config.drop, 0.5);
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(Evaluation::default().accuracy(), 0.0);
        let eval = Evaluation {
            correct: 3,
            total: 4,
        };
        assert_eq!(eval.accuracy(), 0.75);
    }

    #[test]
    fn test_write_tagged_format() {
        let tagged = vec![
            vec![
                ("EU".to_string(), Tag::Begin(EntityCategory::Org)),
                ("rejects".to_string(), Tag::Outside),
            ],
            vec![("Peter".to_string(), Tag::Begin(EntityCategory::Per))],
        ];
        let mut out = Vec::new();
        write_tagged(&mut out, &tagged).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "EU\tB-ORG\nrejects\tO\n \t\nPeter\tB-PER\n \t\n"
        );
    }

    #[test]
    fn test_evaluate_keeps_order() {
        let mut nlp = NerPipeline::blank();
        nlp.begin_training();
        let sentences = vec![
            SentenceRecord::new("EU rejects".to_string(), vec![]),
            SentenceRecord::new(
                "Peter".to_string(),
                vec![EntitySpan::new(0, 5, Tag::Begin(EntityCategory::Per))],
            ),
        ];
        let (eval, tagged) = evaluate(&nlp, &sentences);
        assert_eq!(tagged[0][0].0, "EU");
        assert_eq!(tagged[1][0].0, "Peter");
        // só O registrado: acerta os dois tokens sem entidade
        assert_eq!(eval, Evaluation { correct: 2, total: 3 });
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let report = run(&config).unwrap();
        assert_eq!(report.losses.len(), 3);
        assert_eq!(report.evaluation.total, 2);
        assert_eq!(report.tsv_output, dir.path().join("out").join("tagged.tsv"));

        let tagged = fs::read_to_string(&report.tagged_output).unwrap();
        assert!(tagged.starts_with("Peter\t"));
        assert!(tagged.ends_with(" \t\n"));
        let tsv = fs::read_to_string(&report.tsv_output).unwrap();
        assert_eq!(tsv.lines().count(), 3);
        assert!(tsv.ends_with("\n\n"));

        let model_dir = report.model_dir.unwrap();
        let meta: ModelMeta =
            serde_json::from_str(&fs::read_to_string(model_dir.join(META_FILE)).unwrap()).unwrap();
        assert_eq!(meta.config, config);
        assert!(meta.labels.contains(&Tag::Inside(EntityCategory::Per)));
        assert!(meta.labels.contains(&Tag::Outside));

        // continua o treino a partir do modelo salvo
        let resumed = TrainConfig {
            model: Some(model_dir),
            output_dir: None,
            n_iter: 1,
            ..config
        };
        let report = run(&resumed).unwrap();
        assert!(report.model_dir.is_none());
        assert_eq!(report.losses.len(), 1);
    }

    #[test]
    fn test_run_with_empty_train_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        fs::write(&config.train_path, "").unwrap();
        let err = run(&config).unwrap_err();
        assert!(matches!(err, ConllError::EmptyCorpus(_)));
    }

    #[test]
    fn test_run_with_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainConfig {
            model: Some(dir.path().join("nope")),
            ..config(dir.path())
        };
        assert!(matches!(run(&config).unwrap_err(), ConllError::ModelNotFound(_)));
    }
}
