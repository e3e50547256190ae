//! # Pipeline NER: Treino e Etiquetagem sobre Sentenças Convertidas
//!
//! O pipeline consome exatamente o formato produzido pelo conversor:
//! `(texto, {"entities": [(start, end, label)]})`. O texto já vem tokenizado
//! (tokens separados por espaço simples), então a tokenização aqui é só um
//! `split(' ')`, e os rótulos por token são recuperados casando o offset de
//! início de cada token com o `start` dos spans.
//!
//! ## Ciclo de vida
//!
//! 1. [`NerPipeline::blank`] ou [`NerPipeline::from_disk`].
//! 2. [`NerPipeline::add_label`] para cada rótulo visto no treino.
//! 3. [`NerPipeline::begin_training`], depois [`NerPipeline::update`] por exemplo.
//! 4. [`NerPipeline::finish_training`] calcula a média dos pesos.
//! 5. [`NerPipeline::tag`] e [`NerPipeline::to_disk`].

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConllError, Result};
use crate::features::extract_features;
use crate::perceptron::PerceptronModel;
use crate::sentence::Annotations;
use crate::tagger::Tag;

/// Nome do arquivo de pesos dentro do diretório do modelo.
pub const MODEL_FILE: &str = "model.json";

/// Nome do componente nas perdas de treino.
pub const NER_PIPE: &str = "ner";

/// Perdas acumuladas por componente (ex: `{"ner": 1234.0}`).
pub type Losses = BTreeMap<String, f64>;

/// Divide o texto de uma sentença convertida em tokens.
///
/// O texto vazio de uma sentença degenerada não tem tokens.
pub fn tokenize(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split(' ').collect()
    }
}

/// Rótulo de referência de cada token, a partir dos spans.
///
/// Um token recebe o rótulo do **primeiro** span que começa no seu offset;
/// tokens sem span (linhas malformadas, tags desconhecidas) ficam com `O`.
pub fn gold_tags(text: &str, annotations: &Annotations) -> Vec<Tag> {
    let mut by_start: HashMap<usize, Tag> = HashMap::new();
    for span in &annotations.entities {
        by_start.entry(span.start).or_insert(span.tag);
    }

    let mut offset = 0;
    tokenize(text)
        .into_iter()
        .map(|token| {
            let tag = by_start.get(&offset).copied().unwrap_or(Tag::Outside);
            offset += token.chars().count() + 1;
            tag
        })
        .collect()
}

/// O componente NER: rótulos registrados e o modelo que os prediz.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NerPipeline {
    labels: Vec<Tag>,
    model: PerceptronModel,
}

impl NerPipeline {
    /// Pipeline vazio, sem rótulos nem pesos.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Carrega um pipeline salvo por [`NerPipeline::to_disk`].
    pub fn from_disk(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(MODEL_FILE);
        if !path.is_file() {
            return Err(ConllError::ModelNotFound(dir.as_ref().to_path_buf()));
        }
        let file = File::open(&path).map_err(|e| ConllError::read(&path, e))?;
        let pipeline: Self = serde_json::from_reader(BufReader::new(file))?;
        info!(path = %path.display(), labels = pipeline.labels.len(), "loaded model");
        Ok(pipeline)
    }

    /// Salva o pipeline em `dir/model.json`, criando o diretório se preciso.
    pub fn to_disk(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| ConllError::write(dir, e))?;
        let path = dir.join(MODEL_FILE);
        let file = File::create(&path).map_err(|e| ConllError::write(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush().map_err(|e| ConllError::write(&path, e))?;
        info!(path = %path.display(), "saved model");
        Ok(())
    }

    pub fn labels(&self) -> &[Tag] {
        &self.labels
    }

    /// Registra um rótulo. Rótulos repetidos são ignorados.
    pub fn add_label(&mut self, tag: Tag) -> bool {
        if self.labels.contains(&tag) {
            return false;
        }
        self.labels.push(tag);
        true
    }

    /// Prepara o treino. `O` é sempre um rótulo válido.
    pub fn begin_training(&mut self) {
        self.add_label(Tag::Outside);
        info!(
            labels = ?self.labels.iter().map(Tag::label).collect::<Vec<_>>(),
            features = self.model.num_features(),
            "begin training"
        );
    }

    /// Atualiza o modelo com um exemplo `(texto, anotações)`.
    ///
    /// `drop` é a probabilidade de descartar cada feature neste passo; o
    /// número de erros é somado em `losses["ner"]`.
    pub fn update<R: Rng>(
        &mut self,
        text: &str,
        annotations: &Annotations,
        drop: f64,
        rng: &mut R,
        losses: &mut Losses,
    ) -> Result<()> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Ok(());
        }

        let gold = gold_tags(text, annotations);
        if let Some(unknown) = gold.iter().find(|tag| !self.labels.contains(tag)) {
            return Err(ConllError::UnknownLabel(unknown.label()));
        }

        let vectors = extract_features(&tokens);
        let mistakes = self.model.update(&vectors, &gold, &self.labels, drop, rng);
        *losses.entry(NER_PIPE.to_string()).or_default() += mistakes as f64;
        Ok(())
    }

    /// Encerra uma rodada de treino substituindo os pesos pelas médias.
    pub fn finish_training(&mut self) {
        self.model.average();
        debug!(features = self.model.num_features(), "weights averaged");
    }

    /// Etiqueta uma sentença já tokenizada por espaços.
    pub fn tag(&self, text: &str) -> Vec<(String, Tag)> {
        let tokens = tokenize(text);
        extract_features(&tokens)
            .iter()
            .zip(&tokens)
            .map(|(fv, token)| (token.to_string(), self.model.predict(fv, &self.labels)))
            .collect()
    }
}
