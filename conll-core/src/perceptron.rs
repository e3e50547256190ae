//! # Averaged Perceptron para NER
//!
//! Algoritmo online simples e eficiente para classificar cada token com uma tag BIO.
//! Utiliza "Lazy Averaging" para evitar custo O(N*T) na atualização dos pesos médios.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;
use crate::tagger::Tag;

/// Pesos de uma feature, um por tag (posição = [`Tag::index`]).
type TagWeights = [f64; Tag::COUNT];

/// Modelo Perceptron Médio (Averaged Perceptron).
///
/// O Perceptron é um algoritmo de aprendizado **online** e **mistake-driven**:
/// ele processa um token por vez e só atualiza os pesos se errar a predição.
///
/// # Averaged Perceptron
/// A versão padrão do Perceptron oscila muito. O "Averaged" usa a **média** dos pesos
/// de todos os passos como modelo final, o que reduz overfitting e estabiliza o aprendizado.
///
/// # Lazy Averaging
/// Calcular a média real a cada passo seria $O(N \cdot T)$. Esta implementação
/// atualiza a soma de uma feature **apenas quando ela é ativa**, guardando o
/// passo da última atualização.
///
/// Só os pesos são serializados; os acumuladores existem apenas durante o treino.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerceptronModel {
    /// Pesos atuais $w$: feature -> peso por tag.
    weights: HashMap<String, TagWeights>,
    /// Soma acumulada dos pesos: feature -> $\sum w_t$ por tag.
    #[serde(skip)]
    totals: HashMap<String, TagWeights>,
    /// Último passo em que cada peso foi atualizado.
    #[serde(skip)]
    last_update: HashMap<String, [usize; Tag::COUNT]>,
    /// Número de tokens processados desde a última média.
    #[serde(skip)]
    steps: usize,
}

impl PerceptronModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Número de features com algum peso.
    pub fn num_features(&self) -> usize {
        self.weights.len()
    }

    fn score<'a>(&self, features: impl IntoIterator<Item = (&'a String, &'a f64)>, tag: Tag) -> f64 {
        features
            .into_iter()
            .filter_map(|(fname, fval)| self.weights.get(fname).map(|w| w[tag.index()] * fval))
            .sum()
    }

    /// Melhor tag entre `allowed` para as features dadas. Empates ficam com a primeira.
    fn best<'a>(&self, features: &[(&'a String, &'a f64)], allowed: &[Tag]) -> Tag {
        let mut best_tag = allowed.first().copied().unwrap_or(Tag::Outside);
        let mut best_score = f64::NEG_INFINITY;

        for &tag in allowed {
            let score = self.score(features.iter().copied(), tag);
            if score > best_score {
                best_score = score;
                best_tag = tag;
            }
        }
        best_tag
    }

    /// Prediz a tag de um token.
    pub fn predict(&self, fv: &FeatureVector, allowed: &[Tag]) -> Tag {
        let features: Vec<_> = fv.features.iter().collect();
        self.best(&features, allowed)
    }

    /// Um passo de treino sobre uma sentença.
    ///
    /// Para cada token, cada feature é descartada com probabilidade `drop`; o
    /// modelo prediz com as restantes e, se errar, promove a tag correta e
    /// penaliza a predita. Retorna o número de erros.
    pub fn update<R: Rng>(
        &mut self,
        vectors: &[FeatureVector],
        gold: &[Tag],
        allowed: &[Tag],
        drop: f64,
        rng: &mut R,
    ) -> usize {
        let mut mistakes = 0;

        for (fv, &true_tag) in vectors.iter().zip(gold) {
            let kept: Vec<(&String, &f64)> = fv
                .features
                .iter()
                .filter(|_| drop <= 0.0 || rng.gen::<f64>() >= drop)
                .collect();

            // Predição usando pesos REAIS (não averaged durante treino)
            let pred_tag = self.best(&kept, allowed);

            if pred_tag != true_tag {
                for (fname, _) in &kept {
                    self.update_feature(fname, true_tag, 1.0);
                    self.update_feature(fname, pred_tag, -1.0);
                }
                mistakes += 1;
            }

            self.steps += 1;
        }
        mistakes
    }

    /// Atualiza uma feature específica aplicando Lazy Averaging.
    fn update_feature(&mut self, fname: &str, tag: Tag, delta: f64) {
        let t = tag.index();
        let steps = self.steps;
        let w = self.weights.entry(fname.to_string()).or_default();
        let total = self.totals.entry(fname.to_string()).or_default();
        let last = self.last_update.entry(fname.to_string()).or_default();

        // 1. Acumula o peso ANTIGO por todos os passos em que ele ficou constante
        total[t] += (steps - last[t]) as f64 * w[t];
        last[t] = steps;

        // 2. Aplica a mudança
        w[t] += delta;
    }

    /// Substitui os pesos atuais pelas médias ($\sum w_t / T$).
    ///
    /// Depois da média o modelo pode continuar sendo treinado: os pesos médios
    /// passam a ser o ponto de partida.
    pub fn average(&mut self) {
        let steps = self.steps;
        if steps == 0 {
            return;
        }

        for (fname, w) in self.weights.iter_mut() {
            let total = self.totals.entry(fname.clone()).or_default();
            let last = self.last_update.get(fname).copied().unwrap_or_default();
            for t in 0..Tag::COUNT {
                total[t] += (steps - last[t]) as f64 * w[t];
                w[t] = total[t] / steps as f64;
            }
        }

        // Limpa estruturas auxiliares para economizar memória
        self.totals.clear();
        self.last_update.clear();
        self.steps = 0;
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::features::extract_features;
    use crate::tagger::EntityCategory;

    #[test]
    fn test_perceptron_learning_lazy() {
        let tokens = ["Peter", "rejects", "it"];
        let gold = [Tag::Begin(EntityCategory::Per), Tag::Outside, Tag::Outside];
        let allowed = [Tag::Begin(EntityCategory::Per), Tag::Outside];
        let vectors = extract_features(&tokens);

        let mut model = PerceptronModel::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            model.update(&vectors, &gold, &allowed, 0.0, &mut rng);
        }
        model.average();

        let tags: Vec<Tag> = vectors.iter().map(|fv| model.predict(fv, &allowed)).collect();
        assert_eq!(tags[0], Tag::Begin(EntityCategory::Per));
        assert_eq!(tags[1], Tag::Outside);
    }

    #[test]
    fn test_update_counts_mistakes() {
        let vectors = extract_features(&["EU", "rejects"]);
        let gold = [Tag::Begin(EntityCategory::Org), Tag::Outside];
        let allowed = [Tag::Begin(EntityCategory::Org), Tag::Outside];
        let mut model = PerceptronModel::new();
        let mut rng = StdRng::seed_from_u64(0);

        // pesos zerados: empate, vence a primeira tag permitida (B-ORG)
        let mistakes = model.update(&vectors, &gold, &allowed, 0.0, &mut rng);
        assert_eq!(mistakes, 1);
        assert!(model.num_features() > 0);
    }

    #[test]
    fn test_full_dropout_never_learns() {
        let vectors = extract_features(&["EU", "rejects"]);
        let gold = [Tag::Outside, Tag::Outside];
        let allowed = [Tag::Begin(EntityCategory::Org), Tag::Outside];
        let mut model = PerceptronModel::new();
        let mut rng = StdRng::seed_from_u64(0);

        let mistakes = model.update(&vectors, &gold, &allowed, 1.0, &mut rng);
        assert_eq!(mistakes, 2);
        assert_eq!(model.num_features(), 0);
    }

    #[test]
    fn test_weights_survive_serialization() {
        let vectors = extract_features(&["EU", "rejects"]);
        let gold = [Tag::Begin(EntityCategory::Org), Tag::Outside];
        let allowed = [Tag::Outside, Tag::Begin(EntityCategory::Org)];
        let mut model = PerceptronModel::new();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..3 {
            model.update(&vectors, &gold, &allowed, 0.0, &mut rng);
        }
        model.average();

        let json = serde_json::to_string(&model).unwrap();
        let loaded: PerceptronModel = serde_json::from_str(&json).unwrap();
        for fv in &vectors {
            assert_eq!(model.predict(fv, &allowed), loaded.predict(fv, &allowed));
        }
    }
}
