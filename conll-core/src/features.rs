//! # Engenharia de Features para NER
//!
//! Para cada token, extrai um vetor de features binárias que o Perceptron usa
//! para pontuar as tags. Features capturam informações ortográficas, lexicais
//! e contextuais.
//!
//! ## Features Implementadas
//!
//! ### Features do token atual
//! - Forma da palavra (lowercase)
//! - Capitalização: IsCapitalized, IsAllCaps, IsMixed
//! - Prefixos e sufixos de 2, 3 e 4 caracteres
//! - Contém dígitos, hífens, pontos
//! - É apenas dígito, é pontuação
//!
//! ### Features de contexto (janela de 2 tokens)
//! - Palavras anteriores e posteriores
//! - Bigrama (anterior, posterior)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// As features ativas de um token.
///
/// O mapa é esparso porque o espaço de features é aberto (ex: "word=brussels",
/// "suffix3=els"), mas cada token ativa só algumas dezenas. A ordem é
/// determinística, o que mantém o dropout reprodutível com uma semente fixa.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    /// O mapa de features ativas. Ex: `{"is_capitalized": 1.0, "word=germany": 1.0}`.
    pub features: BTreeMap<String, f64>,
    /// Índice do token na sentença.
    pub token_index: usize,
}

impl FeatureVector {
    pub fn new(token_index: usize) -> Self {
        Self {
            features: BTreeMap::new(),
            token_index,
        }
    }

    /// Adiciona uma feature ao vetor com valor 1.0 (binária) ou customizado.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.features.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.features.contains_key(key)
    }
}

/// Gera vetores de features para toda a sequência de tokens.
///
/// O índice `i` do retorno corresponde ao token `i` da entrada.
///
/// # Exemplo
/// Para "the European Commission said", o vetor do índice 1 ("European") conterá:
/// - `word=european`
/// - `is_capitalized`
/// - `prev_word=the`
/// - `next_word=commission`
pub fn extract_features<S: AsRef<str>>(tokens: &[S]) -> Vec<FeatureVector> {
    (0..tokens.len())
        .map(|i| extract_for_token(tokens, i))
        .collect()
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

/// Extrai features para um único token em seu contexto
pub fn extract_for_token<S: AsRef<str>>(tokens: &[S], i: usize) -> FeatureVector {
    let mut fv = FeatureVector::new(i);
    let word = tokens[i].as_ref();
    let lower = word.to_lowercase();

    // === Features da palavra atual ===
    fv.insert(format!("word={lower}"), 1.0);
    fv.insert("bias", 1.0);

    let all_upper = word.chars().all(|c| c.is_uppercase() || !c.is_alphabetic());
    let has_upper_in_middle = word.chars().skip(1).any(|c| c.is_uppercase());

    if is_capitalized(word) {
        fv.insert("is_capitalized", 1.0);
    }
    if all_upper && word.chars().count() > 1 {
        fv.insert("is_all_caps", 1.0);
    }
    if has_upper_in_middle {
        fv.insert("is_mixed_case", 1.0);
    }

    // Prefixos e sufixos
    let chars: Vec<char> = lower.chars().collect();
    for n in 2..=4 {
        if chars.len() >= n {
            let prefix: String = chars[..n].iter().collect();
            let suffix: String = chars[chars.len() - n..].iter().collect();
            fv.insert(format!("prefix{n}={prefix}"), 1.0);
            fv.insert(format!("suffix{n}={suffix}"), 1.0);
        }
    }

    // Padrões numéricos e de pontuação
    if !word.is_empty() && word.chars().all(char::is_numeric) {
        fv.insert("is_digit", 1.0);
    } else if word.chars().any(char::is_numeric) {
        fv.insert("has_digit", 1.0);
    }
    if word.contains('-') {
        fv.insert("has_hyphen", 1.0);
    }
    if word.contains('.') {
        fv.insert("has_period", 1.0);
    }
    let mut word_chars = word.chars();
    if let (Some(c), None) = (word_chars.next(), word_chars.next()) {
        if !c.is_alphanumeric() {
            fv.insert("is_punctuation", 1.0);
        }
    }

    // Posição na sequência
    if i == 0 {
        fv.insert("is_first", 1.0);
    }
    if i + 1 == tokens.len() {
        fv.insert("is_last", 1.0);
    }

    // === Features de contexto ===

    if i > 0 {
        let prev = tokens[i - 1].as_ref();
        fv.insert(format!("prev_word={}", prev.to_lowercase()), 1.0);
        if is_capitalized(prev) {
            fv.insert("prev_is_capitalized", 1.0);
        }
    } else {
        fv.insert("BOS", 1.0);
    }

    if i > 1 {
        fv.insert(format!("prev2_word={}", tokens[i - 2].as_ref().to_lowercase()), 1.0);
    }

    if i + 1 < tokens.len() {
        let next = tokens[i + 1].as_ref();
        fv.insert(format!("next_word={}", next.to_lowercase()), 1.0);
        if is_capitalized(next) {
            fv.insert("next_is_capitalized", 1.0);
        }
    } else {
        fv.insert("EOS", 1.0);
    }

    if i + 2 < tokens.len() {
        fv.insert(format!("next2_word={}", tokens[i + 2].as_ref().to_lowercase()), 1.0);
    }

    // Bigramas de contexto
    if i > 0 && i + 1 < tokens.len() {
        let bigram = format!(
            "bigram={}_{}",
            tokens[i - 1].as_ref().to_lowercase(),
            tokens[i + 1].as_ref().to_lowercase()
        );
        fv.insert(bigram, 1.0);
    }

    fv
}
