//! # Esquema de Tags BIO e Spans de Entidade
//!
//! Define o conjunto fixo de rótulos do CoNLL-2003 e o [`EntitySpan`], a
//! anotação por offsets de caracteres que o conversor produz.
//!
//! ## Categorias de Entidades
//!
//! | Prefixo | Significado         | Exemplos                          |
//! |---------|---------------------|-----------------------------------|
//! | PER     | Pessoa              | Peter Blackburn, Fischler         |
//! | ORG     | Organização         | EU, European Commission           |
//! | LOC     | Local/Geográfico    | Germany, Britain                  |
//! | MISC    | Miscelânea          | German, British                   |
//! | O       | Fora de entidade    | (qualquer palavra não-entidade)   |
//!
//! ## Classificação da coluna de tag
//!
//! A quarta coluna do corpus é comparada contra os rótulos em [`Tag::conll_order`].
//! Os oito rótulos `B-`/`I-` são testados por **contenção** de substring
//! ([`TagMatch::Substring`]): um valor como `"B-ORG|B-LOC"` gera dois spans.
//! O rótulo `O` exige igualdade exata, senão toda tag `*-ORG` também
//! casaria com `O`.

use serde::{Deserialize, Serialize};

use crate::error::ConllError;

/// Categorias de entidade do CoNLL-2003.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityCategory {
    /// **Pessoa**: Ex: "Peter Blackburn".
    Per,
    /// **Organização**: Ex: "EU", "Commission".
    Org,
    /// **Localização**: Ex: "Germany".
    Loc,
    /// **Miscelânea**: nacionalidades, eventos, obras. Ex: "German".
    Misc,
}

impl EntityCategory {
    /// Nome da categoria como string (para serialização)
    pub fn name(&self) -> &'static str {
        match self {
            EntityCategory::Per => "PER",
            EntityCategory::Org => "ORG",
            EntityCategory::Loc => "LOC",
            EntityCategory::Misc => "MISC",
        }
    }

    /// Tenta parsear a partir de string (ex: "PER" → Some(Per))
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PER" => Some(EntityCategory::Per),
            "ORG" => Some(EntityCategory::Org),
            "LOC" => Some(EntityCategory::Loc),
            "MISC" => Some(EntityCategory::Misc),
            _ => None,
        }
    }
}

/// Tag BIO aplicada a um token.
///
/// Serializa como o próprio rótulo (`"B-PER"`, `"O"`), que é a forma que o
/// treinador consome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Tag {
    /// **Begin**: primeiro token de uma entidade.
    Begin(EntityCategory),
    /// **Inside**: tokens seguintes da mesma entidade.
    Inside(EntityCategory),
    /// **Outside**: o token não faz parte de nenhuma entidade.
    Outside,
}

/// Política de comparação entre a coluna de tag e os rótulos conhecidos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMatch {
    /// `B-`/`I-` casam por contenção de substring; `O` por igualdade.
    #[default]
    Substring,
    /// Todos os rótulos exigem igualdade exata.
    Exact,
}

impl Tag {
    /// Representação textual da tag (ex: "B-PER", "I-ORG", "O")
    pub fn label(&self) -> String {
        match self {
            Tag::Begin(cat) => format!("B-{}", cat.name()),
            Tag::Inside(cat) => format!("I-{}", cat.name()),
            Tag::Outside => "O".to_string(),
        }
    }

    /// Índice numérico da tag, usado como posição nos vetores de pesos.
    pub fn index(&self) -> usize {
        match self {
            Tag::Outside => 0,
            Tag::Begin(EntityCategory::Per) => 1,
            Tag::Inside(EntityCategory::Per) => 2,
            Tag::Begin(EntityCategory::Org) => 3,
            Tag::Inside(EntityCategory::Org) => 4,
            Tag::Begin(EntityCategory::Loc) => 5,
            Tag::Inside(EntityCategory::Loc) => 6,
            Tag::Begin(EntityCategory::Misc) => 7,
            Tag::Inside(EntityCategory::Misc) => 8,
        }
    }

    /// Número total de tags possíveis
    pub const COUNT: usize = 9;

    /// Todas as tags em ordem de [`Tag::index`]
    pub fn all() -> [Tag; 9] {
        [
            Tag::Outside,
            Tag::Begin(EntityCategory::Per),
            Tag::Inside(EntityCategory::Per),
            Tag::Begin(EntityCategory::Org),
            Tag::Inside(EntityCategory::Org),
            Tag::Begin(EntityCategory::Loc),
            Tag::Inside(EntityCategory::Loc),
            Tag::Begin(EntityCategory::Misc),
            Tag::Inside(EntityCategory::Misc),
        ]
    }

    /// Os rótulos na ordem em que a coluna de tag é testada.
    ///
    /// Quando uma tag ambígua casa com mais de um rótulo, os spans saem nesta ordem.
    pub fn conll_order() -> [Tag; 9] {
        [
            Tag::Begin(EntityCategory::Misc),
            Tag::Inside(EntityCategory::Misc),
            Tag::Begin(EntityCategory::Loc),
            Tag::Inside(EntityCategory::Loc),
            Tag::Begin(EntityCategory::Org),
            Tag::Inside(EntityCategory::Org),
            Tag::Begin(EntityCategory::Per),
            Tag::Inside(EntityCategory::Per),
            Tag::Outside,
        ]
    }

    /// Retorna a categoria desta tag (se for B- ou I-)
    pub fn category(&self) -> Option<EntityCategory> {
        match self {
            Tag::Begin(c) | Tag::Inside(c) => Some(*c),
            Tag::Outside => None,
        }
    }

    /// Parseia uma tag a partir de string (ex: "B-PER" → Begin(Per))
    pub fn from_label(s: &str) -> Option<Self> {
        if s == "O" {
            return Some(Tag::Outside);
        }
        let (prefix, cat) = s.split_once('-')?;
        let cat = EntityCategory::from_str(cat)?;
        match prefix {
            "B" => Some(Tag::Begin(cat)),
            "I" => Some(Tag::Inside(cat)),
            _ => None,
        }
    }

    /// Classifica o valor bruto da coluna de tag.
    ///
    /// Retorna **todos** os rótulos que casam, em [`Tag::conll_order`]. Um valor
    /// que não casa com nada retorna um vetor vazio.
    ///
    /// # Exemplo
    /// `"B-ORG"` → `[B-ORG]`; `"B-ORG|B-LOC"` → `[B-LOC, B-ORG]`; `"X"` → `[]`
    pub fn matching(raw: &str, policy: TagMatch) -> Vec<Tag> {
        Tag::conll_order()
            .into_iter()
            .filter(|tag| {
                let label = tag.label();
                match (tag, policy) {
                    (Tag::Outside, _) | (_, TagMatch::Exact) => raw == label,
                    (_, TagMatch::Substring) => raw.contains(label.as_str()),
                }
            })
            .collect()
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.label()
    }
}

impl TryFrom<String> for Tag {
    type Error = ConllError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Tag::from_label(&s).ok_or(ConllError::UnknownLabel(s))
    }
}

/// Uma entidade anotada por offsets de caracteres na sentença.
///
/// `start` e `end` contam caracteres (não bytes) a partir do início do texto
/// da sentença; `end` é exclusivo. Serializa como a tripla
/// `[start, end, "LABEL"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "(usize, usize, Tag)", from = "(usize, usize, Tag)")]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub tag: Tag,
}

impl EntitySpan {
    pub fn new(start: usize, end: usize, tag: Tag) -> Self {
        Self { start, end, tag }
    }

    /// Número de caracteres cobertos pelo span.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recorta o trecho do texto coberto por este span.
    ///
    /// Retorna `None` se os offsets estiverem fora do texto.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        if self.end < self.start {
            return None;
        }
        let mut boundaries = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()));
        let start = boundaries.nth(self.start)?;
        let end = match self.len() {
            0 => start,
            n => boundaries.nth(n - 1)?,
        };
        text.get(start..end)
    }
}

impl From<EntitySpan> for (usize, usize, Tag) {
    fn from(span: EntitySpan) -> Self {
        (span.start, span.end, span.tag)
    }
}

impl From<(usize, usize, Tag)> for EntitySpan {
    fn from((start, end, tag): (usize, usize, Tag)) -> Self {
        EntitySpan { start, end, tag }
    }
}
