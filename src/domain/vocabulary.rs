use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningMode {
  Tech,
  Life,
}

impl LearningMode {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "tech" => Some(Self::Tech),
      "life" => Some(Self::Life),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Tech => "tech",
      Self::Life => "life",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Beginner,
  Intermediate,
  Advanced,
}

/// A learnable word from the catalog. The scheduler only ever sees its `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
  pub id: String,
  pub word: String,
  pub translation: String,
  #[serde(default)]
  pub definition: String,
  #[serde(default)]
  pub example_sentence: String,
  pub category: String,
  pub mode: LearningMode,
  pub difficulty: Difficulty,
}
