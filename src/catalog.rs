//! Vocabulary catalog - the words a learner can schedule.
//!
//! The catalog is read-only content. A JSON file (`{"items": [...]}`) can
//! replace the built-in seed set; the scheduler itself only ever sees item ids.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::domain::{Difficulty, LearningMode, VocabularyItem};

/// Container for items in a catalog JSON file.
#[derive(Debug, Deserialize)]
struct CatalogData {
    items: Vec<VocabularyItem>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<VocabularyItem>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog; later duplicates of an id are dropped with a warning.
    pub fn new(items: Vec<VocabularyItem>) -> Self {
        let mut kept = Vec::with_capacity(items.len());
        let mut index = HashMap::with_capacity(items.len());
        for item in items {
            if index.contains_key(&item.id) {
                tracing::warn!("Duplicate vocabulary id '{}' ignored", item.id);
                continue;
            }
            index.insert(item.id.clone(), kept.len());
            kept.push(item);
        }
        Self { items: kept, index }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogLoadError> {
        if !path.exists() {
            return Err(CatalogLoadError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| CatalogLoadError::IoError(path.display().to_string(), e.to_string()))?;

        let data: CatalogData = serde_json::from_str(&content)
            .map_err(|e| CatalogLoadError::ParseError(path.display().to_string(), e.to_string()))?;

        tracing::debug!("Loaded {} vocabulary items from {}", data.items.len(), path.display());
        Ok(Self::new(data.items))
    }

    /// Load from `path` when given, falling back to the built-in set on any error
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        match path.map(Self::from_json_file) {
            Some(Ok(catalog)) => catalog,
            Some(Err(e)) => {
                tracing::warn!("Catalog not available, using built-in words: {}", e);
                Self::builtin()
            }
            None => Self::builtin(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_WORDS
                .iter()
                .map(|w| VocabularyItem {
                    id: w.0.to_string(),
                    word: w.1.to_string(),
                    translation: w.2.to_string(),
                    definition: w.3.to_string(),
                    example_sentence: w.4.to_string(),
                    category: w.5.to_string(),
                    mode: w.6,
                    difficulty: w.7,
                })
                .collect(),
        )
    }

    pub fn get(&self, id: &str) -> Option<&VocabularyItem> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn items(&self) -> &[VocabularyItem] {
        &self.items
    }

    pub fn by_mode(&self, mode: LearningMode) -> Vec<&VocabularyItem> {
        self.items.iter().filter(|item| item.mode == mode).collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<&VocabularyItem> {
        self.items.iter().filter(|item| item.category == category).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Catalog loading errors.
#[derive(Debug)]
pub enum CatalogLoadError {
    FileNotFound(String),
    IoError(String, String),
    ParseError(String, String),
}

impl std::fmt::Display for CatalogLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogLoadError::FileNotFound(path) => write!(f, "Catalog file not found: {}", path),
            CatalogLoadError::IoError(path, err) => write!(f, "IO error reading {}: {}", path, err),
            CatalogLoadError::ParseError(path, err) => write!(f, "Parse error in {}: {}", path, err),
        }
    }
}

impl std::error::Error for CatalogLoadError {}

// ==================== Built-in Words ====================

type SeedWord = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    LearningMode,
    Difficulty,
);

use Difficulty::{Advanced, Beginner, Intermediate};
use LearningMode::{Life, Tech};

const BUILTIN_WORDS: &[SeedWord] = &[
    ("tech_meetings_001", "stand-up", "reunião diária", "A short daily team meeting", "Let's keep the stand-up under fifteen minutes.", "tech_meetings", Tech, Beginner),
    ("tech_meetings_002", "action item", "tarefa pendente", "A task agreed on during a meeting", "I'll take that action item.", "tech_meetings", Tech, Beginner),
    ("tech_meetings_003", "blocker", "impedimento", "Something that stops progress", "Do you have any blockers today?", "tech_meetings", Tech, Beginner),
    ("tech_meetings_004", "sync up", "alinhar", "To meet briefly and share status", "Can we sync up after lunch?", "tech_meetings", Tech, Intermediate),
    ("tech_code_review_001", "pull request", "pull request", "A proposal to merge code changes", "I opened a pull request for the fix.", "tech_code_review", Tech, Beginner),
    ("tech_code_review_002", "nitpick", "detalhe menor", "A minor, optional review comment", "Just a nitpick: rename this variable.", "tech_code_review", Tech, Intermediate),
    ("tech_code_review_003", "rebase", "rebasear", "To replay commits onto another branch", "Please rebase onto main before merging.", "tech_code_review", Tech, Intermediate),
    ("tech_code_review_004", "LGTM", "parece bom", "Looks good to me; approval of a change", "LGTM, ship it.", "tech_code_review", Tech, Beginner),
    ("tech_slack_email_001", "heads-up", "aviso prévio", "Advance warning about something", "Quick heads-up: the deploy is delayed.", "tech_slack_email", Tech, Beginner),
    ("tech_slack_email_002", "follow up", "dar retorno", "To check back on an earlier topic", "I'll follow up by email tomorrow.", "tech_slack_email", Tech, Beginner),
    ("tech_vocabulary_001", "deploy", "implantar", "To release software to an environment", "We deploy to production every Friday.", "tech_vocabulary", Tech, Beginner),
    ("tech_vocabulary_002", "rollback", "reverter", "To return to a previous version", "The release failed, so we did a rollback.", "tech_vocabulary", Tech, Intermediate),
    ("tech_vocabulary_003", "bottleneck", "gargalo", "The slowest part that limits throughput", "The database is the bottleneck.", "tech_vocabulary", Tech, Advanced),
    ("tech_career_001", "performance review", "avaliação de desempenho", "A periodic assessment of your work", "My performance review is next week.", "tech_career", Tech, Intermediate),
    ("tech_career_002", "raise", "aumento", "An increase in salary", "She asked for a raise.", "tech_career", Tech, Beginner),
    ("life_greetings_001", "how's it going?", "como vai?", "Informal way to ask how someone is", "Hey Sam, how's it going?", "life_greetings", Life, Beginner),
    ("life_greetings_002", "nice to meet you", "prazer em conhecê-lo", "Said when meeting someone for the first time", "Nice to meet you, I'm Ana.", "life_greetings", Life, Beginner),
    ("life_restaurant_001", "check", "conta", "The bill at a restaurant", "Could we get the check, please?", "life_restaurant", Life, Beginner),
    ("life_restaurant_002", "to go", "para viagem", "Food packed to take away", "A coffee to go, please.", "life_restaurant", Life, Beginner),
    ("life_restaurant_003", "tip", "gorjeta", "Extra money given for good service", "We left a twenty percent tip.", "life_restaurant", Life, Beginner),
    ("life_shopping_001", "receipt", "recibo", "Proof of purchase", "Keep the receipt in case you return it.", "life_shopping", Life, Beginner),
    ("life_shopping_002", "on sale", "em promoção", "Available at a reduced price", "These shoes are on sale.", "life_shopping", Life, Beginner),
    ("life_transportation_001", "commute", "trajeto diário", "The regular trip to and from work", "My commute takes forty minutes.", "life_transportation", Life, Intermediate),
    ("life_healthcare_001", "appointment", "consulta", "A scheduled meeting with a doctor", "I have a dentist appointment at three.", "life_healthcare", Life, Beginner),
    ("life_healthcare_002", "prescription", "receita médica", "A doctor's written order for medicine", "The pharmacy needs your prescription.", "life_healthcare", Life, Intermediate),
    ("life_housing_001", "lease", "contrato de aluguel", "A rental contract", "We signed a one-year lease.", "life_housing", Life, Intermediate),
    ("life_banking_001", "overdraft", "cheque especial", "Spending more than the account balance", "I was charged an overdraft fee.", "life_banking", Life, Advanced),
    ("life_idioms_001", "break the ice", "quebrar o gelo", "To ease the tension when meeting people", "He told a joke to break the ice.", "life_idioms", Life, Intermediate),
    ("life_idioms_002", "piece of cake", "moleza", "Something very easy", "The exam was a piece of cake.", "life_idioms", Life, Intermediate),
    ("life_phone_001", "hold on", "aguarde", "Wait for a moment on a call", "Hold on, let me transfer you.", "life_phone", Life, Beginner),
];
