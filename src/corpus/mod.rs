pub mod types;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use types::{CorpusDocument, Recipe};

/// The fixed recipe collection, loaded once and never mutated.
#[derive(Debug, Default)]
pub struct CorpusStore {
    recipes: Vec<Recipe>,
}

impl CorpusStore {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }

    /// Load the corpus file. Any malformed record fails the whole load.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read recipes from {:?}", path))?;
        let store = Self::from_json(&raw)
            .with_context(|| format!("Failed to parse recipes in {:?}", path))?;
        info!(count = store.len(), path = ?path, "Loaded recipes");
        Ok(store)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let doc: CorpusDocument = serde_json::from_str(raw).context("invalid corpus document")?;
        Ok(Self::new(doc.recipes))
    }

    pub fn get(&self, position: usize) -> Option<&Recipe> {
        self.recipes.get(position)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Embedding texts in corpus order; row `i` belongs to recipe `i`.
    pub fn embedding_texts(&self) -> Vec<String> {
        self.recipes.iter().map(Recipe::embedding_text).collect()
    }
}
