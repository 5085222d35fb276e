use std::sync::Arc;

use tracing::{debug, info};

use crate::corpus::types::Recipe;
use crate::corpus::CorpusStore;
use crate::embed::Embedder;
use crate::error::{QaError, QaResult};
use crate::index::VectorIndex;

/// Corpus plus its vector index, built once at startup and then read-only.
/// Index row `i` is the embedding of corpus recipe `i`.
#[derive(Debug)]
pub struct KnowledgeBase {
    corpus: CorpusStore,
    index: VectorIndex,
}

impl KnowledgeBase {
    pub async fn build(corpus: CorpusStore, embedder: &dyn Embedder) -> QaResult<Self> {
        let texts = corpus.embedding_texts();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(QaError::Embedding(format!(
                "got {} vectors for {} recipes",
                vectors.len(),
                texts.len()
            )));
        }
        let index = VectorIndex::build(&vectors)?;
        info!(
            recipes = corpus.len(),
            dimension = index.dimension(),
            "Vector index built"
        );
        Ok(Self { corpus, index })
    }

    pub fn corpus(&self) -> &CorpusStore {
        &self.corpus
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}

/// A retrieved recipe with its squared L2 distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecipe {
    pub distance: f32,
    pub position: usize,
    pub recipe: Recipe,
}

/// Turns a question into the nearest recipes.
pub struct Retriever {
    kb: Arc<KnowledgeBase>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(kb: Arc<KnowledgeBase>, embedder: Arc<dyn Embedder>) -> Self {
        Self { kb, embedder }
    }

    /// Nearest `k` recipes to `query`, nearest first.
    pub async fn retrieve(&self, query: &str, k: usize) -> QaResult<Vec<ScoredRecipe>> {
        if k == 0 || self.kb.index.is_empty() {
            debug!(k, corpus = self.kb.corpus.len(), "nothing to retrieve");
            return Ok(Vec::new());
        }

        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| QaError::Embedding("no vector returned for query".to_string()))?;

        let hits = self.kb.index.query(&vector, k)?;
        let results = hits
            .into_iter()
            .map(|hit| {
                let recipe = self.kb.corpus.get(hit.row).cloned().ok_or_else(|| {
                    QaError::Retrieval(format!("index row {} has no recipe", hit.row))
                })?;
                Ok(ScoredRecipe {
                    distance: hit.distance,
                    position: hit.row,
                    recipe,
                })
            })
            .collect::<QaResult<Vec<_>>>()?;

        info!(
            query,
            requested = k,
            found = results.len(),
            nearest = ?results.first().map(|r| (r.position, r.distance)),
            "Retrieved recipes"
        );
        Ok(results)
    }
}
