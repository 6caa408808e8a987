//! Context retrieval and query planning collaborator interfaces.
//!
//! Both collaborators are optional: the orchestrator degrades to an empty
//! context and a heuristic test plan when they are absent or failing. Their
//! output is advisory metadata and never feeds the numeric pipeline.

use crate::error::AnalysisError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize)]
pub struct ContextDocument {
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    pub relevance_score: f64,
}

pub trait ContextRetriever: Send + Sync {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ContextDocument>, AnalysisError>;
}

pub trait QueryPlanner: Send + Sync {
    fn invoke(&self, prompt: &str) -> Result<String, AnalysisError>;
}

/// Deterministic in-memory retriever scoring documents by token overlap with
/// the query. Stands in for the vector store during tests and offline runs.
#[derive(Debug, Default)]
pub struct LexicalRetriever {
    documents: Vec<(String, BTreeMap<String, String>)>,
}

impl LexicalRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_document(&mut self, content: &str, metadata: BTreeMap<String, String>) {
        self.documents.push((content.to_string(), metadata));
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

impl ContextRetriever for LexicalRetriever {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ContextDocument>, AnalysisError> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ContextDocument> = self
            .documents
            .iter()
            .filter_map(|(content, metadata)| {
                let doc_tokens = tokenize(content);
                let overlap = query_tokens.intersection(&doc_tokens).count();
                if overlap == 0 {
                    return None;
                }
                Some(ContextDocument {
                    content: content.clone(),
                    metadata: metadata.clone(),
                    relevance_score: overlap as f64 / query_tokens.len() as f64,
                })
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retriever() -> LexicalRetriever {
        let mut retriever = LexicalRetriever::new();
        retriever.index_document("payment checkout flow handler", BTreeMap::new());
        retriever.index_document("auth token refresh", BTreeMap::new());
        retriever.index_document("payment refund worker", BTreeMap::new());
        retriever
    }

    #[test]
    fn ranks_by_overlap() {
        let results = retriever()
            .retrieve("payment checkout", 10)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].content.contains("checkout"));
        assert!(results[0].relevance_score > results[1].relevance_score);
    }

    #[test]
    fn respects_k() {
        let results = retriever().retrieve("payment", 1).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn empty_query_yields_nothing() {
        assert!(retriever().retrieve("  ", 5).unwrap().is_empty());
    }

    #[test]
    fn unrelated_query_yields_nothing() {
        assert!(retriever().retrieve("kubernetes", 5).unwrap().is_empty());
    }
}
