//! Retrieval signals for the assessrank engine.
//!
//! Every index here is built once from the cleaned catalog (or the training
//! history) and is read-only afterwards, so a built index can be shared
//! across concurrent queries without locking.
//!
//! # Main types
//!
//! - [`LexicalIndex`]: Multi-field weighted TF-IDF index with cosine scoring.
//! - [`SemanticIndex`]: Dense item vectors scored by cosine similarity.
//! - [`EmbeddingProvider`]: Trait for computing text embeddings.
//! - [`LocalEmbedding`]: Deterministic hashing embedding, no network needed.
//! - [`PatternModel`]: Popularity and keyword co-occurrence learned from history.

/// Embedding provider trait and implementations.
pub mod embedding;
/// Field-weighted TF-IDF index.
pub mod lexical;
/// Learned query→item patterns.
pub mod patterns;
/// Embedding-backed semantic index.
pub mod semantic;
/// Tokenization, stop-words, and n-grams.
pub mod tokenizer;

#[cfg(feature = "http-embeddings")]
pub use embedding::HttpEmbedding;
pub use embedding::{cosine_similarity, EmbeddingProvider, LocalEmbedding};
pub use lexical::{FieldWeights, LexicalConfig, LexicalIndex};
pub use patterns::{PatternConfig, PatternModel};
pub use semantic::{describe_item, SemanticIndex, SemanticSnapshot};
pub use tokenizer::Tokenizer;
