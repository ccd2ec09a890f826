//! Embedding adapters.

pub mod hashed;

pub use hashed::HashedEmbedder;
