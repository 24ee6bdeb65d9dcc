//! lexqa-core: passage retrieval over structured legal corpora
//!
//! Given a corpus of laws, each with articles made of numbered paragraphs,
//! this crate answers free-text questions with the paragraphs whose
//! embeddings sit closest to the question's embedding.
//!
//! # Architecture
//!
//! ```text
//! laws.json → corpus::flatten → Embedder::embed_batch → FlatIndex::build
//!                                                          ↓
//!        query → Embedder::embed → FlatIndex::search → Answer (text, reference, url)
//! ```
//!
//! # Modules
//!
//! - `corpus`: Typed corpus records and the law → article → paragraph flattener
//! - `search`: Embedding providers and the exact L2 vector index
//! - `service`: Knowledge-base build, query answering, service publication
//! - `config`: `lexqa.toml` loading and validation
//! - `logging`: `tracing` subscriber setup
//! - `error`: Error types with remediation guidance
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod logging;
pub mod search;
pub mod service;

pub use error::{Error, Result};
pub use service::{Answer, QueryOutcome, RetrievalService, ServiceHandle};

#[doc(hidden)]
pub use tracing as __tracing;

/// Version of the lexqa-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
