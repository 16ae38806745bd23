//! # Club Assistant
//!
//! A retrieval-augmented chat service for the Brooklyn College Computer
//! Science Club.
//!
//! At startup the club's JSON documents are loaded and embedded into an
//! in-memory vector index. Each question posted to the HTTP API is
//! validated, matched against the index, and sent with the best-matching
//! documents to a hosted language model whose answer is streamed back.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────────┐   ┌──────────┐
//! │  HTTP    │──▶│ Validator │──▶│ VectorStore │──▶│  Prompt  │
//! │ (axum)   │   └───────────┘   │  (top-k)    │   └────┬─────┘
//! └────▲─────┘                   └─────────────┘        ▼
//!      │                                         ┌──────────────┐
//!      └────────── streamed text chunks ─────────│ LanguageModel│
//!                                                └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML + environment configuration |
//! | [`models`] | Core data types |
//! | [`loader`] | Static JSON document loading |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | In-memory vector index |
//! | [`validate`] | Request validation |
//! | [`prompt`] | Prompt assembly |
//! | [`llm`] | Streaming language model client |
//! | [`chat`] | Retrieval + generation pipeline |
//! | [`server`] | HTTP server |

pub mod chat;
pub mod config;
pub mod embedding;
pub mod llm;
pub mod loader;
pub mod models;
pub mod prompt;
pub mod server;
pub mod store;
pub mod validate;
