//! schema-steer: a schema-constrained JSON decoding engine for local LLM
//! inference runtimes.
//!
//! The crate owns the decoding-time machinery — a character-level JSON state
//! machine, a per-object token-prefix trie of admissible keys, the schema
//! model that drives which keys are admissible at each position, a
//! logit-masking/soft-biasing policy, and post-generation validation with
//! repair — behind one object, [`processor::LogitProcessor`], that a host's
//! sampling loop drives step by step. It does not run a model: prompt
//! assembly, the forward pass, tool-call parsing, and the host-facing
//! adapter facade all stay outside this crate, which depends only on a
//! [`tokenizer::TokenizerAdapter`] implementation supplied by the host.

pub mod cache;
pub mod config;
pub mod cursor;
pub mod error;
pub mod json_state;
pub mod mask;
pub mod processor;
pub mod repair;
pub mod schema;
pub mod tokenizer;
pub mod trie;
pub mod validator;

pub use config::{DecodeMode, EngineConfig};
pub use error::{EngineError, Result};
pub use processor::LogitProcessor;
pub use repair::{RepairLoop, StreamBuffer};
pub use schema::parse::parse_schema;
pub use schema::SchemaModel;
pub use tokenizer::TokenizerAdapter;
pub use validator::{JsonValidator, ValidationError};

/// Install a `tracing` subscriber reading its filter from the `RUST_LOG` (or
/// `SCHEMA_STEER_LOG`, checked first) environment variable. A thin, optional
/// convenience for binaries embedding this crate directly — hosts that
/// already install their own `tracing` subscriber should skip this and let
/// the engine's `tracing::{debug,info,warn,error}!` calls flow into it.
pub fn init_tracing_from_env() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("SCHEMA_STEER_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
