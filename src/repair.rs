//! RepairLoop (C10): bounded retry around [`crate::validator::JsonValidator`],
//! plus the bounded streaming buffer a host accumulates generated text into
//! before each validation attempt (spec §4.8).
//!
//! Mirrors the retry-with-budget shape of the teacher's `generate()` loop in
//! `inference/backends/mod.rs` (which tracks a running `nan_count` and aborts
//! past a threshold rather than failing on the first bad sample), but retries
//! whole generation attempts instead of individual steps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::validator::{JsonValidator, ValidationError};

/// Accumulates streamed text up to a byte limit, aborting the attempt rather
/// than growing unbounded when a host forgets to cap `max_new_tokens` (spec
/// §4.8, default 2 MiB from [`EngineConfig::stream_buffer_limit_bytes`]).
pub struct StreamBuffer {
    buf: String,
    limit_bytes: usize,
}

impl StreamBuffer {
    pub fn new(limit_bytes: usize) -> Self {
        Self {
            buf: String::new(),
            limit_bytes,
        }
    }

    pub fn push(&mut self, chunk: &str) -> Result<(), EngineError> {
        if self.buf.len() + chunk.len() > self.limit_bytes {
            return Err(EngineError::StreamBufferExceeded {
                limit_bytes: self.limit_bytes,
            });
        }
        self.buf.push_str(chunk);
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Drives up to `retry_max_tries` generation attempts through a validator,
/// stopping early on success, cancellation, or an exhausted stream buffer.
pub struct RepairLoop<'a> {
    config: &'a EngineConfig,
    cancel: Arc<AtomicBool>,
}

impl<'a> RepairLoop<'a> {
    pub fn new(config: &'a EngineConfig, cancel: Arc<AtomicBool>) -> Self {
        Self { config, cancel }
    }

    /// Run `attempt` (generate one candidate's full text, given the attempt
    /// index) against `validator`, retrying on failure. When `seed` is
    /// `Some`, generation is fully deterministic, so a retry would reproduce
    /// the exact same failure — the loop runs the single attempt only (spec
    /// §4.8 "seed-skips-retry").
    pub fn run<F>(
        &self,
        validator: &JsonValidator<'_>,
        seed: Option<u64>,
        mut attempt: F,
    ) -> Result<Value, EngineError>
    where
        F: FnMut(u32) -> Result<String, EngineError>,
    {
        let max_tries = if seed.is_some() {
            1
        } else {
            self.config.retry_max_tries.max(1)
        };

        let mut last_err: Option<EngineError> = None;

        for try_index in 0..max_tries {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(EngineError::Canceled);
            }

            let text = match attempt(try_index) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(try_index, error = %err, "generation attempt failed");
                    last_err = Some(err);
                    continue;
                }
            };

            match validator.validate(&text) {
                Ok(value) => return Ok(value),
                Err(verr) => {
                    tracing::warn!(try_index, error = %verr, "validation failed, will retry if tries remain");
                    last_err = Some(EngineError::ValidationFailed(verr));
                }
            }
        }

        let err = last_err.unwrap_or_else(|| {
            EngineError::ValidationFailed(ValidationError {
                message: "no generation attempts were made".to_string(),
                path: "$".to_string(),
                violations: Vec::new(),
            })
        });
        tracing::error!(error = %err, max_tries, "repair loop exhausted all attempts");
        Err(err)
    }
}
