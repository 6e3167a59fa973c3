//! Per-request configuration for the decoding engine (spec §6).

use crate::error::{EngineError, Result};

/// Controls whether key-masking is hard, soft, both off, or only post-hoc
/// validation + repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// No masking, no post-hoc repair. The raw model output is returned as-is.
    Off,
    /// Soft preference bias only — never hard-excludes a token.
    Soft,
    /// Hard masking during generation, plus post-hoc validation/repair.
    Hard,
    /// No masking during generation; only post-hoc validation/repair runs.
    Post,
}

impl Default for DecodeMode {
    fn default() -> Self {
        DecodeMode::Hard
    }
}

/// Per-request engine configuration (spec §6 "Per-request configuration").
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub mode: DecodeMode,
    pub retry_max_tries: u32,
    pub allow_extra_keys: bool,
    pub enable_key_snap: bool,
    pub micro_bias: f32,
    pub stream_buffer_limit_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: DecodeMode::Hard,
            retry_max_tries: 2,
            allow_extra_keys: false,
            enable_key_snap: true,
            micro_bias: 0.2,
            stream_buffer_limit_bytes: 2 * 1024 * 1024,
        }
    }
}

impl EngineConfig {
    /// Validate range invariants. Not called automatically — callers building
    /// configuration from untrusted input (CLI flags, RPC params) should call
    /// this once before constructing a processor.
    pub fn validate(&self) -> Result<()> {
        if self.retry_max_tries > 10 {
            return Err(EngineError::SchemaViolation {
                reason: format!(
                    "retry_max_tries {} exceeds sane bound (must be 0-10)",
                    self.retry_max_tries
                ),
            });
        }
        if self.micro_bias < 0.0 {
            return Err(EngineError::SchemaViolation {
                reason: format!("micro_bias {} must be non-negative", self.micro_bias),
            });
        }
        if self.stream_buffer_limit_bytes == 0 {
            return Err(EngineError::SchemaViolation {
                reason: "stream_buffer_limit_bytes must be > 0".into(),
            });
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            retry_max_tries: 1,
            stream_buffer_limit_bytes: 64 * 1024,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_bias_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.micro_bias = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_buffer_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.stream_buffer_limit_bytes = 0;
        assert!(cfg.validate().is_err());
    }
}
