//! A [`TokenizerAdapter`] backed by the `tokenizers` crate — the same crate
//! the teacher repo's inference stack and `dobby-subagent-code-summarizer`'s
//! tokenizer wrappers both load `tokenizer.json` files through. Purely a
//! usable default: the engine core never depends on this module, only on the
//! [`TokenizerAdapter`] trait.

use std::path::Path;

use tokenizers::Tokenizer;

use crate::error::{EngineError, Result};
use super::TokenizerAdapter;

pub struct HfTokenizerAdapter {
    inner: Tokenizer,
    fingerprint: String,
}

impl HfTokenizerAdapter {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = Tokenizer::from_file(path).map_err(|e| EngineError::BackendFailure(
            format!("failed to load tokenizer from {}: {e}", path.display()),
        ))?;
        let fingerprint = format!("{}:{}", path.display(), inner.get_vocab_size(true));
        Ok(Self { inner, fingerprint })
    }
}

impl TokenizerAdapter for HfTokenizerAdapter {
    fn encode(&self, text: &str) -> Result<Vec<i32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| EngineError::BackendFailure(format!("encode failed: {e}")))?;
        Ok(encoding.get_ids().iter().map(|&id| id as i32).collect())
    }

    fn decode(&self, token_ids: &[i32]) -> Result<String> {
        let ids: Vec<u32> = token_ids.iter().map(|&id| id as u32).collect();
        self.inner
            .decode(&ids, true)
            .map_err(|e| EngineError::BackendFailure(format!("decode failed: {e}")))
    }

    fn decode_one(&self, token_id: i32) -> Result<String> {
        self.decode(&[token_id])
    }

    fn vocab_size(&self) -> Option<usize> {
        Some(self.inner.get_vocab_size(true))
    }

    fn fingerprint(&self) -> String {
        self.fingerprint.clone()
    }
}
