//! TokenizerAdapter (C1): the boundary between the engine and whatever
//! tokenizer the host runtime's model actually uses. The engine's core
//! (C2–C10) depends only on the [`TokenizerAdapter`] trait; a concrete
//! `tokenizers`-crate-backed implementation lives behind the `hf-tokenizer`
//! feature in [`hf`].

pub mod special_tokens;

#[cfg(feature = "hf-tokenizer")]
pub mod hf;

use crate::error::Result;
pub use special_tokens::SpecialJsonTokens;

/// Encode/decode text to/from token IDs, and discover JSON punctuation
/// tokens, for one tokenizer instance (spec §4.1).
pub trait TokenizerAdapter: Send + Sync {
    /// Encode `text` to token IDs. No special tokens are added.
    fn encode(&self, text: &str) -> Result<Vec<i32>>;

    /// Decode a sequence of token IDs back to text.
    fn decode(&self, token_ids: &[i32]) -> Result<String>;

    /// Decode a single token ID. May return an empty string for byte-piece
    /// continuations that only make sense concatenated with neighbors.
    fn decode_one(&self, token_id: i32) -> Result<String>;

    /// Vocabulary size, if knowable ahead of a forward pass. When `None`,
    /// callers use the last dimension of the logits array at each step.
    fn vocab_size(&self) -> Option<usize> {
        None
    }

    /// End-of-sequence token ID, if the tokenizer exposes one directly.
    fn eos_token_id(&self) -> Option<i32> {
        None
    }

    /// A stable fingerprint identifying this tokenizer instance, used as half
    /// of the `TokenTrieBuilder` cache key (spec §4.2).
    fn fingerprint(&self) -> String;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;

    /// A tiny in-memory tokenizer for unit tests: one token per ASCII byte,
    /// plus a handful of named multi-char tokens for punctuation, so trie and
    /// mask tests can exercise fused-symbol behavior without pulling in a
    /// real vocabulary file.
    pub struct ByteTokenizer {
        pub extra: HashMap<&'static str, i32>,
    }

    impl ByteTokenizer {
        pub fn new() -> Self {
            let mut extra = HashMap::new();
            extra.insert("\"", 1000);
            extra.insert(":", 1001);
            extra.insert(",", 1002);
            extra.insert("{", 1003);
            extra.insert("}", 1004);
            extra.insert("[", 1005);
            extra.insert("]", 1006);
            extra.insert(" ", 1007);
            Self { extra }
        }
    }

    impl TokenizerAdapter for ByteTokenizer {
        fn encode(&self, text: &str) -> Result<Vec<i32>> {
            if let Some(&id) = self.extra.get(text) {
                return Ok(vec![id]);
            }
            Ok(text.bytes().map(|b| b as i32).collect())
        }

        fn decode(&self, token_ids: &[i32]) -> Result<String> {
            let mut out = String::new();
            for &id in token_ids {
                out.push_str(&self.decode_one(id)?);
            }
            Ok(out)
        }

        fn decode_one(&self, token_id: i32) -> Result<String> {
            for (sym, &id) in &self.extra {
                if id == token_id {
                    return Ok((*sym).to_string());
                }
            }
            Ok(char::from_u32(token_id as u32).map(String::from).unwrap_or_default())
        }

        fn fingerprint(&self) -> String {
            "byte-tokenizer-test".to_string()
        }
    }
}
