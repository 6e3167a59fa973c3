//! TokenTrieBuilder (spec §4.2): builds a [`TokenTrie`] from a key set and a
//! tokenizer, with an LRU-bounded cache keyed by
//! `(tokenizer fingerprint, sorted-keys-joined)`.

use std::collections::BTreeSet;

use crate::cache::BoundedCache;
use crate::error::Result;
use crate::tokenizer::TokenizerAdapter;

use super::TokenTrie;

const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Pure trie-building logic, independent of caching.
pub fn build(keys: &[String], tokenizer: &dyn TokenizerAdapter) -> Result<TokenTrie> {
    let mut trie = TokenTrie::empty();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for key in keys {
        if key.is_empty() || !seen.insert(key.as_str()) {
            continue;
        }
        let tokens = tokenizer.encode(key)?;
        if tokens.is_empty() {
            continue;
        }
        trie.insert(&tokens, key);
    }
    Ok(trie)
}

fn cache_key(tokenizer: &dyn TokenizerAdapter, keys: &[String]) -> String {
    let mut sorted: Vec<&str> = keys.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();
    format!("{}::{}", tokenizer.fingerprint(), sorted.join("\u{1f}"))
}

/// Builds [`TokenTrie`]s, memoizing results in a bounded LRU cache so the
/// same (tokenizer, key set) pair is only ever encoded once (spec §4.2, §9
/// "process-wide caches").
pub struct TokenTrieBuilder {
    cache: BoundedCache<String, TokenTrie>,
}

impl TokenTrieBuilder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: BoundedCache::new(capacity),
        }
    }

    pub fn build(
        &self,
        keys: &[String],
        tokenizer: &dyn TokenizerAdapter,
    ) -> Result<std::sync::Arc<TokenTrie>> {
        let key = cache_key(tokenizer, keys);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        let trie = build(keys, tokenizer)?;
        Ok(self.cache.get_or_insert_with(key, || trie))
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl Default for TokenTrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}
