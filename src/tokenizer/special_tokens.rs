//! Special JSON-punctuation token discovery (spec §4.1).
//!
//! Byte-pair tokenizers often fuse a symbol with an adjacent space (`" {"` or
//! `"{ "` encoding to a single piece), so a naive `encode(symbol)` misses
//! those fused variants. This mirrors the single-token-lookup idea in
//! `pixelspark-poly`'s `JSONVocabulary::from` (encode a candidate string,
//! accept it only if it round-trips to exactly the target symbol) but widens
//! it to every plausible spacing variant and caches the result per tokenizer.

use std::collections::{BTreeSet, HashMap};

use super::TokenizerAdapter;

const PUNCTUATION: &[&str] = &["\"", ":", ",", "{", "}", "[", "]", "\\"];

/// The token IDs whose decoded form equals exactly one of the JSON
/// punctuation symbols, plus a bucket of tokens that decode to pure
/// whitespace (spec §4.1).
#[derive(Debug, Clone, Default)]
pub struct SpecialJsonTokens {
    pub quote: BTreeSet<i32>,
    pub colon: BTreeSet<i32>,
    pub comma: BTreeSet<i32>,
    pub open_brace: BTreeSet<i32>,
    pub close_brace: BTreeSet<i32>,
    pub open_bracket: BTreeSet<i32>,
    pub close_bracket: BTreeSet<i32>,
    pub backslash: BTreeSet<i32>,
    pub whitespace: BTreeSet<i32>,
}

impl SpecialJsonTokens {
    pub fn all_ids(&self) -> BTreeSet<i32> {
        self.quote
            .iter()
            .chain(&self.colon)
            .chain(&self.comma)
            .chain(&self.open_brace)
            .chain(&self.close_brace)
            .chain(&self.open_bracket)
            .chain(&self.close_bracket)
            .chain(&self.backslash)
            .chain(&self.whitespace)
            .copied()
            .collect()
    }

    fn bucket_for(&mut self, symbol: &str) -> &mut BTreeSet<i32> {
        match symbol {
            "\"" => &mut self.quote,
            ":" => &mut self.colon,
            "," => &mut self.comma,
            "{" => &mut self.open_brace,
            "}" => &mut self.close_brace,
            "[" => &mut self.open_bracket,
            "]" => &mut self.close_bracket,
            "\\" => &mut self.backslash,
            _ => unreachable!("unhandled JSON punctuation symbol {symbol:?}"),
        }
    }
}

/// Run the discovery algorithm against `tokenizer` (spec §4.1). Cheap to call
/// once per tokenizer instance and cache the result — see
/// [`crate::cache::SharedCache`].
pub fn discover(tokenizer: &dyn TokenizerAdapter) -> SpecialJsonTokens {
    let mut result = SpecialJsonTokens::default();
    let mut seen_ids: HashMap<i32, String> = HashMap::new();

    for &symbol in PUNCTUATION {
        for candidate in variants_of(symbol) {
            let Ok(ids) = tokenizer.encode(&candidate) else {
                continue;
            };
            for id in ids {
                if seen_ids.contains_key(&id) {
                    continue;
                }
                let Ok(decoded) = tokenizer.decode_one(id) else {
                    continue;
                };
                seen_ids.insert(id, decoded);
            }
        }
        for (&id, decoded) in &seen_ids {
            if decoded.contains(symbol) && decoded.len() <= 3 {
                result.bucket_for(symbol).insert(id);
            }
        }
    }

    for candidate in [" ", "  ", "\t", "\n", " \n"] {
        if let Ok(ids) = tokenizer.encode(candidate) {
            for id in ids {
                if let Ok(decoded) = tokenizer.decode_one(id) {
                    if !decoded.is_empty() && decoded.chars().all(char::is_whitespace) {
                        result.whitespace.insert(id);
                    }
                }
            }
        }
    }

    result
}

fn variants_of(symbol: &str) -> Vec<String> {
    vec![
        symbol.to_string(),
        format!(" {symbol}"),
        format!("{symbol} "),
        format!("  {symbol}"),
    ]
}
