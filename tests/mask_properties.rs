//! Property tests over `LogitProcessor`'s masking behavior: in Hard mode the
//! processor never leaves a forbidden token's logit finite, and in Soft mode
//! it never excludes a token outright (spec §8 universal invariants on
//! Hard vs Soft masking).

use std::sync::Arc;

use proptest::prelude::*;
use schema_steer::config::{DecodeMode, EngineConfig};
use schema_steer::processor::LogitProcessor;
use schema_steer::schema::parse::parse_schema;
use schema_steer::TokenizerAdapter;
use serde_json::json;

struct AsciiTokenizer;

impl TokenizerAdapter for AsciiTokenizer {
    fn encode(&self, text: &str) -> schema_steer::Result<Vec<i32>> {
        Ok(text.bytes().map(|b| b as i32).collect())
    }

    fn decode(&self, token_ids: &[i32]) -> schema_steer::Result<String> {
        Ok(token_ids.iter().map(|&id| id as u8 as char).collect())
    }

    fn decode_one(&self, token_id: i32) -> schema_steer::Result<String> {
        Ok((token_id as u8 as char).to_string())
    }

    fn fingerprint(&self) -> String {
        "ascii-tokenizer-test".to_string()
    }
}

fn person_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "age": {"type": "number"}
        },
        "required": ["name"]
    })
}

fn processor(mode: DecodeMode) -> LogitProcessor {
    let schema = parse_schema(&person_schema()).unwrap();
    let config = EngineConfig {
        mode,
        ..EngineConfig::default()
    };
    LogitProcessor::new(Arc::new(AsciiTokenizer), Some(schema), config).unwrap()
}

proptest! {
    #[test]
    fn hard_mode_never_leaves_a_finite_logit_outside_the_allow_set(
        filler in prop::collection::vec(any::<f32>().prop_filter("finite", |f| f.is_finite()), 256)
    ) {
        let proc = processor(DecodeMode::Hard);
        proc.prompt();
        let mut logits = filler;
        proc.process(&mut logits);

        // '{' (0x7b = 123) is the only legal opening byte at the very start
        // of a schema-rooted object document.
        let open_brace = b'{' as usize;
        for (id, logit) in logits.iter().enumerate() {
            if id != open_brace {
                prop_assert!(logit.is_infinite() && *logit < 0.0);
            }
        }
        prop_assert!(logits[open_brace].is_finite());
    }

    #[test]
    fn soft_mode_never_masks_anything_out(
        filler in prop::collection::vec(any::<f32>().prop_filter("finite", |f| f.is_finite()), 256)
    ) {
        let proc = processor(DecodeMode::Soft);
        proc.prompt();
        let mut logits = filler.clone();
        proc.process(&mut logits);

        for (before, after) in filler.iter().zip(logits.iter()) {
            prop_assert!(after.is_finite());
            prop_assert!((after - before).abs() < 1000.0);
        }
    }
}
