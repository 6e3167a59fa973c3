//! LogitProcessor (C8): the per-request stateful object a host's sampling
//! loop drives through `prompt()` / `process()` / `did_sample()`, mirroring
//! the shape of `candle_transformers::generation::LogitsProcessor` that the
//! teacher's `inference/backends/mod.rs::generate()` loop drives (tokenize →
//! prefill → per-step `process` the logits → sample → `did_sample` the
//! chosen token), but constraining rather than just sampling.
//!
//! `process`/`did_sample` never return `Result` — the host's per-step hook
//! contract is fixed — so failures are recorded on `last_error` and
//! inspected between steps, the same way the teacher's `generate()` tracks a
//! running `nan_count` instead of aborting on the first bad value.
//!
//! Single-writer discipline: the host is expected to call `process` and
//! `did_sample` from one thread per in-flight generation, serialized. The
//! internal `Mutex` exists to make `LogitProcessor: Sync` cheaply, not to
//! support concurrent steps on one processor.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cursor::ContextCursor;
use crate::error::{EngineError, Result};
use crate::json_state::{JsonPhase, JsonStateMachine, StringKind};
use crate::mask::{MaskContext, MaskHint, MaskHintGenerator, ValueTypeHint};
use crate::schema::index::SchemaTrieIndex;
use crate::schema::{SchemaModel, SchemaNode};
use crate::tokenizer::special_tokens::{discover, SpecialJsonTokens};
use crate::tokenizer::TokenizerAdapter;
use crate::trie::builder::TokenTrieBuilder;
use crate::trie::TokenTrie;
use crate::config::EngineConfig;

const VIOLATION_RESET_THRESHOLD: u32 = 2;

/// A trie-walking position held across `did_sample` calls without borrowing
/// the trie directly (see [`TokenTrie::path_at`]).
struct KeyEmission {
    trie: Arc<TokenTrie>,
    node: usize,
}

impl KeyEmission {
    fn new(trie: Arc<TokenTrie>) -> Self {
        Self { trie, node: 0 }
    }

    fn path(&self) -> crate::trie::TriePath<'_> {
        self.trie.path_at(self.node)
    }

    fn advance(&mut self, token_id: i32) -> bool {
        match self.path().advance(token_id) {
            Some(next) => {
                self.node = next.node_index();
                true
            }
            None => false,
        }
    }

    fn reset(&mut self) {
        self.node = 0;
    }
}

struct ProcessorState {
    json: JsonStateMachine,
    cursor: ContextCursor,
    active_key_trie: Option<Arc<TokenTrie>>,
    key_emission: Option<KeyEmission>,
    violation_streak: u32,
    last_error: Option<EngineError>,
}

impl ProcessorState {
    fn new(schema: Option<Arc<SchemaModel>>) -> Self {
        Self {
            json: JsonStateMachine::new(),
            cursor: ContextCursor::new(schema),
            active_key_trie: None,
            key_emission: None,
            violation_streak: 0,
            last_error: None,
        }
    }
}

/// Drives the JSON state machine, context cursor, and key trie in lock-step
/// with a host's sampling loop, and turns the resolved position into a
/// [`MaskHint`] applied to each step's logits (spec §4.6).
pub struct LogitProcessor {
    tokenizer: Arc<dyn TokenizerAdapter>,
    schema: Option<Arc<SchemaModel>>,
    trie_index: Option<Arc<SchemaTrieIndex>>,
    mask_gen: MaskHintGenerator,
    config: EngineConfig,
    state: Mutex<ProcessorState>,
}

impl LogitProcessor {
    pub fn new(
        tokenizer: Arc<dyn TokenizerAdapter>,
        schema: Option<SchemaModel>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let special: SpecialJsonTokens = discover(tokenizer.as_ref());
        let schema = schema.map(Arc::new);

        let trie_index = match &schema {
            Some(model) => {
                let builder = TokenTrieBuilder::new();
                Some(Arc::new(SchemaTrieIndex::build(
                    model,
                    tokenizer.as_ref(),
                    &builder,
                )?))
            }
            None => None,
        };

        let state = Mutex::new(ProcessorState::new(schema.clone()));

        Ok(Self {
            tokenizer,
            schema,
            trie_index,
            mask_gen: MaskHintGenerator::new(special),
            config,
            state,
        })
    }

    /// Reset all per-generation state. Call once before the first `process`
    /// of a new request; the processor is otherwise reusable across requests
    /// that share a tokenizer and schema.
    pub fn prompt(&self) {
        let mut state = self.state.lock();
        *state = ProcessorState::new(self.schema.clone());
    }

    /// Apply the current step's [`MaskHint`] to `logits` in place. Snapshots
    /// all state needed for the decision at the top of the call, so nothing
    /// observed by `generate()` outside this crate can change mid-step (spec
    /// §5's "snapshot-at-top-of-process" rule).
    pub fn process(&self, logits: &mut [f32]) {
        let state = self.state.lock();

        let emitting_key = state.key_emission.as_ref().map(KeyEmission::path);
        let key_start = state.active_key_trie.as_ref().map(|t| t.root());
        let can_close_object = self.can_close_object(&state.cursor);
        let value_type_hint = self.value_type_hint(&state.cursor);

        let ctx = MaskContext {
            phase: state.json.phase(),
            emitting_key,
            key_start,
            can_close_object,
            value_type_hint,
            eos: self.tokenizer.eos_token_id(),
        };

        let hint = self
            .mask_gen
            .generate(&ctx, self.config.mode, self.config.micro_bias);
        apply_hint(logits, &hint);
    }

    /// Advance all state by the token the host actually sampled.
    pub fn did_sample(&self, token_id: i32) {
        let mut state = self.state.lock();

        let mid_key_before =
            matches!(state.json.phase(), JsonPhase::InString { kind: StringKind::Key, .. });
        if mid_key_before {
            self.advance_key_emission(&mut state, token_id);
        }

        let decoded = match self.tokenizer.decode_one(token_id) {
            Ok(text) => text,
            Err(err) => {
                state.last_error = Some(err);
                return;
            }
        };

        for ch in decoded.chars() {
            let depth_before = state.json.depth();
            let was_key =
                matches!(state.json.phase(), JsonPhase::InString { kind: StringKind::Key, .. });

            state.json.feed(ch);

            let depth_after = state.json.depth();
            let now_key =
                matches!(state.json.phase(), JsonPhase::InString { kind: StringKind::Key, .. });

            if depth_after > depth_before {
                match state.json.phase() {
                    JsonPhase::InObject(_) => state.cursor.push_object(),
                    JsonPhase::InArray(_) => state.cursor.push_array(),
                    _ => {}
                }
                state.active_key_trie = self.active_key_trie_for(&state.cursor);
            } else if depth_after < depth_before {
                state.cursor.pop();
                state.active_key_trie = self.active_key_trie_for(&state.cursor);
            }

            if !was_key && now_key {
                state.key_emission = state
                    .active_key_trie
                    .as_ref()
                    .map(|t| KeyEmission::new(Arc::clone(t)));
            }
            if was_key && !now_key {
                let key = state.json.current_key().to_string();
                state.cursor.on_key(&key);
                state.key_emission = None;
            }
        }
    }

    /// The most recent error recorded by `process`/`did_sample`, if any.
    pub fn last_error(&self) -> Option<EngineError> {
        self.state.lock().last_error.clone()
    }

    /// A short human-readable snapshot of internal state, for logging.
    pub fn debug_state(&self) -> String {
        let state = self.state.lock();
        format!(
            "phase={:?} depth={} current_key={:?} violation_streak={} last_error={:?}",
            state.json.phase(),
            state.json.depth(),
            state.json.current_key(),
            state.violation_streak,
            state.last_error,
        )
    }

    fn advance_key_emission(&self, state: &mut ProcessorState, token_id: i32) {
        let special_quote = {
            // Hold no long-lived borrow of `self.mask_gen`'s internals; quote
            // membership is derived from the same discovery pass used to
            // build the generator, so re-derive it via the trie's own
            // terminal flag instead of reaching into the generator.
            state
                .key_emission
                .as_ref()
                .map(|e| e.path().is_terminal())
                .unwrap_or(false)
        };

        let Some(emission) = state.key_emission.as_mut() else {
            return;
        };

        if special_quote && self.tokenizer_emits_quote(token_id) {
            state.violation_streak = 0;
            return;
        }

        if emission.advance(token_id) {
            state.violation_streak = 0;
            return;
        }

        let partial_key = state.json.current_key().to_string();
        let expected = emission.path().allowed_next();
        tracing::warn!(token_id, partial_key = %partial_key, "sampled token does not match any trie edge");
        state.last_error = Some(EngineError::InvalidTokenSelected {
            token_id,
            partial_key,
            expected,
        });
        state.violation_streak += 1;
        if state.violation_streak >= VIOLATION_RESET_THRESHOLD {
            tracing::debug!(partial_key = %state.json.current_key(), "resetting key trie to root after repeated violations");
            emission.reset();
            state.violation_streak = 0;
        }
    }

    fn tokenizer_emits_quote(&self, token_id: i32) -> bool {
        self.tokenizer
            .decode_one(token_id)
            .map(|text| text.contains('"'))
            .unwrap_or(false)
    }

    fn active_key_trie_for(&self, cursor: &ContextCursor) -> Option<Arc<TokenTrie>> {
        let index = self.trie_index.as_ref()?;
        let schema_id = cursor.active_object_schema()?;
        index.trie_for(schema_id).cloned()
    }

    fn can_close_object(&self, cursor: &ContextCursor) -> bool {
        match (&self.schema, cursor.active_object_schema()) {
            (Some(model), Some(id)) => model
                .required(id)
                .iter()
                .all(|req| cursor.seen_keys().contains(req)),
            _ => true,
        }
    }

    fn value_type_hint(&self, cursor: &ContextCursor) -> Option<ValueTypeHint> {
        let model = self.schema.as_ref()?;
        let id = cursor.current_schema()?;
        match model.get(id) {
            SchemaNode::Object { .. } => Some(ValueTypeHint::Object),
            SchemaNode::Array { .. } => Some(ValueTypeHint::Array),
            SchemaNode::String { .. } => Some(ValueTypeHint::String),
            _ => None,
        }
    }
}

impl fmt::Display for LogitProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.debug_state())
    }
}

fn apply_hint(logits: &mut [f32], hint: &MaskHint) {
    match hint {
        MaskHint::Unconstrained => {}
        MaskHint::Allow(allowed) => {
            for (id, logit) in logits.iter_mut().enumerate() {
                if !allowed.contains(&(id as i32)) {
                    *logit = f32::NEG_INFINITY;
                }
            }
        }
        MaskHint::Bias { boost, amount } => {
            for &id in boost {
                if let Some(logit) = logits.get_mut(id as usize) {
                    *logit += amount;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DecodeMode, EngineConfig};
    use crate::schema::parse::parse_schema;
    use crate::tokenizer::test_support::ByteTokenizer;
    use serde_json::json;

    fn person_schema() -> SchemaModel {
        parse_schema(&json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "number"}
            },
            "required": ["name"]
        }))
        .unwrap()
    }

    #[test]
    fn hard_mode_masks_everything_but_open_brace_at_start() {
        let tokenizer: Arc<dyn TokenizerAdapter> = Arc::new(ByteTokenizer::new());
        let config = EngineConfig {
            mode: DecodeMode::Hard,
            ..EngineConfig::test_config()
        };
        let processor = LogitProcessor::new(tokenizer, Some(person_schema()), config).unwrap();
        processor.prompt();

        let mut logits = vec![0.0f32; 1100];
        processor.process(&mut logits);
        assert_eq!(logits[1003], 0.0); // '{' stays allowed
        assert!(logits[1004].is_infinite()); // '}' masked out before any key
    }

    #[test]
    fn feeding_the_open_brace_advances_into_object() {
        let tokenizer: Arc<dyn TokenizerAdapter> = Arc::new(ByteTokenizer::new());
        let config = EngineConfig::test_config();
        let processor = LogitProcessor::new(tokenizer, Some(person_schema()), config).unwrap();
        processor.prompt();
        processor.did_sample(1003); // '{'
        assert_eq!(processor.last_error(), None);
        assert!(processor.debug_state().contains("InObject"));
    }

    #[test]
    fn invalid_key_token_is_recorded_and_recovers_after_two_strikes() {
        let tokenizer: Arc<dyn TokenizerAdapter> = Arc::new(ByteTokenizer::new());
        let config = EngineConfig::test_config();
        let processor = LogitProcessor::new(tokenizer, Some(person_schema()), config).unwrap();
        processor.prompt();
        processor.did_sample(1003); // '{'
        processor.did_sample(1000); // '"' opens a key
        // 'z' (122) is not a valid first byte of "name" or "age".
        processor.did_sample('z' as i32);
        assert!(processor.last_error().is_some());
        processor.did_sample('z' as i32);
        assert!(processor.last_error().is_some());
        // Third strike should have reset back to root, recovering on a
        // legitimate continuation.
        processor.did_sample('n' as i32);
        assert!(matches!(
            processor.last_error(),
            Some(EngineError::InvalidTokenSelected { .. })
        ));
    }

    #[test]
    fn schema_less_processor_never_masks() {
        let tokenizer: Arc<dyn TokenizerAdapter> = Arc::new(ByteTokenizer::new());
        let config = EngineConfig {
            mode: DecodeMode::Hard,
            ..EngineConfig::test_config()
        };
        let processor = LogitProcessor::new(tokenizer, None, config).unwrap();
        processor.prompt();
        let mut logits = vec![1.0f32; 16];
        processor.process(&mut logits);
        assert!(logits.iter().all(|&l| l == 1.0));
    }
}
