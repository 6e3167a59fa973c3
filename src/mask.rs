//! MaskHintGenerator (C7): turns the currently resolved parse position into a
//! [`MaskHint`] describing how the next token's logits should be constrained.
//!
//! The generator itself never touches a [`crate::schema::SchemaModel`] or a
//! [`crate::schema::index::SchemaTrieIndex`] — the caller ([`crate::processor`])
//! resolves those once per step into a [`MaskContext`], and this module is
//! left as a small, independently testable pure function over that context.
//! Rules are applied in order; the first one that produces a non-empty
//! allow-set wins.

use std::collections::BTreeSet;

use crate::config::DecodeMode;
use crate::json_state::JsonPhase;
use crate::tokenizer::special_tokens::SpecialJsonTokens;
use crate::trie::TriePath;

/// What kind of value is expected at the current `ExpectValue` position, as
/// resolved by the caller from the active schema node. Only the shapes that
/// map onto a single discoverable opening token are modeled here; numbers,
/// booleans, null and schema-less positions all fall through to
/// [`MaskHint::Unconstrained`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTypeHint {
    Object,
    Array,
    String,
}

/// Everything [`MaskHintGenerator::generate`] needs about the current
/// position, resolved by the caller.
pub struct MaskContext<'a> {
    pub phase: &'a JsonPhase,
    /// `Some` while a key string is being emitted token-by-token.
    pub emitting_key: Option<TriePath<'a>>,
    /// Root of the key trie for the currently open object, if the object's
    /// property set is schema-constrained.
    pub key_start: Option<TriePath<'a>>,
    /// Whether every required key of the currently open object has already
    /// been emitted, so `}` is a legal next character.
    pub can_close_object: bool,
    pub value_type_hint: Option<ValueTypeHint>,
    pub eos: Option<i32>,
}

/// The decision produced for one decode step.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskHint {
    /// Hard-constrain: only these token ids may be sampled.
    Allow(BTreeSet<i32>),
    /// Soft-bias: add `amount` to the logits of every id in `boost`.
    Bias { boost: BTreeSet<i32>, amount: f32 },
    /// No constraint applies at this position.
    Unconstrained,
}

pub struct MaskHintGenerator {
    special: SpecialJsonTokens,
}

impl MaskHintGenerator {
    pub fn new(special: SpecialJsonTokens) -> Self {
        Self { special }
    }

    /// Apply the ordered rules and produce a hint for this step.
    ///
    /// 1. `mode == Off` never constrains.
    /// 2. A finished document only allows EOS.
    /// 3. An errored parse never constrains — the repair loop owns recovery.
    /// 4. Mid key-emission, only the trie's next edges (plus the closing
    ///    quote at a terminal node) are allowed; EOS is never offered here,
    ///    since stopping mid-key can never produce valid JSON.
    /// 5. At a key boundary (`ExpectKeyOrEnd`/`ExpectKeyFirstQuote`), offer
    ///    the opening quote of a new key, `}` if the object may legally
    ///    close, and EOS (outside key emission, stopping here is at least
    ///    syntactically recoverable by the repair loop).
    /// 6. At `ExpectColon`, only `:` (plus whitespace) is legal.
    /// 7. At `ExpectCommaOrEnd`, only `,`, the matching close token, and
    ///    whitespace are legal, plus EOS — `}` is further gated on the
    ///    object's required keys already being satisfied, the same
    ///    `can_close_object` check used at the key boundary; `]` has no such
    ///    gate since arrays carry no `required` concept.
    /// 8. At `ExpectValue`, offer the single opening token implied by
    ///    `value_type_hint`, if any.
    /// 9. Otherwise: unconstrained.
    pub fn generate(&self, ctx: &MaskContext<'_>, mode: DecodeMode, micro_bias: f32) -> MaskHint {
        if mode == DecodeMode::Off {
            return MaskHint::Unconstrained;
        }

        if matches!(ctx.phase, JsonPhase::Done) {
            return match ctx.eos {
                Some(id) => self.finish(BTreeSet::from([id]), mode, micro_bias),
                None => MaskHint::Unconstrained,
            };
        }

        if matches!(ctx.phase, JsonPhase::Error) {
            return MaskHint::Unconstrained;
        }

        if let Some(path) = &ctx.emitting_key {
            let mut allowed: BTreeSet<i32> = path.allowed_next().into_iter().collect();
            if path.is_terminal() {
                allowed.extend(&self.special.quote);
            }
            if allowed.is_empty() {
                return MaskHint::Unconstrained;
            }
            return self.finish(allowed, mode, micro_bias);
        }

        if matches!(
            ctx.phase,
            JsonPhase::InObject(
                crate::json_state::ObjectPhase::ExpectKeyOrEnd
                    | crate::json_state::ObjectPhase::ExpectKeyFirstQuote
            )
        ) {
            let mut allowed = BTreeSet::new();
            if let Some(start) = &ctx.key_start {
                if !start.allowed_next().is_empty() {
                    allowed.extend(&self.special.quote);
                }
            }
            if ctx.can_close_object {
                allowed.extend(&self.special.close_brace);
            }
            if let Some(id) = ctx.eos {
                allowed.insert(id);
            }
            if allowed.is_empty() {
                return MaskHint::Unconstrained;
            }
            return self.finish(allowed, mode, micro_bias);
        }

        if matches!(
            ctx.phase,
            JsonPhase::InObject(crate::json_state::ObjectPhase::ExpectColon)
        ) {
            let mut allowed: BTreeSet<i32> = self.special.colon.iter().copied().collect();
            allowed.extend(&self.special.whitespace);
            if allowed.is_empty() {
                return MaskHint::Unconstrained;
            }
            return self.finish(allowed, mode, micro_bias);
        }

        if matches!(
            ctx.phase,
            JsonPhase::InObject(crate::json_state::ObjectPhase::ExpectCommaOrEnd)
        ) {
            let mut allowed: BTreeSet<i32> = self.special.comma.iter().copied().collect();
            allowed.extend(&self.special.whitespace);
            if ctx.can_close_object {
                allowed.extend(&self.special.close_brace);
            }
            if let Some(id) = ctx.eos {
                allowed.insert(id);
            }
            if allowed.is_empty() {
                return MaskHint::Unconstrained;
            }
            return self.finish(allowed, mode, micro_bias);
        }

        if matches!(
            ctx.phase,
            JsonPhase::InArray(crate::json_state::ArrayPhase::ExpectCommaOrEnd)
        ) {
            let mut allowed: BTreeSet<i32> = self.special.comma.iter().copied().collect();
            allowed.extend(&self.special.whitespace);
            allowed.extend(&self.special.close_bracket);
            if let Some(id) = ctx.eos {
                allowed.insert(id);
            }
            if allowed.is_empty() {
                return MaskHint::Unconstrained;
            }
            return self.finish(allowed, mode, micro_bias);
        }

        if matches!(
            ctx.phase,
            JsonPhase::Root
                | JsonPhase::InObject(crate::json_state::ObjectPhase::ExpectValue)
                | JsonPhase::InArray(crate::json_state::ArrayPhase::ExpectValue)
        ) {
            if let Some(hint) = ctx.value_type_hint {
                let allowed = match hint {
                    ValueTypeHint::Object => self.special.open_brace.clone(),
                    ValueTypeHint::Array => self.special.open_bracket.clone(),
                    ValueTypeHint::String => self.special.quote.clone(),
                };
                if !allowed.is_empty() {
                    return self.finish(allowed, mode, micro_bias);
                }
            }
            return MaskHint::Unconstrained;
        }

        MaskHint::Unconstrained
    }

    fn finish(&self, allowed: BTreeSet<i32>, mode: DecodeMode, micro_bias: f32) -> MaskHint {
        match mode {
            DecodeMode::Hard => MaskHint::Allow(allowed),
            DecodeMode::Soft | DecodeMode::Post => MaskHint::Bias {
                boost: allowed,
                amount: micro_bias,
            },
            DecodeMode::Off => MaskHint::Unconstrained,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_state::ObjectPhase;
    use crate::trie::TokenTrie;

    fn special() -> SpecialJsonTokens {
        let mut s = SpecialJsonTokens::default();
        s.quote.insert(1);
        s.close_brace.insert(2);
        s.open_brace.insert(3);
        s.open_bracket.insert(4);
        s.colon.insert(5);
        s.comma.insert(6);
        s.close_bracket.insert(7);
        s
    }

    #[test]
    fn off_mode_never_constrains() {
        let gen = MaskHintGenerator::new(special());
        let phase = JsonPhase::InObject(ObjectPhase::ExpectKeyOrEnd);
        let ctx = MaskContext {
            phase: &phase,
            emitting_key: None,
            key_start: None,
            can_close_object: true,
            value_type_hint: None,
            eos: Some(99),
        };
        assert_eq!(gen.generate(&ctx, DecodeMode::Off, 0.2), MaskHint::Unconstrained);
    }

    #[test]
    fn done_allows_only_eos() {
        let gen = MaskHintGenerator::new(special());
        let phase = JsonPhase::Done;
        let ctx = MaskContext {
            phase: &phase,
            emitting_key: None,
            key_start: None,
            can_close_object: false,
            value_type_hint: None,
            eos: Some(99),
        };
        match gen.generate(&ctx, DecodeMode::Hard, 0.2) {
            MaskHint::Allow(set) => assert_eq!(set, BTreeSet::from([99])),
            other => panic!("expected Allow, got {other:?}"),
        }
    }

    #[test]
    fn mid_key_emission_never_offers_eos() {
        let gen = MaskHintGenerator::new(special());
        let mut trie = TokenTrie::empty();
        trie.insert(&[10, 20], "name");
        let path = trie.root().advance(10).unwrap();
        let phase = JsonPhase::InString {
            kind: crate::json_state::StringKind::Key,
            escaped: false,
        };
        let ctx = MaskContext {
            phase: &phase,
            emitting_key: Some(path),
            key_start: None,
            can_close_object: false,
            value_type_hint: None,
            eos: Some(99),
        };
        match gen.generate(&ctx, DecodeMode::Hard, 0.2) {
            MaskHint::Allow(set) => {
                assert!(!set.contains(&99));
                assert!(set.contains(&20));
            }
            other => panic!("expected Allow, got {other:?}"),
        }
    }

    #[test]
    fn soft_mode_biases_instead_of_restricting() {
        let gen = MaskHintGenerator::new(special());
        let phase = JsonPhase::Done;
        let ctx = MaskContext {
            phase: &phase,
            emitting_key: None,
            key_start: None,
            can_close_object: false,
            value_type_hint: None,
            eos: Some(99),
        };
        match gen.generate(&ctx, DecodeMode::Soft, 0.3) {
            MaskHint::Bias { boost, amount } => {
                assert_eq!(boost, BTreeSet::from([99]));
                assert_eq!(amount, 0.3);
            }
            other => panic!("expected Bias, got {other:?}"),
        }
    }

    #[test]
    fn expect_colon_allows_only_colon() {
        let gen = MaskHintGenerator::new(special());
        let phase = JsonPhase::InObject(ObjectPhase::ExpectColon);
        let ctx = MaskContext {
            phase: &phase,
            emitting_key: None,
            key_start: None,
            can_close_object: false,
            value_type_hint: None,
            eos: Some(99),
        };
        match gen.generate(&ctx, DecodeMode::Hard, 0.2) {
            MaskHint::Allow(set) => {
                assert_eq!(set, BTreeSet::from([5]));
                assert!(!set.contains(&99));
            }
            other => panic!("expected Allow, got {other:?}"),
        }
    }

    #[test]
    fn expect_comma_or_end_gates_close_brace_on_required_keys() {
        let gen = MaskHintGenerator::new(special());
        let phase = JsonPhase::InObject(ObjectPhase::ExpectCommaOrEnd);
        let not_closable = MaskContext {
            phase: &phase,
            emitting_key: None,
            key_start: None,
            can_close_object: false,
            value_type_hint: None,
            eos: Some(99),
        };
        match gen.generate(&not_closable, DecodeMode::Hard, 0.2) {
            MaskHint::Allow(set) => {
                assert!(set.contains(&6));
                assert!(set.contains(&99));
                assert!(!set.contains(&2));
            }
            other => panic!("expected Allow, got {other:?}"),
        }

        let closable = MaskContext {
            phase: &phase,
            emitting_key: None,
            key_start: None,
            can_close_object: true,
            value_type_hint: None,
            eos: Some(99),
        };
        match gen.generate(&closable, DecodeMode::Hard, 0.2) {
            MaskHint::Allow(set) => assert!(set.contains(&2)),
            other => panic!("expected Allow, got {other:?}"),
        }
    }

    #[test]
    fn expect_comma_or_end_in_array_always_allows_close_bracket() {
        let gen = MaskHintGenerator::new(special());
        let phase = JsonPhase::InArray(crate::json_state::ArrayPhase::ExpectCommaOrEnd);
        let ctx = MaskContext {
            phase: &phase,
            emitting_key: None,
            key_start: None,
            can_close_object: false,
            value_type_hint: None,
            eos: Some(99),
        };
        match gen.generate(&ctx, DecodeMode::Hard, 0.2) {
            MaskHint::Allow(set) => {
                assert!(set.contains(&7));
                assert!(set.contains(&6));
                assert!(set.contains(&99));
            }
            other => panic!("expected Allow, got {other:?}"),
        }
    }

    #[test]
    fn value_position_offers_opening_token_for_object_type() {
        let gen = MaskHintGenerator::new(special());
        let phase = JsonPhase::InObject(ObjectPhase::ExpectValue);
        let ctx = MaskContext {
            phase: &phase,
            emitting_key: None,
            key_start: None,
            can_close_object: false,
            value_type_hint: Some(ValueTypeHint::Object),
            eos: None,
        };
        match gen.generate(&ctx, DecodeMode::Hard, 0.2) {
            MaskHint::Allow(set) => assert_eq!(set, BTreeSet::from([3])),
            other => panic!("expected Allow, got {other:?}"),
        }
    }
}
