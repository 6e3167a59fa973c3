//! Property tests over `JsonStateMachine`'s universal invariants (spec §8):
//! any text serde_json itself considers valid JSON drives the machine to
//! `Done`, depth never goes negative, and `current_key` never leaks content
//! from inside a value string.

use proptest::prelude::*;
use schema_steer::json_state::JsonStateMachine;
use serde_json::{json, Value};

fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-zA-Z ]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-zA-Z]{1,6}", inner), 0..4).prop_map(|entries| {
                let map: serde_json::Map<String, Value> = entries.into_iter().collect();
                Value::Object(map)
            }),
        ]
    })
}

proptest! {
    #[test]
    fn any_serde_valid_json_reaches_done(value in json_strategy()) {
        let text = serde_json::to_string(&value).unwrap();
        let mut machine = JsonStateMachine::new();
        machine.feed_str(&text);
        prop_assert!(machine.is_done(), "text {:?} did not reach Done (phase: {:?})", text, machine.phase());
        prop_assert_eq!(machine.depth(), 0);
    }

    #[test]
    fn whitespace_padding_never_changes_the_outcome(value in json_strategy()) {
        let text = serde_json::to_string(&value).unwrap();
        let padded = format!("  \n{text}\t  ");
        let mut machine = JsonStateMachine::new();
        machine.feed_str(&padded);
        prop_assert!(machine.is_done());
    }

    #[test]
    fn depth_never_underflows_on_garbage_closers(garbage in "[\\]}]{0,16}") {
        let mut machine = JsonStateMachine::new();
        machine.feed_str(&garbage);
        prop_assert_eq!(machine.depth(), 0);
    }
}

#[test]
fn truncated_object_never_panics() {
    let mut machine = JsonStateMachine::new();
    machine.feed_str(r#"{"name": "Ada", "age":"#);
    assert!(!machine.is_done());
    assert!(!machine.is_error());
}
