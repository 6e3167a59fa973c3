//! ContextCursor (C6): tracks the stack of open object/array frames in
//! lock-step with [`crate::json_state::JsonStateMachine`], resolving the
//! schema node that applies to the current position from the parent frame
//! and the most recently completed key (spec §4.4).
//!
//! A cursor never errors. A key absent from the active object's schema, or a
//! schema-less document, degrades to "no constraint" (`None`) rather than a
//! failure — the mask generator is the one place that decides what to do
//! with an unconstrained position.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::schema::{SchemaModel, SchemaNodeId};

#[derive(Debug, Clone)]
enum Frame {
    Object {
        schema: Option<SchemaNodeId>,
        seen_keys: BTreeSet<String>,
        pending_key: Option<String>,
    },
    Array {
        item_schema: Option<SchemaNodeId>,
    },
}

/// Resolves "what schema node applies here" as the document is parsed. Holds
/// an `Arc<SchemaModel>` rather than a borrow so it can live inside a
/// `Mutex`-guarded processor state without a self-referential lifetime.
pub struct ContextCursor {
    model: Option<Arc<SchemaModel>>,
    stack: Vec<Frame>,
}

impl ContextCursor {
    pub fn new(model: Option<Arc<SchemaModel>>) -> Self {
        Self {
            model,
            stack: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The schema node that applies to the value about to start here, or
    /// `None` if there is no schema, the position is unconstrained, or a key
    /// has not yet been resolved against the active object's properties.
    pub fn current_schema(&self) -> Option<SchemaNodeId> {
        match self.stack.last() {
            None => self.model.as_deref().map(SchemaModel::root),
            Some(Frame::Array { item_schema }) => *item_schema,
            Some(Frame::Object {
                schema,
                pending_key,
                ..
            }) => {
                let model = self.model.as_deref()?;
                let schema = (*schema)?;
                let key = pending_key.as_deref()?;
                model.property_schema(schema, key)
            }
        }
    }

    /// The schema node of the currently open object, for key-set lookups.
    /// `None` if the top frame is not an object, or the object is
    /// unconstrained.
    pub fn active_object_schema(&self) -> Option<SchemaNodeId> {
        match self.stack.last() {
            Some(Frame::Object { schema, .. }) => *schema,
            _ => None,
        }
    }

    /// Keys already emitted in the currently open object.
    pub fn seen_keys(&self) -> &BTreeSet<String> {
        static EMPTY: BTreeSet<String> = BTreeSet::new();
        match self.stack.last() {
            Some(Frame::Object { seen_keys, .. }) => seen_keys,
            _ => &EMPTY,
        }
    }

    /// Call when a key string finishes (the closing `"` of an object key).
    pub fn on_key(&mut self, key: &str) {
        if let Some(Frame::Object {
            seen_keys,
            pending_key,
            ..
        }) = self.stack.last_mut()
        {
            seen_keys.insert(key.to_string());
            *pending_key = Some(key.to_string());
        }
    }

    /// Call when a `{` opens a new object as the current value.
    pub fn push_object(&mut self) {
        let schema = self.current_schema();
        self.stack.push(Frame::Object {
            schema,
            seen_keys: BTreeSet::new(),
            pending_key: None,
        });
    }

    /// Call when a `[` opens a new array as the current value.
    pub fn push_array(&mut self) {
        let schema = self.current_schema();
        let item_schema = match (self.model.as_deref(), schema) {
            (Some(model), Some(id)) => model.item_schema(id),
            _ => None,
        };
        self.stack.push(Frame::Array { item_schema });
    }

    /// Call when a `}` or `]` closes the innermost open container.
    pub fn pop(&mut self) {
        self.stack.pop();
    }
}
