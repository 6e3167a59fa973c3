//! SchemaModel (C3): an arena of immutable schema nodes.
//!
//! The reference design in spec §3 describes `SchemaNode` as an
//! identity-addressed tree ("the engine may use pointer identity for caching
//! but MUST NOT rely on it for correctness"). This crate follows the
//! redesign note in spec §9 directly: nodes live in a flat arena on
//! `SchemaModel` and are addressed by a small `SchemaNodeId` newtype, so
//! `SchemaTrieIndex` (§4.4) can key off a plain integer instead of a live
//! object pointer.

pub mod index;
pub mod parse;

use std::collections::BTreeSet;

/// Index into [`SchemaModel`]'s node arena. Stable for the lifetime of the
/// model; never reused across distinct `SchemaModel` instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaNodeId(pub u32);

/// One node of the schema tree (spec §3 `SchemaNode`).
#[derive(Debug, Clone)]
pub enum SchemaNode {
    Object {
        properties: Vec<(String, SchemaNodeId)>,
        required: BTreeSet<String>,
        nullable: bool,
    },
    Array {
        items: Option<SchemaNodeId>,
        nullable: bool,
    },
    String {
        enum_values: Option<Vec<String>>,
        nullable: bool,
    },
    Number {
        nullable: bool,
    },
    Boolean {
        nullable: bool,
    },
    Null,
    Any,
}

impl SchemaNode {
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            SchemaNode::Object { nullable: true, .. }
                | SchemaNode::Array { nullable: true, .. }
                | SchemaNode::String { nullable: true, .. }
                | SchemaNode::Number { nullable: true }
                | SchemaNode::Boolean { nullable: true }
                | SchemaNode::Null
        )
    }
}

/// Owns the arena of [`SchemaNode`]s and the id of the root node.
#[derive(Debug, Clone)]
pub struct SchemaModel {
    nodes: Vec<SchemaNode>,
    root: SchemaNodeId,
}

impl SchemaModel {
    pub fn new(nodes: Vec<SchemaNode>, root: SchemaNodeId) -> Self {
        debug_assert!((root.0 as usize) < nodes.len());
        Self { nodes, root }
    }

    pub fn root(&self) -> SchemaNodeId {
        self.root
    }

    pub fn get(&self, id: SchemaNodeId) -> &SchemaNode {
        &self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Property keys of an Object node, or an empty slice for anything else.
    pub fn property_keys(&self, id: SchemaNodeId) -> Vec<&str> {
        match self.get(id) {
            SchemaNode::Object { properties, .. } => {
                properties.iter().map(|(k, _)| k.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Resolve the schema node for a property of an Object node, by name.
    pub fn property_schema(&self, id: SchemaNodeId, key: &str) -> Option<SchemaNodeId> {
        match self.get(id) {
            SchemaNode::Object { properties, .. } => properties
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, node)| *node),
            _ => None,
        }
    }

    /// Item schema of an Array node, if any.
    pub fn item_schema(&self, id: SchemaNodeId) -> Option<SchemaNodeId> {
        match self.get(id) {
            SchemaNode::Array { items, .. } => *items,
            _ => None,
        }
    }

    pub fn is_object(&self, id: SchemaNodeId) -> bool {
        matches!(self.get(id), SchemaNode::Object { .. })
    }

    pub fn required(&self, id: SchemaNodeId) -> &BTreeSet<String> {
        static EMPTY: once_empty::Lazy = once_empty::Lazy::new();
        match self.get(id) {
            SchemaNode::Object { required, .. } => required,
            _ => EMPTY.get(),
        }
    }
}

/// Tiny helper so `required()` can return a `&'static BTreeSet<String>` for
/// non-object nodes without allocating on every call.
mod once_empty {
    use std::collections::BTreeSet;
    use std::sync::OnceLock;

    pub struct Lazy(OnceLock<BTreeSet<String>>);

    impl Lazy {
        pub const fn new() -> Self {
            Self(OnceLock::new())
        }

        pub fn get(&self) -> &BTreeSet<String> {
            self.0.get_or_init(BTreeSet::new)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_object_model() -> SchemaModel {
        let nodes = vec![
            SchemaNode::String {
                enum_values: None,
                nullable: false,
            },
            SchemaNode::Number { nullable: false },
            SchemaNode::Object {
                properties: vec![
                    ("name".to_string(), SchemaNodeId(0)),
                    ("age".to_string(), SchemaNodeId(1)),
                ],
                required: BTreeSet::from(["name".to_string()]),
                nullable: false,
            },
        ];
        SchemaModel::new(nodes, SchemaNodeId(2))
    }

    #[test]
    fn required_is_subset_of_properties() {
        let model = tiny_object_model();
        let root = model.root();
        let keys: BTreeSet<&str> = model.property_keys(root).into_iter().collect();
        for req in model.required(root) {
            assert!(keys.contains(req.as_str()));
        }
    }

    #[test]
    fn property_schema_resolves() {
        let model = tiny_object_model();
        let root = model.root();
        let name_schema = model.property_schema(root, "name").unwrap();
        assert!(matches!(model.get(name_schema), SchemaNode::String { .. }));
        assert!(model.property_schema(root, "missing").is_none());
    }
}
