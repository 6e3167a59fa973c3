//! SchemaTrieIndex (C4): one [`TokenTrie`] per Object node in a
//! [`SchemaModel`], built by a single depth-first walk.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::tokenizer::TokenizerAdapter;
use crate::trie::builder::TokenTrieBuilder;
use crate::trie::TokenTrie;

use super::{SchemaModel, SchemaNode, SchemaNodeId};

/// Maps every Object [`SchemaNodeId`] in a schema to the [`TokenTrie`] over
/// its property keys. Keyed by node id (spec §9's arena redesign), with the
/// builder's own cache providing the "sorted-keys-joined" fallback the
/// original design describes for schemas rebuilt equivalently.
pub struct SchemaTrieIndex {
    tries: HashMap<SchemaNodeId, Arc<TokenTrie>>,
}

impl SchemaTrieIndex {
    /// Walk every node of `model` once, building a trie for each Object node.
    pub fn build(
        model: &SchemaModel,
        tokenizer: &dyn TokenizerAdapter,
        builder: &TokenTrieBuilder,
    ) -> Result<Self> {
        let mut tries = HashMap::new();
        let mut stack = vec![model.root()];
        let mut visited = std::collections::HashSet::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            match model.get(id) {
                SchemaNode::Object { properties, .. } => {
                    let keys: Vec<String> = properties.iter().map(|(k, _)| k.clone()).collect();
                    let trie = builder.build(&keys, tokenizer)?;
                    tries.insert(id, trie);
                    for (_, child) in properties {
                        stack.push(*child);
                    }
                }
                SchemaNode::Array { items: Some(item), .. } => stack.push(*item),
                _ => {}
            }
        }

        Ok(Self { tries })
    }

    pub fn trie_for(&self, id: SchemaNodeId) -> Option<&Arc<TokenTrie>> {
        self.tries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tries.is_empty()
    }
}
