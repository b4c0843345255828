use crate::prelude_internal::*;

impl Document {
    /// Builds a document from parsed JSON.
    ///
    /// Objects carrying a string `$ref` member become [`Reference`] nodes that
    /// keep the whole object for round-trip. A scalar or array root is kept as is.
    pub fn from_json(value: JsonValue) -> Self {
        let mut doc = Document::new();
        let root = doc.build_json(String::new(), None, value);
        doc.set_root(root);
        doc
    }

    pub fn to_json(&self) -> JsonValue {
        self.node_to_json(self.root)
    }

    /// Serializes the subtree rooted at `id`.
    pub fn node_to_json(&self, id: NodeId) -> JsonValue {
        match &self.node(id).content {
            NodeValue::Object(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, child)| (key.clone(), self.node_to_json(child)))
                    .collect(),
            ),
            NodeValue::Array(array) => {
                JsonValue::Array(array.iter().map(|child| self.node_to_json(*child)).collect())
            }
            NodeValue::Value(value) => value.clone(),
            NodeValue::Reference(reference) => JsonValue::Object(reference.raw.clone()),
        }
    }

    /// Creates the nodes for `value` and links the new subtree root to `parent`.
    /// The caller is responsible for registering the root in the parent container.
    pub(crate) fn build_json(
        &mut self,
        name: String,
        parent: Option<NodeId>,
        value: JsonValue,
    ) -> NodeId {
        match value {
            JsonValue::Object(map) => {
                if let Some(JsonValue::String(path)) = map.get(Reference::KEY) {
                    let reference = Reference {
                        path: path.clone(),
                        raw: map,
                    };
                    return self.create_node(name, parent, NodeValue::Reference(reference));
                }
                let id = self.create_node(name, parent, NodeValue::empty_object());
                let mut children = NodeMap::new();
                for (key, child_value) in map {
                    let child = self.build_json(key.clone(), Some(id), child_value);
                    // serde_json maps have unique keys
                    let _ = children.add(key, child);
                }
                self.set_content(id, NodeValue::Object(children));
                id
            }
            JsonValue::Array(items) => {
                let id = self.create_node(name, parent, NodeValue::empty_array());
                let mut children = NodeArray::new();
                for (index, item) in items.into_iter().enumerate() {
                    children.push(self.build_json(index.to_string(), Some(id), item));
                }
                self.set_content(id, NodeValue::Array(children));
                id
            }
            scalar => self.create_node(name, parent, NodeValue::Value(scalar)),
        }
    }
}
