//! Owned, shape-agnostic model of a service response.
//!
//! A [`Response`] is a small arena of [`Node`]s. Containers refer to their
//! children by [`NodeId`], which keeps the graph `Send + Sync` and lets a
//! node appear in several places, including inside itself.

use serde_json::Value;

/// Index of a node inside a [`Response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One value in a response graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Missing or explicit null.
    Null,
    /// Booleans and numbers, kept only for completeness.
    Scalar(String),
    /// Raw binary data.
    Bytes(Vec<u8>),
    /// A text string.
    Text(String),
    /// Named fields of a typed SDK object.
    Record(Vec<(String, NodeId)>),
    /// A key/value mapping, e.g. a JSON object.
    Map(Vec<(String, NodeId)>),
    /// An ordered sequence.
    Seq(Vec<NodeId>),
}

/// A response graph with a designated root.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Create a response whose root is `Null`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Null],
            root: NodeId(0),
        }
    }

    /// Build a response from a decoded JSON body.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let mut response = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = response.add_json(value);
        response.root = root;
        response
    }

    /// Build a response that is nothing but raw bytes.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            nodes: vec![Node::Bytes(data)],
            root: NodeId(0),
        }
    }

    /// The root node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Make `id` the root of the graph.
    pub fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Look up a named field or key on a `Record` or `Map` node.
    #[must_use]
    pub fn field(&self, id: NodeId, key: &str) -> Option<NodeId> {
        match self.node(id)? {
            Node::Record(fields) | Node::Map(fields) => {
                fields.iter().find(|(k, _)| k == key).map(|f| f.1)
            }
            _ => None,
        }
    }

    /// Add a `Bytes` node.
    pub fn bytes(&mut self, data: impl Into<Vec<u8>>) -> NodeId {
        self.add(Node::Bytes(data.into()))
    }

    /// Add a `Text` node.
    pub fn text(&mut self, text: impl Into<String>) -> NodeId {
        self.add(Node::Text(text.into()))
    }

    /// Add a `Null` node.
    pub fn null(&mut self) -> NodeId {
        self.add(Node::Null)
    }

    /// Add an empty `Map` node.
    pub fn map(&mut self) -> NodeId {
        self.add(Node::Map(Vec::new()))
    }

    /// Add an empty `Record` node.
    pub fn record(&mut self) -> NodeId {
        self.add(Node::Record(Vec::new()))
    }

    /// Add an empty `Seq` node.
    pub fn seq(&mut self) -> NodeId {
        self.add(Node::Seq(Vec::new()))
    }

    /// Attach `child` under `key` on a `Map` or `Record`.
    ///
    /// Returns `false` if `parent` is not a keyed container.
    pub fn insert(&mut self, parent: NodeId, key: impl Into<String>, child: NodeId) -> bool {
        match self.nodes.get_mut(parent.0) {
            Some(Node::Map(fields) | Node::Record(fields)) => {
                fields.push((key.into(), child));
                true
            }
            _ => false,
        }
    }

    /// Append `child` to a `Seq`.
    ///
    /// Returns `false` if `parent` is not a sequence.
    pub fn push(&mut self, parent: NodeId, child: NodeId) -> bool {
        match self.nodes.get_mut(parent.0) {
            Some(Node::Seq(items)) => {
                items.push(child);
                true
            }
            _ => false,
        }
    }

    fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn add_json(&mut self, value: &Value) -> NodeId {
        match value {
            Value::Null => self.add(Node::Null),
            Value::Bool(b) => self.add(Node::Scalar(b.to_string())),
            Value::Number(n) => self.add(Node::Scalar(n.to_string())),
            Value::String(s) => self.add(Node::Text(s.clone())),
            Value::Array(items) => {
                let children = items.iter().map(|v| self.add_json(v)).collect();
                self.add(Node::Seq(children))
            }
            Value::Object(entries) => {
                let fields = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.add_json(v)))
                    .collect();
                self.add(Node::Map(fields))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_objects_become_maps() {
        let response = Response::from_json(&json!({"a": [1, "two", null]}));
        let root = response.root();
        assert!(matches!(response.node(root), Some(Node::Map(_))));

        let a = response.field(root, "a").unwrap();
        let Some(Node::Seq(items)) = response.node(a) else {
            panic!("expected seq");
        };
        assert_eq!(response.node(items[0]), Some(&Node::Scalar("1".into())));
        assert_eq!(response.node(items[1]), Some(&Node::Text("two".into())));
        assert_eq!(response.node(items[2]), Some(&Node::Null));
    }

    #[test]
    fn builder_can_form_cycles() {
        let mut response = Response::new();
        let root = response.record();
        response.set_root(root);
        assert!(response.insert(root, "content", root));
        assert_eq!(response.field(root, "content"), Some(root));
    }

    #[test]
    fn insert_rejects_non_containers() {
        let mut response = Response::new();
        let text = response.text("x");
        let other = response.null();
        assert!(!response.insert(text, "k", other));
        assert!(!response.push(text, other));
    }

    #[test]
    fn from_bytes_root_is_bytes() {
        let response = Response::from_bytes(vec![1, 2, 3]);
        let bytes = Node::Bytes(vec![1, 2, 3]);
        assert_eq!(response.node(response.root()), Some(&bytes));
    }
}
