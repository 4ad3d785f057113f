// Workflow graph model.
//
// A ComfyUI workflow in "API format" is a JSON object keyed by node id. Each entry has a
// class_type, an inputs object and, optionally, a _meta object. An input is either a literal
// or a link to another node's output, written as [node_id, slot].
//
// Parsing never aborts because of a single bad node; the node is skipped and reported.
// Graphs are values. set_input() returns a new graph which shares every untouched node
// with the old one, so callers can detect changes with Arc::ptr_eq.

use std::{collections::BTreeMap, fmt, sync::Arc};

use log::{debug, warn};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Fatal parse failures. Nothing usable comes out of these.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("workflow is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("workflow must be a JSON object keyed by node id, found {0}")]
    NotAnObject(&'static str),
}

/// A node entry that was dropped during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeShapeWarning {
    pub key: String,
    pub reason: String,
}

impl fmt::Display for NodeShapeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped node {}: {}", self.key, self.reason)
    }
}

/// Hands out the opaque internal ids used to key nodes in the UI.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

impl<F: FnMut() -> String> IdGenerator for F {
    fn next_id(&mut self) -> String {
        self()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Reference to output `slot` of node `node`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeLink {
    pub node: String,
    pub slot: u32,
}

impl fmt::Display for NodeLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.node, self.slot)
    }
}

/// The value of a single node input.
/// Anything that isn't shaped like a link is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum InputValue {
    Link(NodeLink),
    Literal(Value),
}

impl InputValue {
    pub fn as_link(&self) -> Option<&NodeLink> {
        match self {
            InputValue::Link(link) => Some(link),
            InputValue::Literal(_) => None,
        }
    }
}

impl From<Value> for InputValue {
    fn from(value: Value) -> Self {
        if let Value::Array(items) = &value {
            if let [Value::String(node), Value::Number(slot)] = items.as_slice() {
                if let Some(slot) = slot.as_u64().and_then(|s| u32::try_from(s).ok()) {
                    return InputValue::Link(NodeLink {
                        node: node.clone(),
                        slot,
                    });
                }
            }
        }
        InputValue::Literal(value)
    }
}

impl From<InputValue> for Value {
    fn from(value: InputValue) -> Self {
        match value {
            InputValue::Link(NodeLink { node, slot }) => {
                Value::Array(vec![Value::String(node), Value::from(slot)])
            }
            InputValue::Literal(value) => value,
        }
    }
}

impl From<NodeLink> for InputValue {
    fn from(link: NodeLink) -> Self {
        InputValue::Link(link)
    }
}

impl From<&str> for InputValue {
    fn from(s: &str) -> Self {
        InputValue::Literal(Value::from(s))
    }
}

impl From<String> for InputValue {
    fn from(s: String) -> Self {
        InputValue::Literal(Value::from(s))
    }
}

impl From<i64> for InputValue {
    fn from(n: i64) -> Self {
        InputValue::Literal(Value::from(n))
    }
}

impl From<u64> for InputValue {
    fn from(n: u64) -> Self {
        InputValue::Literal(Value::from(n))
    }
}

impl From<f64> for InputValue {
    fn from(n: f64) -> Self {
        InputValue::Literal(Value::from(n))
    }
}

/// The `_meta` value of a node, kept exactly as it was read.
/// Usually an object with a title, but null or anything else goes back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeMeta(pub Value);

impl NodeMeta {
    pub fn with_title(title: &str) -> Self {
        let mut map = Map::new();
        map.insert("title".to_owned(), Value::from(title));
        NodeMeta(Value::Object(map))
    }

    pub fn title(&self) -> Option<&str> {
        self.0.get("title").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// The node id used on the wire.
    pub external_key: String,
    /// Client-side id for list keying. Never sent to the backend.
    pub internal_id: String,
    /// Leading integer of the external key, if it has one.
    pub order_index: Option<i64>,
    pub type_tag: String,
    pub inputs: BTreeMap<String, InputValue>,
    pub meta: Option<NodeMeta>,
    // Position in the source object; breaks ordering ties.
    position: usize,
}

impl GraphNode {
    fn from_entry(
        key: &str,
        entry: Value,
        position: usize,
        ids: &mut dyn IdGenerator,
    ) -> std::result::Result<Self, String> {
        let mut entry = match entry {
            Value::Object(entry) => entry,
            other => return Err(format!("expected an object, found {}", json_kind(&other))),
        };
        let type_tag = match entry.remove("class_type") {
            Some(Value::String(type_tag)) => type_tag,
            Some(other) => return Err(format!("class_type is {}, not a string", json_kind(&other))),
            None => return Err("missing class_type".to_owned()),
        };
        let inputs = match entry.remove("inputs") {
            Some(Value::Object(inputs)) => inputs
                .into_iter()
                .map(|(name, value)| (name, InputValue::from(value)))
                .collect(),
            Some(other) => return Err(format!("inputs is {}, not an object", json_kind(&other))),
            None => return Err("missing inputs".to_owned()),
        };
        let meta = entry.remove("_meta").map(NodeMeta);

        Ok(GraphNode {
            external_key: key.to_owned(),
            internal_id: ids.next_id(),
            order_index: leading_integer(key),
            type_tag,
            inputs,
            meta,
            position,
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.meta.as_ref().and_then(NodeMeta::title)
    }

    pub fn links(&self) -> impl Iterator<Item = (&str, &NodeLink)> {
        self.inputs
            .iter()
            .filter_map(|(name, value)| value.as_link().map(|link| (name.as_str(), link)))
    }
}

/// Result of a successful parse. `warnings` lists the nodes that were dropped.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub graph: Graph,
    pub warnings: Vec<NodeShapeWarning>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: BTreeMap<String, Arc<GraphNode>>,
}

/// Parses a workflow in API format.
pub fn parse(raw: &str, ids: &mut dyn IdGenerator) -> Result<Parsed, ParseError> {
    let entries = match serde_json::from_str::<Value>(raw)? {
        Value::Object(entries) => entries,
        other => return Err(ParseError::NotAnObject(json_kind(&other))),
    };

    let mut nodes = BTreeMap::new();
    let mut warnings = Vec::new();
    for (position, (key, entry)) in entries.into_iter().enumerate() {
        match GraphNode::from_entry(&key, entry, position, ids) {
            Ok(node) => {
                nodes.insert(key, Arc::new(node));
            }
            Err(reason) => {
                warn!("Skipping node {}: {}", key, reason);
                warnings.push(NodeShapeWarning { key, reason });
            }
        }
    }
    debug!("Parsed {} nodes ({} skipped)", nodes.len(), warnings.len());

    Ok(Parsed {
        graph: Graph { nodes },
        warnings,
    })
}

impl Graph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn node(&self, key: &str) -> Option<&Arc<GraphNode>> {
        self.nodes.get(key)
    }

    pub fn input(&self, key: &str, input: &str) -> Option<&InputValue> {
        self.nodes.get(key).and_then(|node| node.inputs.get(input))
    }

    /// Nodes in display order: numeric keys ascending, then keys without a leading
    /// integer. Ties keep the order the nodes had in the source text.
    pub fn display_order(&self) -> Vec<&GraphNode> {
        let mut ordered: Vec<&GraphNode> = self.nodes.values().map(Arc::as_ref).collect();
        ordered.sort_by_key(|node| (node.order_index.is_none(), node.order_index, node.position));
        ordered
    }

    /// Every link in the graph, as (node key, input name, link).
    pub fn links(&self) -> Vec<(&str, &str, &NodeLink)> {
        self.display_order()
            .into_iter()
            .flat_map(|node| {
                node.links()
                    .map(move |(input, link)| (node.external_key.as_str(), input, link))
            })
            .collect()
    }

    /// Links whose target node isn't in the graph. Only useful for diagnostics;
    /// the backend is the one that decides whether they matter.
    pub fn dangling_links(&self) -> Vec<(&str, &str, &NodeLink)> {
        self.links()
            .into_iter()
            .filter(|(_, _, link)| !self.nodes.contains_key(&link.node))
            .collect()
    }

    /// Returns a graph where only `inputs[input]` of node `key` is replaced.
    /// Every other node is shared with `self`. Unknown keys leave the graph unchanged.
    pub fn set_input(&self, key: &str, input: &str, value: impl Into<InputValue>) -> Graph {
        let Some(node) = self.nodes.get(key) else {
            debug!("set_input on missing node {}, ignoring", key);
            return self.clone();
        };
        let mut updated = GraphNode::clone(node);
        updated.inputs.insert(input.to_owned(), value.into());

        let mut nodes = self.nodes.clone();
        nodes.insert(key.to_owned(), Arc::new(updated));
        Graph { nodes }
    }

    /// Returns a graph with a node added under `key`, replacing any node already there.
    pub fn with_node(
        &self,
        key: &str,
        type_tag: &str,
        inputs: BTreeMap<String, InputValue>,
        meta: Option<NodeMeta>,
        ids: &mut dyn IdGenerator,
    ) -> Graph {
        let position = match self.nodes.get(key) {
            Some(existing) => existing.position,
            None => self.nodes.values().map(|n| n.position + 1).max().unwrap_or(0),
        };
        let node = GraphNode {
            external_key: key.to_owned(),
            internal_id: ids.next_id(),
            order_index: leading_integer(key),
            type_tag: type_tag.to_owned(),
            inputs,
            meta,
            position,
        };
        let mut nodes = self.nodes.clone();
        nodes.insert(key.to_owned(), Arc::new(node));
        Graph { nodes }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// Wire shape of a single node. internal_id and order_index stay out of it.
#[derive(Serialize)]
struct WireNode<'a> {
    inputs: &'a BTreeMap<String, InputValue>,
    class_type: &'a str,
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    meta: Option<&'a NodeMeta>,
}

impl Serialize for Graph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nodes.len()))?;
        for node in self.display_order() {
            map.serialize_entry(
                &node.external_key,
                &WireNode {
                    inputs: &node.inputs,
                    class_type: &node.type_tag,
                    meta: node.meta.as_ref(),
                },
            )?;
        }
        map.end()
    }
}

/// Integer prefix of a node key: "12" -> 12, "5:3" -> 5, " -1" -> -1, "abc" -> None.
fn leading_integer(key: &str) -> Option<i64> {
    let trimmed = key.trim_start();
    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    let sign_len = trimmed.len() - unsigned.len();
    let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    trimmed[..sign_len + digits].parse().ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TXT2IMG: &str = r##"{
        "1": {"inputs": {"ckpt_name": "a.safetensors"}, "class_type": "CheckpointLoaderSimple", "_meta": {"title": "Load Checkpoint"}},
        "2": {"inputs": {"seed": 284011923044208, "steps": 20, "cfg": 8, "denoise": 1.0, "model": ["1", 0], "positive": ["4", 0]}, "class_type": "KSampler", "_meta": {"title": "KSampler", "color": "#322"}},
        "4": {"inputs": {"text": "a cat", "clip": ["1", 1]}, "class_type": "CLIPTextEncode"},
        "10": {"inputs": {"images": ["2", 0], "extra": {"nested": [1, 2, 3]}}, "class_type": "SomeCustomNode"}
    }"##;

    fn counter() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("id-{n}")
        }
    }

    fn parse_ok(raw: &str) -> Parsed {
        parse(raw, &mut counter()).unwrap()
    }

    #[test]
    fn test_parse_basic() {
        let parsed = parse_ok(TXT2IMG);
        assert!(parsed.warnings.is_empty());
        let graph = parsed.graph;
        assert_eq!(graph.len(), 4);
        let sampler = graph.node("2").unwrap();
        assert_eq!(sampler.type_tag, "KSampler");
        assert_eq!(sampler.order_index, Some(2));
        assert_eq!(sampler.title(), Some("KSampler"));
        assert_eq!(
            sampler.inputs["model"],
            InputValue::Link(NodeLink { node: "1".to_owned(), slot: 0 })
        );
        assert_eq!(sampler.inputs["steps"], InputValue::Literal(json!(20)));
        assert!(graph.node("4").unwrap().meta.is_none());
    }

    #[test]
    fn test_internal_ids_are_unique() {
        let graph = parse_ok(TXT2IMG).graph;
        let mut ids: Vec<_> = graph.display_order().iter().map(|n| n.internal_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_round_trip() {
        let graph = parse_ok(TXT2IMG).graph;
        let original: Value = serde_json::from_str(TXT2IMG).unwrap();
        assert_eq!(graph.to_value().unwrap(), original);

        let reparsed = parse_ok(&graph.to_json().unwrap()).graph;
        for (a, b) in graph.display_order().iter().zip(reparsed.display_order()) {
            assert_eq!(a.external_key, b.external_key);
            assert_eq!(a.type_tag, b.type_tag);
            assert_eq!(a.inputs, b.inputs);
            assert_eq!(a.meta, b.meta);
        }
    }

    #[test]
    fn test_serialized_nodes_have_no_presentation_fields() {
        let value = parse_ok(TXT2IMG).graph.to_value().unwrap();
        for (_, node) in value.as_object().unwrap() {
            let keys: Vec<_> = node.as_object().unwrap().keys().cloned().collect();
            assert!(keys.iter().all(|k| ["inputs", "class_type", "_meta"].contains(&k.as_str())));
        }
    }

    #[test]
    fn test_numeric_order() {
        let raw = r#"{
            "10": {"class_type": "B", "inputs": {}},
            "2": {"class_type": "A", "inputs": {}}
        }"#;
        let graph = parse_ok(raw).graph;
        let keys: Vec<_> = graph.display_order().iter().map(|n| n.external_key.as_str()).collect();
        assert_eq!(keys, vec!["2", "10"]);
    }

    #[test]
    fn test_non_numeric_keys_sort_last_in_source_order() {
        let raw = r#"{
            "zeta": {"class_type": "Z", "inputs": {}},
            "3": {"class_type": "C", "inputs": {}},
            "alpha": {"class_type": "A", "inputs": {}},
            "1": {"class_type": "O", "inputs": {}}
        }"#;
        let graph = parse_ok(raw).graph;
        let keys: Vec<_> = graph.display_order().iter().map(|n| n.external_key.as_str()).collect();
        assert_eq!(keys, vec!["1", "3", "zeta", "alpha"]);
        assert_eq!(graph.node("zeta").unwrap().order_index, None);
    }

    #[test]
    fn test_equal_order_index_is_stable() {
        let raw = r#"{
            "5:2": {"class_type": "B", "inputs": {}},
            "5:1": {"class_type": "A", "inputs": {}},
            "5": {"class_type": "C", "inputs": {}}
        }"#;
        let graph = parse_ok(raw).graph;
        let keys: Vec<_> = graph.display_order().iter().map(|n| n.external_key.as_str()).collect();
        assert_eq!(keys, vec!["5:2", "5:1", "5"]);
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("12"), Some(12));
        assert_eq!(leading_integer("5:3"), Some(5));
        assert_eq!(leading_integer(" -1"), Some(-1));
        assert_eq!(leading_integer("+7x"), Some(7));
        assert_eq!(leading_integer("abc"), None);
        assert_eq!(leading_integer("-"), None);
        assert_eq!(leading_integer(""), None);
    }

    #[test_log::test]
    fn test_skip_malformed() {
        let parsed = parse_ok(r#"{"1": {"class_type":"X","inputs":{}}, "2": {"foo":"bar"}}"#);
        assert_eq!(parsed.graph.len(), 1);
        assert!(parsed.graph.contains("1"));
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].key, "2");
    }

    #[test]
    fn test_skip_wrong_field_types() {
        let raw = r#"{
            "1": {"class_type": 5, "inputs": {}},
            "2": {"class_type": "X", "inputs": []},
            "3": "not a node",
            "4": null,
            "5": {"class_type": "Ok", "inputs": {}, "_meta": "odd"}
        }"#;
        let parsed = parse_ok(raw);
        assert_eq!(parsed.graph.len(), 1);
        assert_eq!(parsed.graph.node("5").unwrap().meta, Some(NodeMeta(json!("odd"))));
        let skipped: Vec<_> = parsed.warnings.iter().map(|w| w.key.as_str()).collect();
        assert_eq!(skipped, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse("{not json", &mut counter()), Err(ParseError::InvalidJson(_))));
        assert!(matches!(parse("[1, 2]", &mut counter()), Err(ParseError::NotAnObject("an array"))));
    }

    #[test]
    fn test_empty_object() {
        let parsed = parse_ok("{}");
        assert!(parsed.graph.is_empty());
        assert_eq!(parsed.graph.to_json().unwrap(), "{}");
    }

    #[test]
    fn test_targeted_mutation() {
        let graph = parse_ok(TXT2IMG).graph;
        let updated = graph.set_input("1", "ckpt_name", "b.safetensors");

        assert_eq!(updated.input("1", "ckpt_name"), Some(&InputValue::from("b.safetensors")));
        assert_eq!(graph.input("1", "ckpt_name"), Some(&InputValue::from("a.safetensors")));
        for key in ["2", "4", "10"] {
            assert!(Arc::ptr_eq(graph.node(key).unwrap(), updated.node(key).unwrap()));
        }
        assert!(!Arc::ptr_eq(graph.node("1").unwrap(), updated.node("1").unwrap()));
        // Identity and meta carry over.
        assert_eq!(graph.node("1").unwrap().internal_id, updated.node("1").unwrap().internal_id);
        assert_eq!(updated.node("1").unwrap().title(), Some("Load Checkpoint"));
    }

    #[test]
    fn test_mutation_adds_new_input() {
        let graph = parse_ok(TXT2IMG).graph;
        let updated = graph.set_input("4", "clip", NodeLink { node: "3".to_owned(), slot: 0 });
        assert_eq!(updated.to_value().unwrap()["4"]["inputs"]["clip"], json!(["3", 0]));
        let updated = updated.set_input("4", "weight", json!(0.5));
        assert_eq!(updated.to_value().unwrap()["4"]["inputs"]["weight"], json!(0.5));
    }

    #[test]
    fn test_mutation_missing_node_is_noop() {
        let graph = parse_ok(TXT2IMG).graph;
        let updated = graph.set_input("99", "ckpt_name", "b.safetensors");
        assert_eq!(updated, graph);
        assert!(Arc::ptr_eq(graph.node("1").unwrap(), updated.node("1").unwrap()));
    }

    #[test]
    fn test_link_preservation() {
        let graph = parse_ok(r#"{"2": {"class_type": "VAEDecode", "inputs": {"samples": ["1", 0]}}}"#).graph;
        let value = graph.to_value().unwrap();
        assert_eq!(value["2"]["inputs"]["samples"], json!(["1", 0]));
    }

    #[test]
    fn test_link_lookalikes_stay_literal() {
        let raw = r#"{"1": {"class_type": "X", "inputs": {
            "a": ["1", 0, 2],
            "b": [1, 0],
            "c": ["1", -1],
            "d": ["1", 0.5]
        }}}"#;
        let graph = parse_ok(raw).graph;
        let node = graph.node("1").unwrap();
        assert!(node.inputs.values().all(|v| v.as_link().is_none()));
        assert_eq!(graph.to_value().unwrap(), serde_json::from_str::<Value>(raw).unwrap());
    }

    #[test]
    fn test_unknown_meta_keys_preserved() {
        let value = parse_ok(TXT2IMG).graph.to_value().unwrap();
        assert_eq!(value["2"]["_meta"], json!({"title": "KSampler", "color": "#322"}));
        assert!(value["4"].get("_meta").is_none());
    }

    #[test]
    fn test_odd_meta_round_trips() {
        let raw = r#"{
            "1": {"class_type": "X", "inputs": {}, "_meta": null},
            "2": {"class_type": "Y", "inputs": {}, "_meta": []},
            "3": {"class_type": "Z", "inputs": {}}
        }"#;
        let parsed = parse_ok(raw);
        assert!(parsed.warnings.is_empty());
        let value = parsed.graph.to_value().unwrap();
        assert_eq!(value, serde_json::from_str::<Value>(raw).unwrap());
        assert_eq!(value["1"].get("_meta"), Some(&Value::Null));
        assert_eq!(value["2"]["_meta"], json!([]));
        assert!(value["3"].get("_meta").is_none());
        assert_eq!(parsed.graph.node("1").unwrap().title(), None);
    }

    #[test]
    fn test_dangling_links() {
        let graph = parse_ok(TXT2IMG).graph;
        assert_eq!(graph.links().len(), 4);
        assert!(graph.dangling_links().is_empty());

        // Dropping node 4 leaves the sampler pointing at nothing; that's still a valid graph.
        let raw = r#"{"2": {"class_type": "KSampler", "inputs": {"positive": ["4", 0], "steps": 20}}}"#;
        let graph = parse_ok(raw).graph;
        let dangling = graph.dangling_links();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].0, "2");
        assert_eq!(dangling[0].1, "positive");
        assert_eq!(dangling[0].2.node, "4");
    }

    #[test]
    fn test_with_node() {
        let graph = parse_ok(TXT2IMG).graph;
        let inputs = BTreeMap::from([("model".to_owned(), InputValue::from(NodeLink { node: "1".to_owned(), slot: 0 }))]);
        let updated = graph.with_node("11", "LoraLoader", inputs, Some(NodeMeta::with_title("LoRA")), &mut counter());
        assert_eq!(updated.len(), 5);
        assert_eq!(updated.display_order().last().unwrap().external_key, "11");
        assert_eq!(updated.to_value().unwrap()["11"]["_meta"]["title"], json!("LoRA"));
        assert!(Arc::ptr_eq(graph.node("2").unwrap(), updated.node("2").unwrap()));
    }
}
