use chrono::NaiveDate;
use serde::Deserialize;

/// Node identity as delivered by the graph source.
pub type NodeId = i64;

/// A node after normalization. Position and velocity fields are owned by the
/// simulation; `layer_position`/`date_position` hold the last layout pass.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	pub id: NodeId,
	pub name: String,
	pub node_type: String,
	pub date: Option<NaiveDate>,
	pub color: String,
	pub val: f64,
	pub slug: Option<String>,
	pub x: f64,
	pub y: f64,
	pub z: f64,
	pub vx: f64,
	pub vy: f64,
	pub vz: f64,
	pub layer_position: Option<f64>,
	pub date_position: Option<f64>,
}

impl GraphNode {
	pub fn new(id: NodeId, name: impl Into<String>, node_type: impl Into<String>) -> Self {
		Self {
			id,
			name: name.into(),
			node_type: node_type.into(),
			date: None,
			color: String::new(),
			val: 1.0,
			slug: None,
			x: 0.0,
			y: 0.0,
			z: 0.0,
			vx: 0.0,
			vy: 0.0,
			vz: 0.0,
			layer_position: None,
			date_position: None,
		}
	}

	pub fn with_date(mut self, date: NaiveDate) -> Self {
		self.date = Some(date);
		self
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphLink {
	pub source: NodeId,
	pub target: NodeId,
	pub link_type: String,
	pub color: String,
	pub source_type: String,
}

impl GraphLink {
	pub fn new(source: NodeId, target: NodeId) -> Self {
		Self {
			source,
			target,
			link_type: String::new(),
			color: String::new(),
			source_type: String::new(),
		}
	}
}

/// The normalized graph. Replaced wholesale on every successful load.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
	pub nodes: Vec<GraphNode>,
	pub links: Vec<GraphLink>,
}

/// A link that survived filtering, with both endpoints resolved to node indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibleLink {
	pub link: usize,
	pub source: usize,
	pub target: usize,
}

/// Indices into a [`GraphData`]; never owns nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilteredGraphData {
	pub nodes: Vec<usize>,
	pub links: Vec<VisibleLink>,
}

impl FilteredGraphData {
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn node_ids(&self, graph: &GraphData) -> Vec<NodeId> {
		self.nodes.iter().map(|&i| graph.nodes[i].id).collect()
	}
}

/// Wire format of the graph source.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawGraph {
	#[serde(default)]
	pub nodes: Vec<RawNode>,
	#[serde(default)]
	pub links: Vec<RawLink>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawNode {
	pub id: NodeId,
	#[serde(default)]
	pub name: String,
	#[serde(rename = "type", default)]
	pub node_type: String,
	#[serde(default)]
	pub date: Option<String>,
	#[serde(default)]
	pub val: Option<f64>,
}

/// Link endpoints arrive either as a bare id or as an embedded node object.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LinkEnd {
	Id(NodeId),
	Node { id: NodeId },
}

impl LinkEnd {
	pub fn id(self) -> NodeId {
		match self {
			Self::Id(id) | Self::Node { id } => id,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawLink {
	pub source: LinkEnd,
	pub target: LinkEnd,
	#[serde(rename = "type", default)]
	pub link_type: String,
}
