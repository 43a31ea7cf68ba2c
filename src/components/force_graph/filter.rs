use std::collections::{HashMap, HashSet};

use super::types::{FilteredGraphData, GraphData, NodeId, VisibleLink};

/// Enabled/disabled state per entity type, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeFilter {
	types: Vec<(String, bool)>,
}

impl TypeFilter {
	/// Register the types of a freshly loaded graph. New types start enabled;
	/// types seen in earlier loads keep their setting.
	pub fn discover(&mut self, graph: &GraphData) {
		for node in &graph.nodes {
			if !self.types.iter().any(|(t, _)| *t == node.node_type) {
				self.types.push((node.node_type.clone(), true));
			}
		}
	}

	pub fn set_enabled(&mut self, node_type: &str, enabled: bool) -> bool {
		match self.types.iter_mut().find(|(t, _)| t == node_type) {
			Some((_, e)) if *e != enabled => {
				*e = enabled;
				true
			}
			Some(_) => false,
			None => {
				self.types.push((node_type.to_string(), enabled));
				true
			}
		}
	}

	pub fn is_enabled(&self, node_type: &str) -> bool {
		self.types
			.iter()
			.find(|(t, _)| t == node_type)
			.is_none_or(|(_, e)| *e)
	}

	pub fn types(&self) -> impl Iterator<Item = (&str, bool)> {
		self.types.iter().map(|(t, e)| (t.as_str(), *e))
	}

	pub fn enabled_set(&self) -> HashSet<String> {
		self.types
			.iter()
			.filter(|(_, e)| *e)
			.map(|(t, _)| t.clone())
			.collect()
	}
}

/// Visible subset: nodes of an enabled type, links whose both ends survive.
pub fn filtered(graph: &GraphData, enabled: &HashSet<String>) -> FilteredGraphData {
	let nodes: Vec<usize> = (0..graph.nodes.len())
		.filter(|&i| enabled.contains(&graph.nodes[i].node_type))
		.collect();
	with_links(graph, nodes)
}

/// Filter an already filtered view again.
pub fn refine(
	view: &FilteredGraphData,
	graph: &GraphData,
	enabled: &HashSet<String>,
) -> FilteredGraphData {
	let nodes: Vec<usize> = view
		.nodes
		.iter()
		.copied()
		.filter(|&i| enabled.contains(&graph.nodes[i].node_type))
		.collect();
	let kept: HashSet<usize> = nodes.iter().copied().collect();
	let links = view
		.links
		.iter()
		.copied()
		.filter(|l| kept.contains(&l.source) && kept.contains(&l.target))
		.collect();
	FilteredGraphData { nodes, links }
}

fn with_links(graph: &GraphData, nodes: Vec<usize>) -> FilteredGraphData {
	let index: HashMap<NodeId, usize> = nodes.iter().map(|&i| (graph.nodes[i].id, i)).collect();
	let links = graph
		.links
		.iter()
		.enumerate()
		.filter_map(|(link, l)| {
			Some(VisibleLink {
				link,
				source: *index.get(&l.source)?,
				target: *index.get(&l.target)?,
			})
		})
		.collect();
	FilteredGraphData { nodes, links }
}

/// Per-type count of visible nodes, for the legend.
pub fn visible_counts(view: &FilteredGraphData, graph: &GraphData) -> HashMap<String, usize> {
	let mut counts = HashMap::new();
	for &i in &view.nodes {
		*counts.entry(graph.nodes[i].node_type.clone()).or_insert(0) += 1;
	}
	counts
}

#[cfg(test)]
mod tests {
	use chrono::NaiveDate;

	use super::*;
	use crate::components::force_graph::types::{GraphLink, GraphNode};

	fn sample() -> GraphData {
		GraphData {
			nodes: vec![
				GraphNode::new(1, "p", "Paper").with_date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
				GraphNode::new(2, "o", "Organization"),
			],
			links: vec![GraphLink::new(1, 2)],
		}
	}

	fn rich() -> GraphData {
		let types = ["Paper", "Author", "Topic", "Organization"];
		let nodes = (0..12)
			.map(|i| GraphNode::new(i, format!("n{i}"), types[i as usize % types.len()]))
			.collect();
		let mut links: Vec<GraphLink> = (1..12).map(|i| GraphLink::new(i - 1, i)).collect();
		links.push(GraphLink::new(3, 500));
		links.push(GraphLink::new(0, 7));
		GraphData { nodes, links }
	}

	fn set(types: &[&str]) -> HashSet<String> {
		types.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn disabled_endpoint_drops_link() {
		let g = sample();
		let view = filtered(&g, &set(&["Paper"]));
		assert_eq!(view.node_ids(&g), vec![1]);
		assert!(view.links.is_empty());

		let both = filtered(&g, &set(&["Paper", "Organization"]));
		assert_eq!(both.links.len(), 1);
	}

	#[test]
	fn every_visible_link_has_both_endpoints() {
		let g = rich();
		let all = ["Paper", "Author", "Topic", "Organization"];
		for mask in 0u32..16 {
			let subset: HashSet<String> = all
				.iter()
				.enumerate()
				.filter(|(i, _)| mask & (1 << i) != 0)
				.map(|(_, t)| t.to_string())
				.collect();
			let view = filtered(&g, &subset);
			for l in &view.links {
				assert!(view.nodes.contains(&l.source));
				assert!(view.nodes.contains(&l.target));
			}
		}
	}

	#[test]
	fn dangling_links_are_silently_dropped() {
		let g = rich();
		let view = filtered(&g, &set(&["Paper", "Author", "Topic", "Organization"]));
		assert!(view.links.iter().all(|l| g.links[l.link].target != 500));
		assert_eq!(view.links.len(), g.links.len() - 1);
	}

	#[test]
	fn filtering_is_idempotent() {
		let g = rich();
		let s = set(&["Paper", "Topic"]);
		let once = filtered(&g, &s);
		assert_eq!(refine(&once, &g, &s), once);
		assert_eq!(filtered(&g, &s), once);
	}

	#[test]
	fn discover_enables_new_types_and_keeps_choices() {
		let mut filter = TypeFilter::default();
		filter.discover(&sample());
		assert!(filter.is_enabled("Paper") && filter.is_enabled("Organization"));

		assert!(filter.set_enabled("Organization", false));
		assert!(!filter.set_enabled("Organization", false));

		filter.discover(&rich());
		assert!(!filter.is_enabled("Organization"));
		assert!(filter.is_enabled("Author"));
		let order: Vec<&str> = filter.types().map(|(t, _)| t).collect();
		assert_eq!(order, vec!["Paper", "Organization", "Author", "Topic"]);
		assert_eq!(filter.enabled_set(), set(&["Paper", "Author", "Topic"]));
	}

	#[test]
	fn counts_follow_the_view() {
		let g = rich();
		let view = filtered(&g, &set(&["Paper"]));
		assert_eq!(visible_counts(&view, &g).get("Paper"), Some(&3));
	}
}
