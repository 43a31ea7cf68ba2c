//! Interactive emphasis state: selection, hover, type highlight and pulse.
//!
//! Time-dependent behaviour (hover throttle, pulse auto-clear) is expressed
//! as deadlines checked from [`SelectionController::tick`], which the frame
//! loop calls with the current timestamp.

use std::collections::HashSet;

use super::config::GraphConfig;
use super::factory::{RenderState, pulse_phase};
use super::types::{GraphData, GraphNode, NodeId};

/// Result of clicking a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Activation {
	Selected(NodeId),
	/// Primary-type node: the host navigates, selection is not retained.
	Navigate(NodeId),
}

#[derive(Clone, Debug)]
pub struct SelectionController {
	primary_type: String,
	hover_interval_ms: f64,
	pulse_duration_ms: f64,

	selected: Option<NodeId>,
	hovered: Option<NodeId>,
	last_hover_at: Option<f64>,
	deferred_hover: Option<Option<NodeId>>,

	external_highlight: Option<String>,
	ui_highlight: Option<String>,

	pulse_type: Option<String>,
	pulsing: HashSet<NodeId>,
	pulse_deadline: Option<f64>,
}

impl SelectionController {
	pub fn new(config: &GraphConfig) -> Self {
		Self {
			primary_type: config.primary_type.clone(),
			hover_interval_ms: config.hover_throttle_ms,
			pulse_duration_ms: config.pulse_duration_ms,
			selected: None,
			hovered: None,
			last_hover_at: None,
			deferred_hover: None,
			external_highlight: None,
			ui_highlight: None,
			pulse_type: None,
			pulsing: HashSet::new(),
			pulse_deadline: None,
		}
	}

	pub fn selected(&self) -> Option<NodeId> {
		self.selected
	}

	pub fn hovered(&self) -> Option<NodeId> {
		self.hovered
	}

	/// Throttled hover update. Returns `true` when the hovered node changed
	/// now; a change arriving too soon is deferred to a later `tick`.
	pub fn hover(&mut self, node: Option<NodeId>, now: f64) -> bool {
		if node == self.hovered && self.deferred_hover.is_none() {
			return false;
		}
		match self.last_hover_at {
			Some(last) if now - last < self.hover_interval_ms => {
				self.deferred_hover = Some(node);
				false
			}
			_ => self.apply_hover(node, now),
		}
	}

	fn apply_hover(&mut self, node: Option<NodeId>, now: f64) -> bool {
		self.deferred_hover = None;
		self.last_hover_at = Some(now);
		let changed = self.hovered != node;
		self.hovered = node;
		changed
	}

	/// Flush deferred hover and expire the pulse. Returns `true` if anything
	/// visible changed.
	pub fn tick(&mut self, now: f64) -> bool {
		let mut changed = false;
		if let Some(node) = self.deferred_hover {
			let due = self.last_hover_at.is_none_or(|last| now - last >= self.hover_interval_ms);
			if due {
				changed |= self.apply_hover(node, now);
			}
		}
		if self.pulse_deadline.is_some_and(|deadline| now >= deadline) {
			self.clear_pulse();
			changed = true;
		}
		changed
	}

	pub fn click_background(&mut self) {
		self.selected = None;
		self.hovered = None;
		self.deferred_hover = None;
	}

	pub fn click_node(&mut self, node: &GraphNode) -> Activation {
		if node.node_type == self.primary_type {
			self.selected = None;
			Activation::Navigate(node.id)
		} else {
			self.selected = Some(node.id);
			Activation::Selected(node.id)
		}
	}

	/// Imperative highlight. While set it overrides the UI highlight.
	pub fn highlight_external(&mut self, node_type: Option<String>) {
		self.external_highlight = node_type;
	}

	/// Highlight driven by the legend.
	pub fn highlight_ui(&mut self, node_type: Option<String>) {
		self.ui_highlight = node_type;
	}

	pub fn highlighted_type(&self) -> Option<&str> {
		self.external_highlight
			.as_deref()
			.or(self.ui_highlight.as_deref())
	}

	/// Start (or cancel with `None`) a pulse on every node of `node_type`.
	/// A new pulse replaces the previous one and restarts the timer.
	pub fn pulse(&mut self, node_type: Option<&str>, graph: &GraphData, now: f64) {
		self.clear_pulse();
		let Some(t) = node_type else {
			return;
		};
		self.pulse_type = Some(t.to_string());
		self.pulse_deadline = Some(now + self.pulse_duration_ms);
		self.collect_pulsing(graph);
	}

	pub fn pulse_type(&self) -> Option<&str> {
		self.pulse_type.as_deref()
	}

	pub fn is_pulsing(&self, id: NodeId) -> bool {
		self.pulsing.contains(&id)
	}

	fn clear_pulse(&mut self) {
		self.pulsing.clear();
		self.pulse_type = None;
		self.pulse_deadline = None;
	}

	/// Follow a replaced graph: forget nodes that left it and re-collect a
	/// live pulse so nodes of the pulsing type that arrived join it.
	pub fn retain(&mut self, graph: &GraphData) {
		let present: HashSet<NodeId> = graph.nodes.iter().map(|n| n.id).collect();
		if self.selected.is_some_and(|id| !present.contains(&id)) {
			self.selected = None;
		}
		if self.hovered.is_some_and(|id| !present.contains(&id)) {
			self.hovered = None;
		}
		self.collect_pulsing(graph);
	}

	fn collect_pulsing(&mut self, graph: &GraphData) {
		self.pulsing.clear();
		if let Some(t) = &self.pulse_type {
			self.pulsing
				.extend(graph.nodes.iter().filter(|n| n.node_type == *t).map(|n| n.id));
		}
	}

	/// Single visual state for `node`, by precedence: selected, pulsing,
	/// highlighted, hovered.
	pub fn render_state(&self, node: &GraphNode, now: f64) -> RenderState {
		if self.selected == Some(node.id) {
			RenderState::Selected
		} else if self.pulsing.contains(&node.id) {
			RenderState::Pulsing(pulse_phase(now))
		} else if self.highlighted_type() == Some(node.node_type.as_str()) {
			RenderState::Highlighted
		} else if self.hovered == Some(node.id) {
			RenderState::Hovered
		} else {
			RenderState::Plain
		}
	}

	/// Cancel every pending deadline. Called on teardown.
	pub fn dispose(&mut self) {
		self.deferred_hover = None;
		self.clear_pulse();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn graph() -> GraphData {
		GraphData {
			nodes: vec![
				GraphNode::new(1, "p1", "Paper"),
				GraphNode::new(2, "p2", "Paper"),
				GraphNode::new(3, "a", "Author"),
				GraphNode::new(4, "o", "Organization"),
			],
			links: vec![],
		}
	}

	fn controller() -> SelectionController {
		SelectionController::new(&GraphConfig::default())
	}

	#[test]
	fn new_pulse_replaces_and_resets_timer() {
		let g = graph();
		let mut s = controller();
		s.pulse(Some("Paper"), &g, 0.0);
		s.pulse(Some("Author"), &g, 1000.0);

		assert!(!s.is_pulsing(1) && !s.is_pulsing(2));
		assert!(s.is_pulsing(3));

		// Paper's first deadline passes; Author keeps pulsing.
		assert!(!s.tick(3500.0));
		assert!(s.is_pulsing(3));

		assert!(s.tick(4000.0));
		assert!(!s.is_pulsing(3));
		assert_eq!(s.pulse_type(), None);
	}

	#[test]
	fn pulse_none_cancels() {
		let g = graph();
		let mut s = controller();
		s.pulse(Some("Paper"), &g, 0.0);
		s.pulse(None, &g, 10.0);
		assert!(!s.is_pulsing(1));
		assert!(!s.tick(5000.0));
	}

	#[test]
	fn hover_is_throttled_and_flushed() {
		let mut s = controller();
		assert!(s.hover(Some(1), 0.0));
		assert!(!s.hover(Some(2), 10.0));
		assert!(!s.hover(Some(3), 20.0));
		assert_eq!(s.hovered(), Some(1));

		assert!(!s.tick(30.0));
		assert!(s.tick(50.0));
		assert_eq!(s.hovered(), Some(3));

		assert!(s.hover(None, 120.0));
		assert_eq!(s.hovered(), None);
	}

	#[test]
	fn background_click_clears_selection_and_hover() {
		let g = graph();
		let mut s = controller();
		assert_eq!(s.click_node(&g.nodes[2]), Activation::Selected(3));
		s.hover(Some(4), 0.0);
		s.click_background();
		assert_eq!(s.selected(), None);
		assert_eq!(s.hovered(), None);
	}

	#[test]
	fn primary_nodes_navigate_instead_of_selecting() {
		let g = graph();
		let mut s = controller();
		s.click_node(&g.nodes[2]);
		assert_eq!(s.click_node(&g.nodes[0]), Activation::Navigate(1));
		assert_eq!(s.selected(), None);
	}

	#[test]
	fn external_highlight_takes_precedence() {
		let mut s = controller();
		s.highlight_ui(Some("Author".into()));
		assert_eq!(s.highlighted_type(), Some("Author"));
		s.highlight_external(Some("Paper".into()));
		assert_eq!(s.highlighted_type(), Some("Paper"));
		s.highlight_ui(Some("Organization".into()));
		assert_eq!(s.highlighted_type(), Some("Paper"));
		s.highlight_external(None);
		assert_eq!(s.highlighted_type(), Some("Organization"));
	}

	#[test]
	fn render_state_precedence() {
		let g = graph();
		let mut s = controller();
		s.click_node(&g.nodes[2]);
		s.pulse(Some("Author"), &g, 0.0);
		s.highlight_external(Some("Paper".into()));
		s.hover(Some(4), 0.0);

		assert_eq!(s.render_state(&g.nodes[2], 0.0), RenderState::Selected);
		assert_eq!(s.render_state(&g.nodes[0], 0.0), RenderState::Highlighted);
		assert_eq!(s.render_state(&g.nodes[3], 0.0), RenderState::Hovered);

		s.click_background();
		assert!(matches!(s.render_state(&g.nodes[2], 0.0), RenderState::Pulsing(_)));
	}

	#[test]
	fn retain_forgets_missing_nodes() {
		let g = graph();
		let mut s = controller();
		s.click_node(&g.nodes[3]);
		s.pulse(Some("Paper"), &g, 0.0);
		let smaller = GraphData {
			nodes: vec![GraphNode::new(1, "p1", "Paper")],
			links: vec![],
		};
		s.retain(&smaller);
		assert_eq!(s.selected(), None);
		assert!(s.is_pulsing(1) && !s.is_pulsing(2));
	}

	#[test]
	fn live_pulse_picks_up_new_nodes_of_its_type() {
		let mut s = controller();
		s.pulse(Some("Paper"), &GraphData::default(), 0.0);
		assert!(!s.is_pulsing(1));

		s.retain(&graph());
		assert!(s.is_pulsing(1) && s.is_pulsing(2));
		assert!(!s.is_pulsing(3));

		// Once expired, a reload does not revive it.
		s.tick(5000.0);
		s.retain(&graph());
		assert!(!s.is_pulsing(1));
	}

	#[test]
	fn dispose_clears_deadlines() {
		let g = graph();
		let mut s = controller();
		s.pulse(Some("Paper"), &g, 0.0);
		s.dispose();
		assert!(!s.is_pulsing(1));
		assert!(!s.tick(10_000.0));
	}
}
