//! Imperative handle a host uses to drive a mounted graph.
//!
//! Both commands go through signals, so they can be issued before the graph
//! has data or from any event handler. Re-issuing a highlight is a no-op;
//! re-issuing a pulse restarts its timer.

use leptos::prelude::*;

/// Latest pulse command. `seq` changes on every issue, even for the same type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PulseRequest {
	pub node_type: Option<String>,
	pub seq: u64,
}

/// Copyable command surface for one [`ForceGraph3d`](super::ForceGraph3d).
#[derive(Clone, Copy, Debug)]
pub struct GraphControls {
	highlight: RwSignal<Option<String>>,
	pulse: RwSignal<PulseRequest>,
}

impl Default for GraphControls {
	fn default() -> Self {
		Self::new()
	}
}

impl GraphControls {
	/// Create a handle owned by the current reactive scope.
	pub fn new() -> Self {
		Self {
			highlight: RwSignal::new(None),
			pulse: RwSignal::new(PulseRequest::default()),
		}
	}

	/// Dim every node except those of `node_type`. `None` clears.
	pub fn highlight_nodes_by_type(&self, node_type: Option<&str>) {
		if self.highlight.with_untracked(|h| h.as_deref() != node_type) {
			self.highlight.set(node_type.map(str::to_string));
		}
	}

	/// Pulse every node of `node_type` for the configured duration. `None` cancels.
	pub fn pulse_nodes_by_type(&self, node_type: Option<&str>) {
		self.pulse.update(|p| {
			p.node_type = node_type.map(str::to_string);
			p.seq += 1;
		});
	}

	pub(crate) fn highlight(&self) -> ReadSignal<Option<String>> {
		self.highlight.read_only()
	}

	pub(crate) fn pulse(&self) -> ReadSignal<PulseRequest> {
		self.pulse.read_only()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn highlight_reissue_is_idempotent() {
		let owner = Owner::new();
		owner.with(|| {
			let controls = GraphControls::new();
			controls.highlight_nodes_by_type(Some("Author"));
			controls.highlight_nodes_by_type(Some("Author"));
			assert_eq!(controls.highlight().get_untracked().as_deref(), Some("Author"));
			controls.highlight_nodes_by_type(None);
			assert_eq!(controls.highlight().get_untracked(), None);
		});
	}

	#[test]
	fn pulse_reissue_bumps_sequence() {
		let owner = Owner::new();
		owner.with(|| {
			let controls = GraphControls::new();
			controls.pulse_nodes_by_type(Some("Paper"));
			controls.pulse_nodes_by_type(Some("Paper"));
			let req = controls.pulse().get_untracked();
			assert_eq!(req.node_type.as_deref(), Some("Paper"));
			assert_eq!(req.seq, 2);
		});
	}
}
