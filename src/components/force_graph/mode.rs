//! Force mode state machine.
//!
//! `Free` lets the simulation move nodes on all three axes. `Layers` and
//! `Time` reduce it to two free axes and pin depth to the layout pass. Each
//! mode maps to an immutable [`ModeConfig`]; nothing else branches on the
//! mode when configuring forces.

use chrono::NaiveDate;
use log::{debug, info};

use super::config::{AxisRange, ForceParams, GraphConfig, LayerOrdering};
use super::layout::{self, LayerGuide, TimeScale};
use super::simulation::Simulation;
use super::types::{FilteredGraphData, GraphData};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ForceMode {
	#[default]
	Free,
	Layers,
	Time,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
	X,
	Y,
	Z,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeConfig {
	/// Axes the simulation integrates.
	pub dimensions: u8,
	/// Axis owned by the layout pass instead of the simulation.
	pub pinned_axis: Option<Axis>,
}

const FREE: ModeConfig = ModeConfig {
	dimensions: 3,
	pinned_axis: None,
};

const PINNED_DEPTH: ModeConfig = ModeConfig {
	dimensions: 2,
	pinned_axis: Some(Axis::Z),
};

impl ForceMode {
	pub const ALL: [ForceMode; 3] = [ForceMode::Free, ForceMode::Layers, ForceMode::Time];

	pub fn config(self) -> ModeConfig {
		match self {
			Self::Free => FREE,
			Self::Layers | Self::Time => PINNED_DEPTH,
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::Free => "Free",
			Self::Layers => "Layers",
			Self::Time => "Time",
		}
	}
}

/// What the last layout pass produced, for drawing axis guides.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AxisGuides {
	#[default]
	None,
	Layers(Vec<LayerGuide>),
	Time(TimeScale),
}

impl AxisGuides {
	fn marks(&self) -> Vec<GuideMark> {
		match self {
			Self::None => Vec::new(),
			Self::Layers(layers) => layers
				.iter()
				.map(|l| GuideMark {
					label: l.node_type.clone(),
					position: l.position,
				})
				.collect(),
			Self::Time(scale) => scale
				.decade_ticks()
				.into_iter()
				.map(|(year, position)| GuideMark {
					label: year.to_string(),
					position,
				})
				.collect(),
		}
	}
}

/// A labelled depth-axis line, formatted once per layout pass.
#[derive(Clone, Debug, PartialEq)]
pub struct GuideMark {
	pub label: String,
	pub position: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SettleAction {
	Pin,
	PinAndReframe,
}

pub struct ForceModeController {
	mode: ForceMode,
	params: ForceParams,
	axis: AxisRange,
	ordering: LayerOrdering,
	guides: AxisGuides,
	marks: Vec<GuideMark>,
	pending: Option<SettleAction>,
}

impl ForceModeController {
	pub fn new(config: &GraphConfig) -> Self {
		Self {
			mode: ForceMode::Free,
			params: config.forces.clone(),
			axis: config.axis,
			ordering: config.layer_ordering,
			guides: AxisGuides::None,
			marks: Vec::new(),
			pending: None,
		}
	}

	pub fn mode(&self) -> ForceMode {
		self.mode
	}

	pub fn params(&self) -> &ForceParams {
		&self.params
	}

	pub fn guides(&self) -> &AxisGuides {
		&self.guides
	}

	pub fn guide_marks(&self) -> &[GuideMark] {
		&self.marks
	}

	pub fn apply_forces(&self, sim: &mut Simulation) {
		sim.configure(self.mode.config().dimensions, &self.params);
	}

	/// Explicit user switch. Returns `false` when already in `mode`.
	pub fn set_mode(
		&mut self,
		mode: ForceMode,
		graph: &mut GraphData,
		view: &FilteredGraphData,
		sim: &mut Simulation,
		today: NaiveDate,
	) -> bool {
		if mode == self.mode {
			return false;
		}
		info!("force mode {} -> {}", self.mode.label(), mode.label());
		self.mode = mode;
		self.apply_forces(sim);
		self.layout(graph, view, today);
		sim.reheat();
		self.pending = Some(SettleAction::PinAndReframe);
		true
	}

	/// New data or a new visible subset: re-run the pass for the current mode.
	pub fn on_view_changed(
		&mut self,
		graph: &mut GraphData,
		view: &FilteredGraphData,
		sim: &mut Simulation,
		today: NaiveDate,
	) {
		self.apply_forces(sim);
		self.layout(graph, view, today);
		sim.reheat();
		if self.mode != ForceMode::Free && self.pending.is_none() {
			self.pending = Some(SettleAction::Pin);
		}
	}

	pub fn set_params(
		&mut self,
		params: ForceParams,
		graph: &mut GraphData,
		view: &FilteredGraphData,
		sim: &mut Simulation,
		today: NaiveDate,
	) {
		let time_changed = params.time_range != self.params.time_range;
		self.params = params;
		self.apply_forces(sim);
		if time_changed && self.mode == ForceMode::Time {
			self.layout(graph, view, today);
		}
		sim.reheat();
	}

	/// Narrow (`factor < 1`) or widen the time sub-range around its centre.
	pub fn zoom_time(
		&mut self,
		factor: f64,
		graph: &mut GraphData,
		view: &FilteredGraphData,
		sim: &mut Simulation,
		today: NaiveDate,
	) {
		let mut params = self.params.clone();
		params.time_range = params.time_range.zoomed(factor);
		self.set_params(params, graph, view, sim, today);
	}

	fn layout(&mut self, graph: &mut GraphData, view: &FilteredGraphData, today: NaiveDate) {
		self.guides = match self.mode {
			ForceMode::Free => AxisGuides::None,
			ForceMode::Layers => {
				AxisGuides::Layers(layout::apply_layers(graph, view, self.axis, self.ordering))
			}
			ForceMode::Time => {
				AxisGuides::Time(layout::apply_time(graph, view, self.params.time_range, today))
			}
		};
		self.marks = self.guides.marks();
	}

	/// Handle the simulation's stop signal. Returns `true` when the camera
	/// should reframe.
	pub fn on_engine_stop(&mut self, graph: &mut GraphData, view: &FilteredGraphData) -> bool {
		let Some(action) = self.pending.take() else {
			return false;
		};
		debug!("simulation settled in {} mode", self.mode.label());
		self.reapply_pins(graph, view);
		action == SettleAction::PinAndReframe
	}

	fn reapply_pins(&self, graph: &mut GraphData, view: &FilteredGraphData) {
		for &i in &view.nodes {
			let node = &mut graph.nodes[i];
			let pinned = match self.mode {
				ForceMode::Free => None,
				ForceMode::Layers => node.layer_position,
				ForceMode::Time => node.date_position,
			};
			if let Some(z) = pinned {
				node.z = z;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::simulation::TickOutcome;
	use crate::components::force_graph::types::{GraphNode, VisibleLink};

	fn today() -> NaiveDate {
		NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
	}

	fn fixture() -> (GraphData, FilteredGraphData, Simulation, ForceModeController) {
		let types = ["Paper", "Author", "Paper", "Topic", "Author"];
		let nodes = types
			.iter()
			.enumerate()
			.map(|(i, t)| {
				let (x, y, z) = crate::components::force_graph::simulation::seed_position(i);
				GraphNode {
					x,
					y,
					z,
					..GraphNode::new(i as i64, "n", *t)
				}
			})
			.collect::<Vec<_>>();
		let view = FilteredGraphData {
			nodes: (0..nodes.len()).collect(),
			links: vec![
				VisibleLink {
					link: 0,
					source: 0,
					target: 1,
				},
				VisibleLink {
					link: 1,
					source: 1,
					target: 3,
				},
			],
		};
		let config = GraphConfig::default();
		let mut sim = Simulation::new(3, &config.forces);
		sim.bind(&view);
		(GraphData { nodes, links: vec![] }, view, sim, ForceModeController::new(&config))
	}

	fn settle(sim: &mut Simulation, g: &mut GraphData) -> bool {
		(0..1000).any(|_| sim.tick(&mut g.nodes) == TickOutcome::Stopped)
	}

	#[test]
	fn free_has_three_axes_and_pinned_modes_two() {
		let free = ForceMode::Free.config();
		assert_eq!((free.dimensions, free.pinned_axis), (3, None));
		for mode in [ForceMode::Layers, ForceMode::Time] {
			let c = mode.config();
			assert_eq!(c.dimensions, 2);
			assert_eq!(c.pinned_axis, Some(Axis::Z));
		}
	}

	#[test]
	fn switch_configures_simulation_and_pins_depth() {
		let (mut g, view, mut sim, mut modes) = fixture();
		assert!(modes.set_mode(ForceMode::Layers, &mut g, &view, &mut sim, today()));
		assert_eq!(sim.dimensions(), 2);
		assert_eq!(sim.alpha(), 1.0);
		assert!(matches!(modes.guides(), AxisGuides::Layers(l) if l.len() == 3));
		assert_eq!(modes.guide_marks().len(), 3);
		assert_eq!(modes.guide_marks()[0].position, -500.0);

		assert!(settle(&mut sim, &mut g));
		assert!(modes.on_engine_stop(&mut g, &view));
		assert!(g.nodes.iter().all(|n| Some(n.z) == n.layer_position));
		assert_eq!(g.nodes[0].z, -500.0);
		assert_eq!(g.nodes[3].z, 500.0);

		// Reframe is requested once per switch.
		assert!(!modes.on_engine_stop(&mut g, &view));
	}

	#[test]
	fn same_mode_is_a_no_op() {
		let (mut g, view, mut sim, mut modes) = fixture();
		assert!(!modes.set_mode(ForceMode::Free, &mut g, &view, &mut sim, today()));
		assert!(!modes.on_engine_stop(&mut g, &view));
	}

	#[test]
	fn back_to_free_restores_three_axes() {
		let (mut g, view, mut sim, mut modes) = fixture();
		modes.set_mode(ForceMode::Time, &mut g, &view, &mut sim, today());
		modes.set_mode(ForceMode::Free, &mut g, &view, &mut sim, today());
		assert_eq!(sim.dimensions(), 3);
		assert_eq!(modes.guides(), &AxisGuides::None);
		assert!(modes.guide_marks().is_empty());
	}

	#[test]
	fn time_zoom_relayouts_in_time_mode() {
		let (mut g, view, mut sim, mut modes) = fixture();
		g.nodes[0].date = NaiveDate::from_ymd_opt(2000, 1, 1);
		g.nodes[2].date = NaiveDate::from_ymd_opt(2011, 1, 1);
		modes.set_mode(ForceMode::Time, &mut g, &view, &mut sim, today());
		assert_eq!(g.nodes[2].z, 500.0);

		modes.zoom_time(0.5, &mut g, &view, &mut sim, today());
		assert_eq!(modes.params().time_range, AxisRange::new(-250.0, 250.0));
		assert_eq!(g.nodes[0].z, -250.0);
		assert_eq!(g.nodes[2].z, 250.0);
		assert_eq!(g.nodes[2].date_position, Some(g.nodes[2].z));
	}

	#[test]
	fn params_change_reheats_without_relayout_in_free() {
		let (mut g, view, mut sim, mut modes) = fixture();
		settle(&mut sim, &mut g);
		let before: Vec<f64> = g.nodes.iter().map(|n| n.z).collect();
		let params = ForceParams {
			repulsion: -10.0,
			..ForceParams::default()
		};
		modes.set_params(params, &mut g, &view, &mut sim, today());
		assert_eq!(sim.alpha(), 1.0);
		assert_eq!(before, g.nodes.iter().map(|n| n.z).collect::<Vec<_>>());
	}
}
