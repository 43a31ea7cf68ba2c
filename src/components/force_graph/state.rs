use chrono::NaiveDate;
use glam::DVec3;

use super::api::FetchError;
use super::camera::{CameraController, Projected};
use super::config::GraphConfig;
use super::factory::RenderObjectFactory;
use super::filter::{TypeFilter, filtered, refine, visible_counts};
use super::gesture::ScrollGestureGate;
use super::mode::{ForceMode, ForceModeController};
use super::palette::{Theme, color_for_type};
use super::selection::{Activation, SelectionController};
use super::simulation::{Simulation, TickOutcome};
use super::store::{Cancel, GraphDataStore, LoadOutcome, LoadTicket};
use super::types::{FilteredGraphData, GraphNode, NodeId, RawGraph};

/// Pointer travel in pixels after which a press counts as a drag, not a click.
const DRAG_THRESHOLD: f64 = 4.0;
/// Smallest on-screen hit radius in pixels.
const MIN_HIT_RADIUS: f64 = 6.0;
const MIN_FIT_RADIUS: f64 = 50.0;
const DOLLY_STEP: f64 = 1.1;

#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
	pub node_type: String,
	pub color: &'static str,
	pub enabled: bool,
	pub count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClickOutcome {
	/// Chrome click or the tail of a drag.
	Ignored,
	Background,
	Selected(NodeId),
	/// Primary-type node; the host decides where to go.
	Navigate(GraphNode),
}

#[derive(Clone, Copy, Debug)]
struct Press {
	start: (f64, f64),
	last: (f64, f64),
	dragged: bool,
}

/// A visible node projected for this frame.
#[derive(Clone, Copy, Debug)]
pub struct SceneNode {
	pub index: usize,
	pub at: Projected,
}

/// Everything one graph instance owns. Pure and frame-driven: the component
/// feeds it events and timestamps and draws whatever it holds.
pub struct ForceGraphState {
	pub(super) config: GraphConfig,
	pub(super) store: GraphDataStore,
	pub(super) filter: TypeFilter,
	pub(super) view: FilteredGraphData,
	pub(super) sim: Simulation,
	pub(super) modes: ForceModeController,
	pub(super) selection: SelectionController,
	pub(super) camera: CameraController,
	pub(super) gesture: ScrollGestureGate,
	pub(super) factory: RenderObjectFactory,
	pub(super) theme: Theme,
	pub(super) scene: Vec<SceneNode>,
	pub width: f64,
	pub height: f64,
	press: Option<Press>,
	swallow_click: bool,
}

impl ForceGraphState {
	pub fn new(config: GraphConfig, width: f64, height: f64, now: f64) -> Self {
		let modes = ForceModeController::new(&config);
		let sim = Simulation::new(modes.mode().config().dimensions, modes.params());
		let theme = Theme::default();
		let mut factory = RenderObjectFactory::new(config.primary_type.clone());
		factory.set_shell_color(theme.shell());
		Self {
			store: GraphDataStore::default(),
			filter: TypeFilter::default(),
			view: FilteredGraphData::default(),
			sim,
			modes,
			selection: SelectionController::new(&config),
			camera: CameraController::new(&config),
			gesture: ScrollGestureGate::new(now, config.gesture_grace_ms),
			factory,
			theme,
			scene: Vec::new(),
			width,
			height,
			press: None,
			swallow_click: false,
			config,
		}
	}

	pub fn begin_load(&mut self, handle: Box<dyn Cancel>) -> LoadTicket {
		self.store.begin_load(handle)
	}

	pub fn finish_load(
		&mut self,
		ticket: LoadTicket,
		result: Result<RawGraph, FetchError>,
		now: f64,
		today: NaiveDate,
	) -> LoadOutcome {
		let outcome = self.store.finish_load(ticket, result, &self.config.primary_type);
		if outcome == LoadOutcome::Replaced {
			self.filter.discover(self.store.graph());
			self.selection.retain(self.store.graph());
			self.refilter(today);
			if !self.view.is_empty() {
				self.camera.on_first_data(self.config.axis.bound(), now);
			}
		}
		outcome
	}

	fn refilter(&mut self, today: NaiveDate) {
		self.view = filtered(self.store.graph(), &self.filter.enabled_set());
		self.rebind(today);
	}

	fn rebind(&mut self, today: NaiveDate) {
		self.sim.bind(&self.view);
		self.modes
			.on_view_changed(self.store.graph_mut(), &self.view, &mut self.sim, today);
	}

	pub fn view(&self) -> &FilteredGraphData {
		&self.view
	}

	pub fn is_loading(&self) -> bool {
		self.store.is_loading()
	}

	pub fn error(&self) -> Option<&FetchError> {
		self.store.error()
	}

	pub fn legend(&self) -> Vec<LegendEntry> {
		let counts = visible_counts(&self.view, self.store.graph());
		self.filter
			.types()
			.map(|(t, enabled)| LegendEntry {
				node_type: t.to_string(),
				color: color_for_type(t),
				enabled,
				count: counts.get(t).copied().unwrap_or(0),
			})
			.collect()
	}

	/// Returns `true` when the visible subset changed.
	pub fn set_type_enabled(&mut self, node_type: &str, enabled: bool, today: NaiveDate) -> bool {
		if !self.filter.set_enabled(node_type, enabled) {
			return false;
		}
		if enabled {
			self.refilter(today);
		} else {
			// Disabling only ever shrinks the view.
			self.view = refine(&self.view, self.store.graph(), &self.filter.enabled_set());
			self.rebind(today);
		}
		true
	}

	pub fn mode(&self) -> ForceMode {
		self.modes.mode()
	}

	pub fn set_mode(&mut self, mode: ForceMode, today: NaiveDate) -> bool {
		self.modes
			.set_mode(mode, self.store.graph_mut(), &self.view, &mut self.sim, today)
	}

	pub fn zoom_time(&mut self, factor: f64, today: NaiveDate) {
		self.modes
			.zoom_time(factor, self.store.graph_mut(), &self.view, &mut self.sim, today);
	}

	/// Advance one animation frame.
	pub fn frame(&mut self, now: f64) {
		let graph = self.store.graph_mut();
		if self.sim.tick(&mut graph.nodes) == TickOutcome::Stopped
			&& self.modes.on_engine_stop(graph, &self.view)
		{
			self.camera.reframe_isometric(now);
		}
		self.selection.tick(now);
		if self.camera.take_due_fit(now) {
			if let Some((center, radius)) = self.bounds() {
				self.camera.zoom_to_fit(center, radius, now);
			}
		}
		self.camera.tick(now);
	}

	/// Centroid and bounding radius of the visible nodes.
	fn bounds(&self) -> Option<(DVec3, f64)> {
		if self.view.is_empty() {
			return None;
		}
		let nodes = &self.store.graph().nodes;
		let pos = |i: usize| DVec3::new(nodes[i].x, nodes[i].y, nodes[i].z);
		let sum = self.view.nodes.iter().fold(DVec3::ZERO, |acc, &i| acc + pos(i));
		let center = sum / self.view.nodes.len() as f64;
		let radius = self
			.view
			.nodes
			.iter()
			.map(|&i| pos(i).distance(center))
			.fold(MIN_FIT_RADIUS, f64::max);
		Some((center, radius))
	}

	/// Topmost visible node under a canvas point.
	pub fn node_at_position(&self, x: f64, y: f64) -> Option<usize> {
		let vp = self.camera.view_projection(self.width / self.height.max(1.0));
		let nodes = &self.store.graph().nodes;
		let mut best: Option<(usize, f64)> = None;
		for &i in &self.view.nodes {
			let n = &nodes[i];
			let Some(p) = self
				.camera
				.project(&vp, DVec3::new(n.x, n.y, n.z), self.width, self.height)
			else {
				continue;
			};
			let r = (self.factory.base_radius(n) * p.scale).max(MIN_HIT_RADIUS);
			let (dx, dy) = (p.x - x, p.y - y);
			if dx * dx + dy * dy <= r * r && best.is_none_or(|(_, d)| p.depth < d) {
				best = Some((i, p.depth));
			}
		}
		best.map(|(i, _)| i)
	}

	pub fn pointer_down(&mut self, x: f64, y: f64) {
		self.press = Some(Press {
			start: (x, y),
			last: (x, y),
			dragged: false,
		});
	}

	pub fn pointer_move(&mut self, x: f64, y: f64, now: f64) {
		if let Some(press) = &mut self.press {
			let (dx, dy) = (x - press.last.0, y - press.last.1);
			press.last = (x, y);
			if (x - press.start.0).hypot(y - press.start.1) > DRAG_THRESHOLD {
				press.dragged = true;
			}
			if press.dragged && self.gesture.is_captured() {
				self.camera.orbit(dx, dy);
			}
			return;
		}
		let hit = self
			.node_at_position(x, y)
			.map(|i| self.store.graph().nodes[i].id);
		self.selection.hover(hit, now);
	}

	pub fn pointer_up(&mut self) {
		self.swallow_click = self.press.take().is_some_and(|p| p.dragged);
	}

	pub fn pointer_leave(&mut self, now: f64) {
		self.press = None;
		self.selection.hover(None, now);
	}

	/// Wheel input. Returns `true` when the scene consumed it, in which case
	/// the page must not scroll.
	pub fn wheel(&mut self, delta_y: f64) -> bool {
		if !self.gesture.is_captured() {
			return false;
		}
		self.camera
			.dolly(if delta_y > 0.0 { DOLLY_STEP } else { 1.0 / DOLLY_STEP });
		true
	}

	pub fn click_at(&mut self, x: f64, y: f64, now: f64, in_chrome: bool) -> ClickOutcome {
		if std::mem::take(&mut self.swallow_click) || in_chrome {
			return ClickOutcome::Ignored;
		}
		self.gesture.click(now, in_chrome);
		let Some(i) = self.node_at_position(x, y) else {
			self.selection.click_background();
			return ClickOutcome::Background;
		};
		let node = &self.store.graph().nodes[i];
		self.camera.focus_node(DVec3::new(node.x, node.y, node.z), now);
		match self.selection.click_node(node) {
			Activation::Selected(id) => ClickOutcome::Selected(id),
			Activation::Navigate(_) => ClickOutcome::Navigate(node.clone()),
		}
	}

	pub fn is_captured(&self) -> bool {
		self.gesture.is_captured()
	}

	/// Escape key or the release control.
	pub fn release_gesture(&mut self) -> bool {
		self.gesture.release()
	}

	pub fn highlight_external(&mut self, node_type: Option<String>) {
		self.selection.highlight_external(node_type);
	}

	pub fn highlight_ui(&mut self, node_type: Option<String>) {
		self.selection.highlight_ui(node_type);
	}

	pub fn pulse(&mut self, node_type: Option<&str>, now: f64) {
		self.selection.pulse(node_type, self.store.graph(), now);
	}

	pub fn set_theme(&mut self, dark: bool) {
		self.theme = Theme { dark };
		self.factory.set_shell_color(self.theme.shell());
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	/// Cancel the in-flight load, clear deadlines and release cached primitives.
	pub fn dispose(&mut self) {
		self.store.dispose();
		self.selection.dispose();
		self.factory.dispose();
		self.scene.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::factory::RenderState;

	struct Noop;

	impl Cancel for Noop {
		fn cancel(&self) {}
	}

	fn today() -> NaiveDate {
		NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
	}

	fn payload(json: &str) -> RawGraph {
		serde_json::from_str(json).unwrap()
	}

	fn scenario() -> RawGraph {
		payload(
			r#"{
				"nodes": [
					{"id": 1, "name": "A paper", "type": "Paper", "date": "2020-01-01"},
					{"id": 2, "name": "A lab", "type": "Organization", "date": null}
				],
				"links": [{"source": 1, "target": 2, "type": "affiliated"}]
			}"#,
		)
	}

	fn loaded(raw: RawGraph) -> ForceGraphState {
		let mut state = ForceGraphState::new(GraphConfig::default(), 800.0, 600.0, 0.0);
		let ticket = state.begin_load(Box::new(Noop));
		assert_eq!(state.finish_load(ticket, Ok(raw), 0.0, today()), LoadOutcome::Replaced);
		state
	}

	#[test]
	fn disabling_a_type_drops_its_links() {
		let mut state = loaded(scenario());
		assert_eq!(state.view().links.len(), 1);

		assert!(state.set_type_enabled("Organization", false, today()));
		assert_eq!(state.view().node_ids(state.store.graph()), vec![1]);
		assert!(state.view().links.is_empty());
		assert!(!state.set_type_enabled("Organization", false, today()));
	}

	#[test]
	fn legend_reports_visible_counts() {
		let mut state = loaded(scenario());
		state.set_type_enabled("Organization", false, today());
		let legend = state.legend();
		assert_eq!(legend.len(), 2);
		assert_eq!(legend[0].node_type, "Paper");
		assert_eq!((legend[0].count, legend[0].enabled), (1, true));
		assert_eq!((legend[1].count, legend[1].enabled), (0, false));
		assert_eq!(legend[1].color, "#2ca02c");
	}

	#[test]
	fn stale_load_never_replaces_newer_graph() {
		let mut state = ForceGraphState::new(GraphConfig::default(), 800.0, 600.0, 0.0);
		let a = state.begin_load(Box::new(Noop));
		let b = state.begin_load(Box::new(Noop));
		assert_eq!(state.finish_load(b, Ok(scenario()), 0.0, today()), LoadOutcome::Replaced);
		let late = payload(r#"{"nodes": [{"id": 9, "name": "x", "type": "Topic"}]}"#);
		assert_eq!(state.finish_load(a, Ok(late), 10.0, today()), LoadOutcome::Stale);
		assert_eq!(state.view().node_ids(state.store.graph()), vec![1, 2]);
	}

	#[test]
	fn layers_mode_pins_depth_once_settled() {
		let mut state = loaded(scenario());
		assert!(state.set_mode(ForceMode::Layers, today()));
		let mut now = 0.0;
		while !state.sim.is_settled() {
			now += 16.0;
			state.frame(now);
		}
		let nodes = &state.store.graph().nodes;
		assert_eq!(nodes[0].z, -500.0);
		assert_eq!(nodes[1].z, 500.0);
		assert!(state.camera.is_animating());
	}

	#[test]
	fn initial_fit_runs_after_delay() {
		let mut state = loaded(scenario());
		state.frame(100.0);
		assert!(!state.camera.is_animating());
		state.frame(600.0);
		assert!(state.camera.is_animating());
	}

	fn single_node() -> ForceGraphState {
		let mut state = loaded(payload(r#"{"nodes": [{"id": 7, "name": "Ada", "type": "Author"}]}"#));
		let n = &mut state.store.graph_mut().nodes[0];
		(n.x, n.y, n.z) = (0.0, 0.0, 0.0);
		state
	}

	#[test]
	fn hit_test_finds_node_at_screen_centre() {
		let state = single_node();
		assert_eq!(state.node_at_position(400.0, 300.0), Some(0));
		assert_eq!(state.node_at_position(10.0, 10.0), None);
	}

	#[test]
	fn click_selects_and_background_clears() {
		let mut state = single_node();
		assert_eq!(state.click_at(400.0, 300.0, 2000.0, false), ClickOutcome::Selected(7));
		assert!(state.is_captured());
		assert_eq!(state.selection.selected(), Some(7));

		assert_eq!(state.click_at(5.0, 5.0, 2100.0, false), ClickOutcome::Background);
		assert_eq!(state.selection.selected(), None);
	}

	#[test]
	fn chrome_and_drag_clicks_are_ignored() {
		let mut state = single_node();
		assert_eq!(state.click_at(400.0, 300.0, 2000.0, true), ClickOutcome::Ignored);
		assert!(!state.is_captured());

		state.pointer_down(100.0, 100.0);
		state.pointer_move(150.0, 120.0, 2000.0);
		state.pointer_up();
		assert_eq!(state.click_at(150.0, 120.0, 2000.0, false), ClickOutcome::Ignored);
	}

	#[test]
	fn primary_click_navigates() {
		let mut state = loaded(payload(r#"{"nodes": [{"id": 3, "name": "Deep Nets", "type": "Paper"}]}"#));
		let n = &mut state.store.graph_mut().nodes[0];
		(n.x, n.y, n.z) = (0.0, 0.0, 0.0);
		match state.click_at(400.0, 300.0, 0.0, false) {
			ClickOutcome::Navigate(node) => assert_eq!(node.slug.as_deref(), Some("deep-nets")),
			other => panic!("unexpected {other:?}"),
		}
		assert_eq!(state.selection.selected(), None);
		assert!(state.camera.is_animating());
	}

	#[test]
	fn pulse_before_data_covers_nodes_that_arrive() {
		let mut state = ForceGraphState::new(GraphConfig::default(), 800.0, 600.0, 0.0);
		state.pulse(Some("Paper"), 0.0);
		let ticket = state.begin_load(Box::new(Noop));
		state.finish_load(ticket, Ok(scenario()), 100.0, today());
		assert!(state.selection.is_pulsing(1));
		assert!(!state.selection.is_pulsing(2));
	}

	#[test]
	fn wheel_only_zooms_when_captured() {
		let mut state = single_node();
		let d = state.camera.distance();
		assert!(!state.wheel(1.0));
		assert_eq!(state.camera.distance(), d);

		state.click_at(5.0, 5.0, 2000.0, false);
		assert!(state.wheel(1.0));
		assert!(state.camera.distance() > d);

		assert!(state.release_gesture());
		assert!(!state.wheel(1.0));
	}

	#[test]
	fn hover_and_pulse_drive_render_state() {
		let mut state = single_node();
		state.pointer_move(400.0, 300.0, 0.0);
		let node = state.store.graph().nodes[0].clone();
		assert_eq!(state.selection.render_state(&node, 0.0), RenderState::Hovered);

		state.pulse(Some("Author"), 100.0);
		assert!(matches!(state.selection.render_state(&node, 100.0), RenderState::Pulsing(_)));
		state.frame(3100.0);
		assert_eq!(state.selection.render_state(&node, 3100.0), RenderState::Hovered);
	}

	#[test]
	fn dispose_releases_everything() {
		let mut state = single_node();
		state.pulse(Some("Author"), 0.0);
		state.factory.object_for(
			&state.store.graph().nodes[0].clone(),
			RenderState::Plain,
			Default::default(),
		);
		state.dispose();
		assert_eq!(state.factory.geometry_count(), 0);
		assert!(!state.selection.is_pulsing(7));
		assert!(!state.is_loading());
	}
}
