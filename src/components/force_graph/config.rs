//! Engine configuration. Every field has a default so hosts can deserialize a
//! partial JSON object or just use `GraphConfig::default()`.

use serde::Deserialize;

/// A closed interval along one world axis.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct AxisRange {
	pub min: f64,
	pub max: f64,
}

impl AxisRange {
	pub const fn new(min: f64, max: f64) -> Self {
		Self { min, max }
	}

	pub fn span(&self) -> f64 {
		self.max - self.min
	}

	pub fn center(&self) -> f64 {
		(self.min + self.max) / 2.0
	}

	/// Largest absolute coordinate reachable on this axis.
	pub fn bound(&self) -> f64 {
		self.min.abs().max(self.max.abs())
	}

	/// Scale the range around its centre. `factor > 1` widens, `< 1` narrows.
	pub fn zoomed(&self, factor: f64) -> Self {
		let (c, half) = (self.center(), self.span() / 2.0 * factor);
		Self::new(c - half, c + half)
	}
}

impl Default for AxisRange {
	fn default() -> Self {
		Self::new(-500.0, 500.0)
	}
}

/// How layer coordinates are assigned to node types.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LayerOrdering {
	/// Order in which types first appear in the payload. Stable for a given
	/// payload, but carries no meaning.
	#[default]
	FirstSeen,
	Alphabetical,
}

/// Tunable simulation inputs. Changing any of them re-applies forces.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForceParams {
	/// Many-body strength; negative repels.
	pub repulsion: f64,
	/// `None` uses `1 / min(degree(source), degree(target))`.
	pub link_strength: Option<f64>,
	pub link_distance: f64,
	pub center_strength: f64,
	/// Sub-range of the depth axis the time scale maps onto.
	pub time_range: AxisRange,
}

impl Default for ForceParams {
	fn default() -> Self {
		Self {
			repulsion: -120.0,
			link_strength: None,
			link_distance: 40.0,
			center_strength: 1.0,
			time_range: AxisRange::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
	/// Node type whose activation navigates instead of selecting.
	pub primary_type: String,
	pub axis: AxisRange,
	pub layer_ordering: LayerOrdering,
	pub forces: ForceParams,
	pub hover_throttle_ms: f64,
	pub pulse_duration_ms: f64,
	pub gesture_grace_ms: f64,
	pub camera_transition_ms: f64,
	pub fit_delay_ms: f64,
	pub focus_distance: f64,
	/// Multiplier on the bounding radius when zooming to fit.
	pub fit_padding: f64,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			primary_type: "Paper".into(),
			axis: AxisRange::default(),
			layer_ordering: LayerOrdering::default(),
			forces: ForceParams::default(),
			hover_throttle_ms: 50.0,
			pulse_duration_ms: 3000.0,
			gesture_grace_ms: 1500.0,
			camera_transition_ms: 1000.0,
			fit_delay_ms: 500.0,
			focus_distance: 120.0,
			fit_padding: 1.2,
		}
	}
}
