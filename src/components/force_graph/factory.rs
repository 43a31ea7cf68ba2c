//! Cached render primitives.
//!
//! A node's look is a pure function of its [`RenderState`] and a couple of
//! opacity rules. Each state maps to a fixed recipe (body, optional shell,
//! optional glow) whose geometry and material come from two pools keyed by
//! canonical parameters, so steady-state frames only clone `Rc`s.
//!
//! The pools live as long as the owning component and are emptied by an
//! explicit [`RenderObjectFactory::dispose`].

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::rc::Rc;

use super::palette::Rgb;
use super::types::GraphNode;

pub const BASE_RADIUS: f64 = 4.0;
pub const PRIMARY_RADIUS: f64 = 7.0;
pub const BASE_OPACITY: f64 = 0.9;
pub const UNDATED_OPACITY: f64 = 0.2;
pub const HIGHLIGHT_DIM: f64 = 0.3;
pub const LINK_OPACITY: f64 = 0.35;
pub const PULSE_PHASES: u8 = 8;
const PULSE_PERIOD_MS: f64 = 800.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
	Body,
	Shell,
	Glow,
	Link,
}

/// Canonical per-node visual state. Exactly one applies per frame; the
/// selection controller resolves precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderState {
	Plain,
	Hovered,
	Selected,
	Highlighted,
	/// Phase in `0..PULSE_PHASES`.
	Pulsing(u8),
}

impl RenderState {
	/// Radius factor for the body. One factor per state, never compounded.
	pub fn scale(self) -> f64 {
		match self {
			Self::Selected => 1.5,
			Self::Highlighted | Self::Pulsing(_) => 1.3,
			Self::Plain | Self::Hovered => 1.0,
		}
	}
}

/// Quantized pulse phase for a frame timestamp.
pub fn pulse_phase(now_ms: f64) -> u8 {
	let t = (now_ms / PULSE_PERIOD_MS).rem_euclid(1.0);
	((t * PULSE_PHASES as f64) as u8).min(PULSE_PHASES - 1)
}

struct Shell {
	scale: f64,
	opacity: f64,
	segments: u32,
}

struct Recipe {
	shell: Option<Shell>,
	glow: Option<Shell>,
}

fn recipe(state: RenderState) -> Recipe {
	let shell = |opacity| Shell {
		scale: 1.35,
		opacity,
		segments: 16,
	};
	let glow = |scale, opacity| Shell {
		scale,
		opacity,
		segments: 12,
	};
	match state {
		RenderState::Plain => Recipe {
			shell: None,
			glow: None,
		},
		RenderState::Hovered => Recipe {
			shell: Some(shell(0.25)),
			glow: None,
		},
		RenderState::Selected => Recipe {
			shell: Some(shell(0.3)),
			glow: Some(glow(2.0, 0.15)),
		},
		RenderState::Highlighted => Recipe {
			shell: None,
			glow: Some(glow(1.9, 0.18)),
		},
		RenderState::Pulsing(phase) => {
			// Triangle wave over the phase so the glow breathes in and out.
			let half = (PULSE_PHASES / 2) as f64;
			let tri = 1.0 - ((phase as f64 - half).abs() / half);
			Recipe {
				shell: Some(shell(0.25)),
				glow: Some(glow(2.2, 0.08 + 0.22 * tri)),
			}
		}
	}
}

#[derive(Debug)]
pub struct Geometry {
	pub radius: f64,
	pub segments: u32,
	/// Outline vertices in world units around the node centre.
	pub ring: Vec<(f64, f64)>,
}

impl Geometry {
	fn circle(radius: f64, segments: u32) -> Self {
		let ring = (0..segments)
			.map(|k| {
				let a = TAU * k as f64 / segments as f64;
				(radius * a.cos(), radius * a.sin())
			})
			.collect();
		Self {
			radius,
			segments,
			ring,
		}
	}
}

#[derive(Debug)]
pub struct Material {
	pub color: String,
	pub opacity: f64,
	pub role: Role,
	/// Pre-formatted CSS color, so drawing never formats strings.
	pub css: String,
}

#[derive(Clone, Debug)]
pub struct Primitive {
	pub geometry: Rc<Geometry>,
	pub material: Rc<Material>,
}

/// One to three primitives, ordered back to front (glow, shell, body).
#[derive(Clone, Debug)]
pub struct NodeObject {
	glow: Option<Primitive>,
	shell: Option<Primitive>,
	body: Primitive,
}

impl NodeObject {
	pub fn body(&self) -> &Primitive {
		&self.body
	}

	pub fn parts(&self) -> impl Iterator<Item = &Primitive> {
		self.glow
			.iter()
			.chain(self.shell.iter())
			.chain(std::iter::once(&self.body))
	}

	pub fn len(&self) -> usize {
		1 + self.glow.is_some() as usize + self.shell.is_some() as usize
	}

	/// Outer radius in world units, used for hit testing.
	pub fn extent(&self) -> f64 {
		self.parts().map(|p| p.geometry.radius).fold(0.0, f64::max)
	}
}

/// Inputs that dim a node independent of its render state.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpacityRules<'a> {
	pub time_mode: bool,
	pub highlight: Option<&'a str>,
}

impl OpacityRules<'_> {
	pub fn node_opacity(&self, node: &GraphNode) -> f64 {
		let mut opacity = BASE_OPACITY;
		if self.time_mode && node.date.is_none() {
			opacity = UNDATED_OPACITY;
		}
		if self.highlight.is_some_and(|h| h != node.node_type) {
			opacity *= HIGHLIGHT_DIM;
		}
		opacity
	}
}

type GeometryKey = (u32, u32);
type MaterialKey = (u8, Role);

pub struct RenderObjectFactory {
	primary_type: String,
	shell_color: String,
	geometries: HashMap<GeometryKey, Rc<Geometry>>,
	materials: HashMap<String, HashMap<MaterialKey, Rc<Material>>>,
}

impl RenderObjectFactory {
	pub fn new(primary_type: impl Into<String>) -> Self {
		Self {
			primary_type: primary_type.into(),
			shell_color: "#ffffff".into(),
			geometries: HashMap::new(),
			materials: HashMap::new(),
		}
	}

	pub fn set_shell_color(&mut self, color: &str) {
		self.shell_color.clear();
		self.shell_color.push_str(color);
	}

	pub fn base_radius(&self, node: &GraphNode) -> f64 {
		if node.node_type == self.primary_type {
			PRIMARY_RADIUS
		} else {
			BASE_RADIUS
		}
	}

	pub fn object_for(&mut self, node: &GraphNode, state: RenderState, rules: OpacityRules<'_>) -> NodeObject {
		// Hover emphasis only applies to the navigable type.
		let state = match state {
			RenderState::Hovered if node.node_type != self.primary_type => RenderState::Plain,
			s => s,
		};
		let radius = self.base_radius(node) * state.scale();
		let segments = if node.node_type == self.primary_type { 24 } else { 16 };
		let opacity = rules.node_opacity(node);
		let recipe = recipe(state);

		let body = Primitive {
			geometry: self.geometry(radius, segments),
			material: self.material(&node.color, opacity, Role::Body),
		};
		let shell_color = std::mem::take(&mut self.shell_color);
		let shell = recipe.shell.map(|s| Primitive {
			geometry: self.geometry(radius * s.scale, s.segments),
			material: self.material(&shell_color, s.opacity, Role::Shell),
		});
		self.shell_color = shell_color;
		let glow = recipe.glow.map(|g| Primitive {
			geometry: self.geometry(radius * g.scale, g.segments),
			material: self.material(&node.color, g.opacity, Role::Glow),
		});

		NodeObject { glow, shell, body }
	}

	pub fn link_material(&mut self, color: &str, dimmed: bool) -> Rc<Material> {
		let opacity = if dimmed {
			LINK_OPACITY * HIGHLIGHT_DIM
		} else {
			LINK_OPACITY
		};
		self.material(color, opacity, Role::Link)
	}

	fn geometry(&mut self, radius: f64, segments: u32) -> Rc<Geometry> {
		let key = ((radius * 100.0).round() as u32, segments);
		self.geometries
			.entry(key)
			.or_insert_with(|| Rc::new(Geometry::circle(key.0 as f64 / 100.0, segments)))
			.clone()
	}

	fn material(&mut self, color: &str, opacity: f64, role: Role) -> Rc<Material> {
		let pct = (opacity.clamp(0.0, 1.0) * 100.0).round() as u8;
		if let Some(m) = self.materials.get(color).and_then(|by_key| by_key.get(&(pct, role))) {
			return m.clone();
		}
		let opacity = pct as f64 / 100.0;
		let material = Rc::new(Material {
			color: color.to_string(),
			opacity,
			role,
			css: Rgb::parse(color).css(opacity),
		});
		self.materials
			.entry(color.to_string())
			.or_default()
			.insert((pct, role), material.clone());
		material
	}

	pub fn geometry_count(&self) -> usize {
		self.geometries.len()
	}

	pub fn material_count(&self) -> usize {
		self.materials.values().map(HashMap::len).sum()
	}

	/// Release every pooled primitive.
	pub fn dispose(&mut self) {
		log::debug!(
			"releasing {} geometries and {} materials",
			self.geometry_count(),
			self.material_count()
		);
		self.geometries.clear();
		self.materials.clear();
	}
}
