//! Perspective camera with eased fly-to transitions.
//!
//! - `on_first_data` places the camera isometrically and schedules a fit
//! - `reframe_isometric` keeps the current distance, resets the direction
//! - `focus_node` flies to a fixed standoff from a node
//! - `orbit` / `dolly` for captured pointer input
//!
//! Call `tick(now)` once per frame before projecting.

use glam::{DMat4, DVec3, DVec4};

use super::config::GraphConfig;

const FOV_Y: f64 = 50.0 * std::f64::consts::PI / 180.0;
const NEAR: f64 = 0.1;
const FAR: f64 = 100_000.0;
const MIN_DISTANCE: f64 = 10.0;
const MAX_DISTANCE: f64 = 20_000.0;
const ROTATE_SPEED: f64 = 0.005;

pub fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

fn isometric() -> DVec3 {
	DVec3::ONE.normalize()
}

#[derive(Clone, Copy, Debug)]
struct Transition {
	from_eye: DVec3,
	from_target: DVec3,
	to_eye: DVec3,
	to_target: DVec3,
	start: f64,
}

/// A world point on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
	pub x: f64,
	pub y: f64,
	/// Distance along the view direction; larger is farther.
	pub depth: f64,
	/// World units → pixels at this depth.
	pub scale: f64,
}

#[derive(Clone, Debug)]
pub struct CameraController {
	eye: DVec3,
	target: DVec3,
	transition: Option<Transition>,
	duration_ms: f64,
	focus_distance: f64,
	fit_delay_ms: f64,
	fit_padding: f64,
	pending_fit: Option<f64>,
	framed: bool,
}

impl CameraController {
	pub fn new(config: &GraphConfig) -> Self {
		Self {
			eye: isometric() * 2.0 * config.axis.bound(),
			target: DVec3::ZERO,
			transition: None,
			duration_ms: config.camera_transition_ms,
			focus_distance: config.focus_distance,
			fit_delay_ms: config.fit_delay_ms,
			fit_padding: config.fit_padding,
			pending_fit: None,
			framed: false,
		}
	}

	pub fn eye(&self) -> DVec3 {
		self.eye
	}

	pub fn target(&self) -> DVec3 {
		self.target
	}

	pub fn distance(&self) -> f64 {
		self.eye.distance(self.target)
	}

	pub fn is_animating(&self) -> bool {
		self.transition.is_some()
	}

	/// First graph arrival: jump to the isometric view and schedule a fit.
	/// Later arrivals are ignored.
	pub fn on_first_data(&mut self, axis_bound: f64, now: f64) {
		if self.framed {
			return;
		}
		self.framed = true;
		self.transition = None;
		self.target = DVec3::ZERO;
		self.eye = isometric() * 2.0 * axis_bound;
		self.pending_fit = Some(now + self.fit_delay_ms);
	}

	/// `true` once when the scheduled fit is due.
	pub fn take_due_fit(&mut self, now: f64) -> bool {
		match self.pending_fit {
			Some(at) if now >= at => {
				self.pending_fit = None;
				true
			}
			_ => false,
		}
	}

	pub fn zoom_to_fit(&mut self, center: DVec3, radius: f64, now: f64) {
		let dir = (self.eye - self.target).try_normalize().unwrap_or_else(isometric);
		let dist = (radius * self.fit_padding / (FOV_Y / 2.0).sin()).clamp(MIN_DISTANCE, MAX_DISTANCE);
		self.fly(center + dir * dist, center, now);
	}

	pub fn reframe_isometric(&mut self, now: f64) {
		let dist = self.distance();
		self.fly(self.target + isometric() * dist, self.target, now);
	}

	/// Fly along the origin → node ray to `focus_distance` from the node.
	pub fn focus_node(&mut self, node: DVec3, now: f64) {
		let len = node.length();
		let eye = if len > 1e-6 {
			node * (1.0 + self.focus_distance / len)
		} else {
			node + DVec3::Z * self.focus_distance
		};
		self.fly(eye, node, now);
	}

	fn fly(&mut self, eye: DVec3, target: DVec3, now: f64) {
		self.transition = Some(Transition {
			from_eye: self.eye,
			from_target: self.target,
			to_eye: eye,
			to_target: target,
			start: now,
		});
	}

	pub fn tick(&mut self, now: f64) {
		let Some(t) = self.transition else {
			return;
		};
		let k = if self.duration_ms <= 0.0 {
			1.0
		} else {
			((now - t.start) / self.duration_ms).clamp(0.0, 1.0)
		};
		let e = ease_out_cubic(k);
		self.eye = t.from_eye.lerp(t.to_eye, e);
		self.target = t.from_target.lerp(t.to_target, e);
		if k >= 1.0 {
			self.transition = None;
		}
	}

	/// Rotate around the target by a pointer delta in pixels.
	pub fn orbit(&mut self, dx: f64, dy: f64) {
		self.transition = None;
		let offset = self.eye - self.target;
		let r = offset.length().max(MIN_DISTANCE);
		let theta = offset.x.atan2(offset.z) - dx * ROTATE_SPEED;
		let phi = ((offset.y / r).clamp(-1.0, 1.0).acos() - dy * ROTATE_SPEED).clamp(0.05, std::f64::consts::PI - 0.05);
		self.eye = self.target + DVec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos()) * r;
	}

	/// Move towards (`factor < 1`) or away from the target.
	pub fn dolly(&mut self, factor: f64) {
		self.transition = None;
		let offset = self.eye - self.target;
		let dist = (offset.length() * factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
		let dir = offset.try_normalize().unwrap_or_else(isometric);
		self.eye = self.target + dir * dist;
	}

	pub fn view_projection(&self, aspect: f64) -> DMat4 {
		DMat4::perspective_rh(FOV_Y, aspect.max(1e-3), NEAR, FAR) * DMat4::look_at_rh(self.eye, self.target, DVec3::Y)
	}

	/// Project `p` onto a `width × height` viewport. `None` behind the camera.
	pub fn project(&self, vp: &DMat4, p: DVec3, width: f64, height: f64) -> Option<Projected> {
		let clip = *vp * DVec4::new(p.x, p.y, p.z, 1.0);
		if clip.w <= NEAR {
			return None;
		}
		let (nx, ny) = (clip.x / clip.w, clip.y / clip.w);
		let focal = height / 2.0 / (FOV_Y / 2.0).tan();
		Some(Projected {
			x: (nx + 1.0) / 2.0 * width,
			y: (1.0 - ny) / 2.0 * height,
			depth: clip.w,
			scale: focal / clip.w,
		})
	}
}
