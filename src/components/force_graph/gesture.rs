//! Whether wheel and drag input drive the camera or scroll the page.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureState {
	Released,
	Captured,
}

#[derive(Clone, Debug)]
pub struct ScrollGestureGate {
	state: GestureState,
	/// Clicks before this timestamp never capture.
	grace_until: f64,
}

impl ScrollGestureGate {
	pub fn new(now: f64, grace_ms: f64) -> Self {
		Self {
			state: GestureState::Released,
			grace_until: now + grace_ms,
		}
	}

	pub fn state(&self) -> GestureState {
		self.state
	}

	pub fn is_captured(&self) -> bool {
		self.state == GestureState::Captured
	}

	/// A click inside the scene. Clicks on UI chrome never capture.
	/// Returns `true` when this click captured input.
	pub fn click(&mut self, now: f64, in_chrome: bool) -> bool {
		if in_chrome || now < self.grace_until || self.is_captured() {
			return false;
		}
		self.state = GestureState::Captured;
		true
	}

	/// Escape key or the release control. Returns `true` if it was captured.
	pub fn release(&mut self) -> bool {
		let was = self.is_captured();
		self.state = GestureState::Released;
		was
	}
}
