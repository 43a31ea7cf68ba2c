//! Fixed type → color table and theme colors.

const TYPE_COLORS: &[(&str, &str)] = &[
	("Paper", "#1f77b4"),
	("Author", "#ff7f0e"),
	("Organization", "#2ca02c"),
	("Topic", "#d62728"),
	("Venue", "#9467bd"),
	("Dataset", "#8c564b"),
	("Concept", "#e377c2"),
	("Grant", "#bcbd22"),
	("Patent", "#17becf"),
];

pub const DEFAULT_COLOR: &str = "#7f7f7f";

pub fn color_for_type(node_type: &str) -> &'static str {
	TYPE_COLORS
		.iter()
		.find(|(t, _)| *t == node_type)
		.map(|(_, c)| *c)
		.unwrap_or(DEFAULT_COLOR)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
	/// Parse `#rrggbb` or `#rgb`. Anything else falls back to the default color.
	pub fn parse(hex: &str) -> Self {
		Self::try_parse(hex).unwrap_or(Self(0x7f, 0x7f, 0x7f))
	}

	fn try_parse(hex: &str) -> Option<Self> {
		let h = hex.strip_prefix('#')?;
		let channel = |s: &str| u8::from_str_radix(s, 16).ok();
		match h.len() {
			6 => Some(Self(channel(&h[0..2])?, channel(&h[2..4])?, channel(&h[4..6])?)),
			3 => {
				let (r, g, b) = (channel(&h[0..1])?, channel(&h[1..2])?, channel(&h[2..3])?);
				Some(Self(r * 17, g * 17, b * 17))
			}
			_ => None,
		}
	}

	pub fn css(&self, alpha: f64) -> String {
		format!("rgba({}, {}, {}, {})", self.0, self.1, self.2, alpha)
	}
}

/// Only contrast colors depend on the theme; layout never does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Theme {
	pub dark: bool,
}

impl Theme {
	pub fn background(&self) -> &'static str {
		if self.dark { "#1a1a2e" } else { "#f5f6fa" }
	}

	pub fn foreground(&self) -> &'static str {
		if self.dark { "#e8e8f0" } else { "#1c1c28" }
	}

	/// Color of the translucent shell drawn around emphasized nodes.
	pub fn shell(&self) -> &'static str {
		if self.dark { "#ffffff" } else { "#222233" }
	}

	pub fn guide(&self) -> &'static str {
		if self.dark {
			"rgba(200, 210, 255, 0.35)"
		} else {
			"rgba(40, 40, 80, 0.35)"
		}
	}
}
