//! Depth-axis positioning for the Layers and Time modes.
//!
//! Both passes are pure functions of their inputs: the same graph, view,
//! range and `now` always produce the same coordinates. They write `z` and
//! the matching `*_position` field of every visible node and nothing else.

use chrono::{Datelike, NaiveDate};

use super::config::{AxisRange, LayerOrdering};
use super::types::{FilteredGraphData, GraphData};

#[derive(Clone, Debug, PartialEq)]
pub struct LayerGuide {
	pub node_type: String,
	pub position: f64,
}

/// Distinct visible types in the requested order.
pub fn layer_order(graph: &GraphData, view: &FilteredGraphData, ordering: LayerOrdering) -> Vec<String> {
	let mut types: Vec<String> = Vec::new();
	for &i in &view.nodes {
		let t = &graph.nodes[i].node_type;
		if !types.contains(t) {
			types.push(t.clone());
		}
	}
	if ordering == LayerOrdering::Alphabetical {
		types.sort();
	}
	types
}

/// Evenly spaced coordinates, `gap = span / max(n - 1, 1)`.
pub fn layer_coordinates(types: &[String], range: AxisRange) -> Vec<LayerGuide> {
	let gap = range.span() / (types.len().saturating_sub(1).max(1) as f64);
	types
		.iter()
		.enumerate()
		.map(|(i, t)| LayerGuide {
			node_type: t.clone(),
			position: range.min + i as f64 * gap,
		})
		.collect()
}

pub fn apply_layers(
	graph: &mut GraphData,
	view: &FilteredGraphData,
	range: AxisRange,
	ordering: LayerOrdering,
) -> Vec<LayerGuide> {
	let guides = layer_coordinates(&layer_order(graph, view, ordering), range);
	for &i in &view.nodes {
		let node = &mut graph.nodes[i];
		if let Some(g) = guides.iter().find(|g| g.node_type == node.node_type) {
			node.z = g.position;
			node.layer_position = Some(g.position);
		}
	}
	guides
}

fn decade_start(date: NaiveDate) -> NaiveDate {
	let year = date.year() - date.year().rem_euclid(10);
	NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(date)
}

/// `[decade of earliest, latest]`, or the last decade up to `now` when
/// nothing is dated.
pub fn time_domain(dates: impl IntoIterator<Item = NaiveDate>, now: NaiveDate) -> (NaiveDate, NaiveDate) {
	let (mut lo, mut hi): (Option<NaiveDate>, Option<NaiveDate>) = (None, None);
	for d in dates {
		lo = Some(lo.map_or(d, |l| l.min(d)));
		hi = Some(hi.map_or(d, |h| h.max(d)));
	}
	match (lo, hi) {
		(Some(lo), Some(hi)) => (decade_start(lo), hi),
		_ => {
			let back = NaiveDate::from_ymd_opt(now.year() - 10, 1, 1).unwrap_or(now);
			(decade_start(back), now)
		}
	}
}

/// Linear, unclamped date → axis mapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeScale {
	start: NaiveDate,
	end: NaiveDate,
	range: AxisRange,
}

impl TimeScale {
	pub fn new(start: NaiveDate, end: NaiveDate, range: AxisRange) -> Self {
		Self { start, end, range }
	}

	pub fn domain(&self) -> (NaiveDate, NaiveDate) {
		(self.start, self.end)
	}

	pub fn map(&self, date: NaiveDate) -> f64 {
		// A single-day domain is widened so the division stays finite.
		let span = (self.end - self.start).num_days().max(1) as f64;
		let t = (date - self.start).num_days() as f64 / span;
		self.range.min + t * self.range.span()
	}

	/// One tick per decade from the domain start through its end.
	pub fn decade_ticks(&self) -> Vec<(i32, f64)> {
		let mut ticks = Vec::new();
		let mut year = decade_start(self.start).year();
		while year <= self.end.year() {
			if let Some(d) = NaiveDate::from_ymd_opt(year, 1, 1) {
				ticks.push((year, self.map(d)));
			}
			year += 10;
		}
		ticks
	}
}

pub fn apply_time(graph: &mut GraphData, view: &FilteredGraphData, range: AxisRange, now: NaiveDate) -> TimeScale {
	let (start, end) = time_domain(view.nodes.iter().filter_map(|&i| graph.nodes[i].date), now);
	let scale = TimeScale::new(start, end, range);
	let undated = scale.map(now);
	for &i in &view.nodes {
		let node = &mut graph.nodes[i];
		let z = node.date.map_or(undated, |d| scale.map(d));
		node.z = z;
		node.date_position = Some(z);
	}
	scale
}
