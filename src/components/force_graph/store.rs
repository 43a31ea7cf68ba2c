//! Owner of the current graph. Loads are single-flight: starting a new one
//! cancels the previous request and bumps a generation counter, and a result
//! carrying an old generation is discarded without touching state.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate};
use log::{debug, error, info, warn};

use super::api::FetchError;
use super::palette::{DEFAULT_COLOR, color_for_type};
use super::simulation::seed_position;
use super::types::{GraphData, GraphLink, GraphNode, NodeId, RawGraph};

/// Anything that can abort an in-flight request.
pub trait Cancel {
	fn cancel(&self);
}

impl Cancel for web_sys::AbortController {
	fn cancel(&self) {
		self.abort();
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
	Replaced,
	Failed,
	Cancelled,
	/// A newer load was started after this one; nothing was written.
	Stale,
}

#[derive(Default)]
pub struct GraphDataStore {
	graph: GraphData,
	loading: bool,
	error: Option<FetchError>,
	generation: u64,
	in_flight: Option<Box<dyn Cancel>>,
}

impl GraphDataStore {
	pub fn graph(&self) -> &GraphData {
		&self.graph
	}

	/// Mutable access for position updates only.
	pub fn graph_mut(&mut self) -> &mut GraphData {
		&mut self.graph
	}

	pub fn is_loading(&self) -> bool {
		self.loading
	}

	pub fn error(&self) -> Option<&FetchError> {
		self.error.as_ref()
	}

	pub fn begin_load(&mut self, handle: Box<dyn Cancel>) -> LoadTicket {
		if let Some(prev) = self.in_flight.replace(handle) {
			debug!("cancelling superseded graph load #{}", self.generation);
			prev.cancel();
		}
		self.generation += 1;
		self.loading = true;
		LoadTicket(self.generation)
	}

	pub fn finish_load(
		&mut self,
		ticket: LoadTicket,
		result: Result<RawGraph, FetchError>,
		primary_type: &str,
	) -> LoadOutcome {
		if ticket.0 != self.generation {
			debug!("dropping result of superseded load #{}", ticket.0);
			return LoadOutcome::Stale;
		}
		self.in_flight = None;
		self.loading = false;

		match result {
			Ok(raw) => {
				self.graph = normalize(raw, primary_type);
				self.error = None;
				info!(
					"graph loaded: {} nodes, {} links",
					self.graph.nodes.len(),
					self.graph.links.len()
				);
				LoadOutcome::Replaced
			}
			Err(FetchError::Aborted) => {
				debug!("graph load #{} aborted", ticket.0);
				LoadOutcome::Cancelled
			}
			Err(e) => {
				match &e {
					FetchError::Transport(detail) => {
						error!("graph fetch failed before a response (network/CORS): {detail}")
					}
					FetchError::Http { status } => error!("graph fetch rejected with HTTP {status}"),
					other => error!("graph fetch failed: {other}"),
				}
				self.error = Some(e);
				LoadOutcome::Failed
			}
		}
	}

	/// Abort whatever is in flight. Called on teardown.
	pub fn dispose(&mut self) {
		if let Some(handle) = self.in_flight.take() {
			handle.cancel();
		}
		self.generation += 1;
		self.loading = false;
	}
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
	NaiveDate::parse_from_str(raw, "%Y-%m-%d")
		.ok()
		.or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
}

/// Lowercase, with every run of non-alphanumerics collapsed to one `-`.
pub fn slugify(name: &str) -> String {
	let mut slug = String::with_capacity(name.len());
	let mut gap = false;
	for c in name.chars().flat_map(char::to_lowercase) {
		if c.is_alphanumeric() {
			if gap && !slug.is_empty() {
				slug.push('-');
			}
			gap = false;
			slug.push(c);
		} else {
			gap = true;
		}
	}
	slug
}

pub fn normalize(raw: RawGraph, primary_type: &str) -> GraphData {
	let mut seen = HashSet::with_capacity(raw.nodes.len());
	let mut nodes = Vec::with_capacity(raw.nodes.len());

	for r in raw.nodes {
		if !seen.insert(r.id) {
			warn!("duplicate node id {} dropped", r.id);
			continue;
		}
		let date = r.date.as_deref().and_then(|d| {
			let parsed = parse_date(d);
			if parsed.is_none() {
				warn!("node {}: unparseable date {d:?}", r.id);
			}
			parsed
		});
		let color = color_for_type(&r.node_type).to_string();
		let slug = (r.node_type == primary_type).then(|| slugify(&r.name));
		let (x, y, z) = seed_position(nodes.len());

		nodes.push(GraphNode {
			date,
			color,
			slug,
			val: r.val.unwrap_or(1.0),
			x,
			y,
			z,
			..GraphNode::new(r.id, r.name, r.node_type)
		});
	}

	let by_id: HashMap<NodeId, &GraphNode> = nodes.iter().map(|n| (n.id, n)).collect();
	let links = raw
		.links
		.into_iter()
		.map(|l| {
			let (source, target) = (l.source.id(), l.target.id());
			let (color, source_type) = by_id
				.get(&source)
				.map(|n| (n.color.clone(), n.node_type.clone()))
				.unwrap_or_else(|| (DEFAULT_COLOR.to_string(), String::new()));
			GraphLink {
				source,
				target,
				link_type: l.link_type,
				color,
				source_type,
			}
		})
		.collect();

	GraphData { nodes, links }
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;
	use std::rc::Rc;

	use super::*;

	struct Flag(Rc<Cell<bool>>);

	impl Cancel for Flag {
		fn cancel(&self) {
			self.0.set(true);
		}
	}

	fn flag() -> (Box<dyn Cancel>, Rc<Cell<bool>>) {
		let f = Rc::new(Cell::new(false));
		(Box::new(Flag(f.clone())), f)
	}

	fn payload(json: &str) -> RawGraph {
		serde_json::from_str(json).unwrap()
	}

	fn two_nodes() -> RawGraph {
		payload(
			r#"{"nodes":[
				{"id":1,"name":"Deep Learning: A Survey","type":"Paper","date":"2020-01-01"},
				{"id":2,"name":"ACME Labs","type":"Organization","date":null}
			],"links":[{"source":1,"target":2,"type":"FUNDED_BY"}]}"#,
		)
	}

	#[test]
	fn superseded_result_never_overwrites() {
		let mut store = GraphDataStore::default();
		let (a_handle, a_cancelled) = flag();
		let a = store.begin_load(a_handle);
		let (b_handle, _) = flag();
		let b = store.begin_load(b_handle);
		assert!(a_cancelled.get());

		assert_eq!(store.finish_load(b, Ok(two_nodes()), "Paper"), LoadOutcome::Replaced);
		let after_b = store.graph().clone();

		// A resolves late, even successfully.
		let late = payload(r#"{"nodes":[{"id":99,"name":"stale","type":"Topic"}]}"#);
		assert_eq!(store.finish_load(a, Ok(late), "Paper"), LoadOutcome::Stale);
		assert_eq!(store.graph(), &after_b);
		assert!(!store.is_loading());
	}

	#[test]
	fn failure_keeps_last_good_graph() {
		let mut store = GraphDataStore::default();
		let t = store.begin_load(flag().0);
		store.finish_load(t, Ok(two_nodes()), "Paper");

		let t = store.begin_load(flag().0);
		let outcome = store.finish_load(t, Err(FetchError::Http { status: 502 }), "Paper");
		assert_eq!(outcome, LoadOutcome::Failed);
		assert_eq!(store.graph().nodes.len(), 2);
		assert_eq!(store.error(), Some(&FetchError::Http { status: 502 }));
		assert!(!store.is_loading());
	}

	#[test]
	fn aborted_load_is_cancelled_not_failed() {
		let mut store = GraphDataStore::default();
		let t = store.begin_load(flag().0);
		assert_eq!(store.finish_load(t, Err(FetchError::Aborted), "Paper"), LoadOutcome::Cancelled);
		assert!(store.error().is_none());
	}

	#[test]
	fn dispose_cancels_in_flight() {
		let mut store = GraphDataStore::default();
		let (handle, cancelled) = flag();
		let t = store.begin_load(handle);
		store.dispose();
		assert!(cancelled.get());
		assert_eq!(store.finish_load(t, Ok(two_nodes()), "Paper"), LoadOutcome::Stale);
	}

	#[test]
	fn normalize_derives_color_slug_and_link_color() {
		let g = normalize(two_nodes(), "Paper");
		assert_eq!(g.nodes[0].color, color_for_type("Paper"));
		assert_eq!(g.nodes[0].slug.as_deref(), Some("deep-learning-a-survey"));
		assert_eq!(g.nodes[1].slug, None);
		assert_eq!(g.nodes[0].date, NaiveDate::from_ymd_opt(2020, 1, 1));
		assert_eq!(g.nodes[1].date, None);
		assert_eq!(g.links[0].color, g.nodes[0].color);
		assert_eq!(g.links[0].source_type, "Paper");
	}

	#[test]
	fn normalize_drops_duplicates_and_tolerates_bad_input() {
		let g = normalize(
			payload(
				r#"{"nodes":[
					{"id":1,"name":"a","type":"Spaceship","date":"2021-06-01T12:00:00Z"},
					{"id":1,"name":"dup","type":"Paper"},
					{"id":2,"name":"b","type":"Paper","date":"not a date"}
				],"links":[{"source":42,"target":1}]}"#,
			),
			"Paper",
		);
		assert_eq!(g.nodes.len(), 2);
		assert_eq!(g.nodes[0].color, DEFAULT_COLOR);
		assert_eq!(g.nodes[0].date, NaiveDate::from_ymd_opt(2021, 6, 1));
		assert_eq!(g.nodes[1].date, None);
		assert_eq!(g.links[0].color, DEFAULT_COLOR);
	}

	#[test]
	fn slugify_collapses_separators() {
		assert_eq!(slugify("  Hello,  World!! 2024 "), "hello-world-2024");
		assert_eq!(slugify("---"), "");
	}
}
