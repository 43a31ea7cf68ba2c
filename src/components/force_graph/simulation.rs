//! Velocity-decay force simulation in two or three dimensions.
//!
//! Forces: link springs, many-body charge (Barnes-Hut over an octree) and
//! mean centering. `alpha` cools geometrically from 1 towards 0; once it falls
//! below [`ALPHA_MIN`] the engine reports [`TickOutcome::Stopped`] exactly
//! once and then idles until reheated.
//!
//! The octree and traversal stack are kept between ticks and only cleared,
//! so a running simulation does not allocate per frame.

use std::f64::consts::PI;

use super::config::ForceParams;
use super::types::{FilteredGraphData, GraphNode};

pub const ALPHA_MIN: f64 = 0.001;
const VELOCITY_DECAY: f64 = 0.4;
const THETA2: f64 = 0.81;
const DISTANCE_MIN2: f64 = 1.0;
const MAX_DEPTH: u32 = 32;
const NONE: u32 = u32::MAX;

const SEED_RADIUS: f64 = 10.0;

/// Phyllotaxis seed position for the `i`th node, spread on a sphere.
pub fn seed_position(i: usize) -> (f64, f64, f64) {
	let roll_step = PI * (3.0 - 5f64.sqrt());
	let yaw_step = PI * 20.0 / (9.0 + 221f64.sqrt());
	let i = i as f64;
	let radius = SEED_RADIUS * (0.5 + i).cbrt();
	let (roll, yaw) = (i * roll_step, i * yaw_step);
	(
		radius * roll.sin() * yaw.cos(),
		radius * roll.cos(),
		radius * roll.sin() * yaw.sin(),
	)
}

fn jiggle(seed: usize) -> f64 {
	(((seed as f64 + 1.0) * 0.618_033_988_749_895).fract() - 0.5) * 1e-6
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
	Running,
	/// Alpha crossed the threshold on this tick.
	Stopped,
	Idle,
}

#[derive(Clone, Copy, Debug, Default)]
struct Cell {
	min: [f64; 3],
	size: f64,
	children: [u32; 8],
	internal: bool,
	/// Head of the chain of coincident bodies stored in a leaf.
	body: u32,
	sum: [f64; 3],
	count: u32,
}

impl Cell {
	fn new(min: [f64; 3], size: f64) -> Self {
		Self {
			min,
			size,
			body: NONE,
			..Default::default()
		}
	}

	fn octant(&self, p: [f64; 3]) -> usize {
		let half = self.size / 2.0;
		(0..3).fold(0, |acc, axis| {
			acc | (((p[axis] >= self.min[axis] + half) as usize) << axis)
		})
	}
}

#[derive(Default)]
struct Octree {
	cells: Vec<Cell>,
	next: Vec<u32>,
}

impl Octree {
	fn rebuild(&mut self, pos: &[[f64; 3]]) {
		self.cells.clear();
		self.next.clear();
		self.next.resize(pos.len(), NONE);
		if pos.is_empty() {
			return;
		}

		let (mut lo, mut hi) = ([f64::INFINITY; 3], [f64::NEG_INFINITY; 3]);
		for p in pos {
			for axis in 0..3 {
				lo[axis] = lo[axis].min(p[axis]);
				hi[axis] = hi[axis].max(p[axis]);
			}
		}
		let size = (0..3).map(|a| hi[a] - lo[a]).fold(0.0, f64::max) + 1.0;
		self.cells.push(Cell::new(lo, size));

		for b in 0..pos.len() {
			self.insert(b as u32, pos);
		}

		// Children are always pushed after their parent.
		for c in (0..self.cells.len()).rev() {
			let (mut sum, mut count) = ([0.0; 3], 0);
			if self.cells[c].internal {
				for &child in &self.cells[c].children {
					if child != 0 {
						let ch = &self.cells[child as usize];
						(0..3).for_each(|a| sum[a] += ch.sum[a]);
						count += ch.count;
					}
				}
			} else {
				let mut b = self.cells[c].body;
				while b != NONE {
					(0..3).for_each(|a| sum[a] += pos[b as usize][a]);
					count += 1;
					b = self.next[b as usize];
				}
			}
			self.cells[c].sum = sum;
			self.cells[c].count = count;
		}
	}

	fn insert(&mut self, b: u32, pos: &[[f64; 3]]) {
		let p = pos[b as usize];
		let (mut c, mut depth) = (0usize, 0u32);
		loop {
			if self.cells[c].internal {
				let oct = self.cells[c].octant(p);
				c = self.child(c, oct);
				depth += 1;
				continue;
			}
			let existing = self.cells[c].body;
			if existing == NONE {
				self.cells[c].body = b;
				return;
			}
			if depth >= MAX_DEPTH || pos[existing as usize] == p {
				self.next[b as usize] = existing;
				self.cells[c].body = b;
				return;
			}
			// Split: the existing chain moves down intact, then retry here.
			self.cells[c].body = NONE;
			self.cells[c].internal = true;
			let oct = self.cells[c].octant(pos[existing as usize]);
			let child = self.child(c, oct);
			self.cells[child].body = existing;
		}
	}

	fn child(&mut self, c: usize, oct: usize) -> usize {
		let existing = self.cells[c].children[oct];
		if existing != 0 {
			return existing as usize;
		}
		let parent = self.cells[c];
		let half = parent.size / 2.0;
		let mut min = parent.min;
		for (axis, m) in min.iter_mut().enumerate() {
			if oct & (1 << axis) != 0 {
				*m += half;
			}
		}
		let idx = self.cells.len();
		self.cells.push(Cell::new(min, half));
		self.cells[c].children[oct] = idx as u32;
		idx
	}
}

pub struct Simulation {
	dimensions: u8,
	charge: f64,
	link_distance: f64,
	link_strength: Option<f64>,
	center_strength: f64,
	alpha: f64,
	alpha_decay: f64,
	stopped: bool,
	/// Graph indices of simulated nodes.
	nodes: Vec<usize>,
	/// Local endpoints plus per-link strength and bias.
	links: Vec<(usize, usize, f64, f64)>,
	degree: Vec<u32>,
	positions: Vec<[f64; 3]>,
	tree: Octree,
	stack: Vec<u32>,
}

impl Default for Simulation {
	fn default() -> Self {
		Self::new(3, &ForceParams::default())
	}
}

impl Simulation {
	pub fn new(dimensions: u8, params: &ForceParams) -> Self {
		let mut sim = Self {
			dimensions,
			charge: 0.0,
			link_distance: 0.0,
			link_strength: None,
			center_strength: 0.0,
			alpha: 1.0,
			alpha_decay: 1.0 - ALPHA_MIN.powf(1.0 / 300.0),
			stopped: false,
			nodes: Vec::new(),
			links: Vec::new(),
			degree: Vec::new(),
			positions: Vec::new(),
			tree: Octree::default(),
			stack: Vec::new(),
		};
		sim.configure(dimensions, params);
		sim
	}

	/// Apply a force configuration. Takes effect on the next tick.
	pub fn configure(&mut self, dimensions: u8, params: &ForceParams) {
		self.dimensions = dimensions.clamp(2, 3);
		self.charge = params.repulsion;
		self.link_distance = params.link_distance;
		self.link_strength = params.link_strength;
		self.center_strength = params.center_strength;
		self.recompute_link_weights();
	}

	/// Point the simulation at a new visible subset.
	pub fn bind(&mut self, view: &FilteredGraphData) {
		self.nodes.clone_from(&view.nodes);
		let mut local = std::collections::HashMap::with_capacity(view.nodes.len());
		for (l, &g) in view.nodes.iter().enumerate() {
			local.insert(g, l);
		}
		self.links.clear();
		for link in &view.links {
			if let (Some(&s), Some(&t)) = (local.get(&link.source), local.get(&link.target)) {
				self.links.push((s, t, 0.0, 0.0));
			}
		}
		self.degree.clear();
		self.degree.resize(self.nodes.len(), 0);
		for &(s, t, _, _) in &self.links {
			self.degree[s] += 1;
			self.degree[t] += 1;
		}
		self.recompute_link_weights();
	}

	fn recompute_link_weights(&mut self) {
		for link in &mut self.links {
			let (ds, dt) = (self.degree[link.0] as f64, self.degree[link.1] as f64);
			link.2 = self.link_strength.unwrap_or(1.0 / ds.min(dt).max(1.0));
			link.3 = ds / (ds + dt).max(1.0);
		}
	}

	pub fn reheat(&mut self) {
		self.alpha = 1.0;
		self.stopped = false;
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn dimensions(&self) -> u8 {
		self.dimensions
	}

	pub fn is_settled(&self) -> bool {
		self.stopped
	}

	pub fn tick(&mut self, graph: &mut [GraphNode]) -> TickOutcome {
		if self.stopped {
			return TickOutcome::Idle;
		}
		self.alpha += (0.0 - self.alpha) * self.alpha_decay;

		self.apply_links(graph);
		self.apply_charge(graph);
		self.apply_center(graph);

		let keep = 1.0 - VELOCITY_DECAY;
		let free_z = self.dimensions == 3;
		for &g in &self.nodes {
			let n = &mut graph[g];
			n.vx *= keep;
			n.vy *= keep;
			n.x += n.vx;
			n.y += n.vy;
			if free_z {
				n.vz *= keep;
				n.z += n.vz;
			} else {
				n.vz = 0.0;
			}
		}

		if self.alpha < ALPHA_MIN {
			self.stopped = true;
			TickOutcome::Stopped
		} else {
			TickOutcome::Running
		}
	}

	fn apply_links(&mut self, graph: &mut [GraphNode]) {
		let (alpha, free_z) = (self.alpha, self.dimensions == 3);
		for (k, &(s, t, strength, bias)) in self.links.iter().enumerate() {
			let (gs, gt) = (self.nodes[s], self.nodes[t]);
			let (src, tgt) = (&graph[gs], &graph[gt]);
			let mut dx = tgt.x + tgt.vx - src.x - src.vx;
			let dy = tgt.y + tgt.vy - src.y - src.vy;
			let dz = if free_z {
				tgt.z + tgt.vz - src.z - src.vz
			} else {
				0.0
			};
			if dx == 0.0 {
				dx = jiggle(k);
			}
			let len = (dx * dx + dy * dy + dz * dz).sqrt();
			let l = (len - self.link_distance) / len * alpha * strength;
			let (fx, fy, fz) = (dx * l, dy * l, dz * l);

			let tgt = &mut graph[gt];
			tgt.vx -= fx * bias;
			tgt.vy -= fy * bias;
			tgt.vz -= fz * bias;
			let src = &mut graph[gs];
			src.vx += fx * (1.0 - bias);
			src.vy += fy * (1.0 - bias);
			src.vz += fz * (1.0 - bias);
		}
	}

	fn apply_charge(&mut self, graph: &mut [GraphNode]) {
		let free_z = self.dimensions == 3;
		self.positions.clear();
		self.positions.extend(
			self.nodes
				.iter()
				.map(|&g| [graph[g].x, graph[g].y, if free_z { graph[g].z } else { 0.0 }]),
		);
		self.tree.rebuild(&self.positions);
		if self.tree.cells.is_empty() {
			return;
		}

		let k = self.charge * self.alpha;
		for i in 0..self.nodes.len() {
			let p = self.positions[i];
			let mut v = [0.0; 3];
			self.stack.clear();
			self.stack.push(0);
			while let Some(c) = self.stack.pop() {
				let cell = &self.tree.cells[c as usize];
				if cell.count == 0 {
					continue;
				}
				let n = cell.count as f64;
				let mut d = [0.0; 3];
				(0..3).for_each(|a| d[a] = cell.sum[a] / n - p[a]);
				let l = d[0] * d[0] + d[1] * d[1] + d[2] * d[2];

				if cell.size * cell.size / THETA2 < l {
					let l = if l < DISTANCE_MIN2 { (DISTANCE_MIN2 * l).sqrt() } else { l };
					(0..3).for_each(|a| v[a] += d[a] * k * n / l);
					continue;
				}
				if cell.internal {
					self.stack.extend(cell.children.iter().copied().filter(|&ch| ch != 0));
					continue;
				}

				let mut b = cell.body;
				while b != NONE {
					if b as usize != i {
						let q = self.positions[b as usize];
						let mut d = [q[0] - p[0], q[1] - p[1], q[2] - p[2]];
						if d == [0.0; 3] {
							// Antisymmetric so a coincident pair pushes apart.
							let (lo, hi) = (i.min(b as usize), i.max(b as usize));
							let sign = if i < b as usize { 1.0 } else { -1.0 };
							(0..3).for_each(|a| d[a] = sign * jiggle(lo * 131 + hi * 7 + a));
						}
						let l = d[0] * d[0] + d[1] * d[1] + d[2] * d[2];
						let l = if l < DISTANCE_MIN2 { (DISTANCE_MIN2 * l).sqrt() } else { l };
						(0..3).for_each(|a| v[a] += d[a] * k / l);
					}
					b = self.tree.next[b as usize];
				}
			}
			let n = &mut graph[self.nodes[i]];
			n.vx += v[0];
			n.vy += v[1];
			if free_z {
				n.vz += v[2];
			}
		}
	}

	fn apply_center(&self, graph: &mut [GraphNode]) {
		if self.nodes.is_empty() || self.center_strength == 0.0 {
			return;
		}
		let n = self.nodes.len() as f64;
		let (mut sx, mut sy, mut sz) = (0.0, 0.0, 0.0);
		for &g in &self.nodes {
			sx += graph[g].x;
			sy += graph[g].y;
			sz += graph[g].z;
		}
		let s = self.center_strength;
		let (sx, sy, sz) = (sx / n * s, sy / n * s, sz / n * s);
		let free_z = self.dimensions == 3;
		for &g in &self.nodes {
			let node = &mut graph[g];
			node.x -= sx;
			node.y -= sy;
			if free_z {
				node.z -= sz;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::types::VisibleLink;

	fn chain(n: usize) -> (Vec<GraphNode>, FilteredGraphData) {
		let nodes = (0..n)
			.map(|i| {
				let (x, y, z) = seed_position(i);
				GraphNode {
					x,
					y,
					z,
					..GraphNode::new(i as i64, format!("n{i}"), "Paper")
				}
			})
			.collect();
		let view = FilteredGraphData {
			nodes: (0..n).collect(),
			links: (1..n)
				.map(|i| VisibleLink {
					link: i - 1,
					source: i - 1,
					target: i,
				})
				.collect(),
		};
		(nodes, view)
	}

	fn run_to_stop(sim: &mut Simulation, nodes: &mut [GraphNode]) -> usize {
		let mut stops = 0;
		for _ in 0..1000 {
			if sim.tick(nodes) == TickOutcome::Stopped {
				stops += 1;
			}
		}
		stops
	}

	#[test]
	fn reports_stopped_exactly_once() {
		let (mut nodes, view) = chain(20);
		let mut sim = Simulation::new(3, &ForceParams::default());
		sim.bind(&view);

		assert_eq!(run_to_stop(&mut sim, &mut nodes), 1);
		assert!(sim.is_settled());
		assert_eq!(sim.tick(&mut nodes), TickOutcome::Idle);

		sim.reheat();
		assert_eq!(sim.tick(&mut nodes), TickOutcome::Running);
	}

	#[test]
	fn two_dimensional_mode_never_moves_depth() {
		let (mut nodes, view) = chain(12);
		for (i, n) in nodes.iter_mut().enumerate() {
			n.z = (i % 3) as f64 * 100.0;
		}
		let before: Vec<f64> = nodes.iter().map(|n| n.z).collect();

		let mut sim = Simulation::new(2, &ForceParams::default());
		sim.bind(&view);
		run_to_stop(&mut sim, &mut nodes);

		let after: Vec<f64> = nodes.iter().map(|n| n.z).collect();
		assert_eq!(before, after);
		assert!(nodes.iter().all(|n| n.x.is_finite() && n.y.is_finite()));
	}

	#[test]
	fn repulsion_separates_coincident_nodes() {
		let mut nodes: Vec<GraphNode> = (0..5)
			.map(|i| GraphNode::new(i, "n", "Topic"))
			.collect();
		let view = FilteredGraphData {
			nodes: (0..5).collect(),
			links: vec![],
		};
		let mut sim = Simulation::new(3, &ForceParams::default());
		sim.bind(&view);
		for _ in 0..50 {
			sim.tick(&mut nodes);
		}
		let d = (nodes[0].x - nodes[1].x).hypot(nodes[0].y - nodes[1].y);
		assert!(d > 1.0, "nodes still overlapping: {d}");
	}

	#[test]
	fn links_pull_towards_rest_length() {
		let mut nodes = vec![GraphNode::new(1, "a", "Paper"), GraphNode::new(2, "b", "Paper")];
		nodes[1].x = 400.0;
		let view = FilteredGraphData {
			nodes: vec![0, 1],
			links: vec![VisibleLink {
				link: 0,
				source: 0,
				target: 1,
			}],
		};
		let params = ForceParams {
			repulsion: 0.0,
			..ForceParams::default()
		};
		let mut sim = Simulation::new(3, &params);
		sim.bind(&view);
		run_to_stop(&mut sim, &mut nodes);

		let d = (nodes[1].x - nodes[0].x).abs();
		assert!((d - params.link_distance).abs() < 5.0, "distance {d}");
	}

	#[test]
	fn seeds_are_distinct_and_deterministic() {
		assert_eq!(seed_position(7), seed_position(7));
		assert_ne!(seed_position(1), seed_position(2));
	}
}
