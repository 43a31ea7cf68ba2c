use glam::{DMat4, DVec3};
use web_sys::CanvasRenderingContext2d;

use super::camera::CameraController;
use super::factory::{OpacityRules, Primitive};
use super::mode::ForceMode;
use super::state::{ForceGraphState, SceneNode};

const LINK_WIDTH: f64 = 1.0;
const LABEL_FONT: &str = "12px sans-serif";
const GUIDE_FONT: &str = "11px sans-serif";

pub fn render(state: &mut ForceGraphState, ctx: &CanvasRenderingContext2d, now: f64) {
	let (w, h) = (state.width, state.height);
	ctx.set_fill_style_str(state.theme.background());
	ctx.fill_rect(0.0, 0.0, w, h);

	let vp = state.camera.view_projection(w / h.max(1.0));
	draw_guides(state, ctx, &vp);
	draw_links(state, ctx, &vp);
	project_scene(state, &vp);
	draw_nodes(state, ctx, now);
	draw_label(state, ctx);
}

fn draw_guides(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, vp: &DMat4) {
	let (w, h) = (state.width, state.height);
	let bound = state.config.axis.bound();
	let camera = &state.camera;
	let marks = state.modes.guide_marks();
	if marks.is_empty() {
		return;
	}

	ctx.set_stroke_style_str(state.theme.guide());
	ctx.set_fill_style_str(state.theme.guide());
	ctx.set_line_width(1.0);
	ctx.set_font(GUIDE_FONT);
	for mark in marks {
		let from = DVec3::new(-bound, 0.0, mark.position);
		let to = DVec3::new(bound, 0.0, mark.position);
		let (Some(a), Some(b)) = (camera.project(vp, from, w, h), camera.project(vp, to, w, h)) else {
			continue;
		};
		ctx.begin_path();
		ctx.move_to(a.x, a.y);
		ctx.line_to(b.x, b.y);
		ctx.stroke();
		let _ = ctx.fill_text(&mark.label, a.x + 4.0, a.y - 4.0);
	}
}

fn draw_links(state: &mut ForceGraphState, ctx: &CanvasRenderingContext2d, vp: &DMat4) {
	let (w, h) = (state.width, state.height);
	let highlight = state.selection.highlighted_type();
	let nodes = &state.store.graph().nodes;
	let links = &state.store.graph().links;

	ctx.set_line_width(LINK_WIDTH);
	for l in &state.view.links {
		let (s, t) = (&nodes[l.source], &nodes[l.target]);
		let (Some(a), Some(b)) = (
			state.camera.project(vp, DVec3::new(s.x, s.y, s.z), w, h),
			state.camera.project(vp, DVec3::new(t.x, t.y, t.z), w, h),
		) else {
			continue;
		};
		let link = &links[l.link];
		let dimmed = highlight.is_some_and(|h| h != s.node_type && h != t.node_type);
		let material = state.factory.link_material(&link.color, dimmed);
		ctx.set_stroke_style_str(&material.css);
		ctx.begin_path();
		ctx.move_to(a.x, a.y);
		ctx.line_to(b.x, b.y);
		ctx.stroke();
	}
}

/// Fill the reused scene buffer, far to near.
fn project_scene(state: &mut ForceGraphState, vp: &DMat4) {
	let (w, h) = (state.width, state.height);
	let nodes = &state.store.graph().nodes;
	let camera: &CameraController = &state.camera;
	state.scene.clear();
	state.scene.extend(state.view.nodes.iter().filter_map(|&i| {
		let n = &nodes[i];
		camera
			.project(vp, DVec3::new(n.x, n.y, n.z), w, h)
			.map(|at| SceneNode { index: i, at })
	}));
	state.scene.sort_by(|a, b| b.at.depth.total_cmp(&a.at.depth));
}

fn draw_nodes(state: &mut ForceGraphState, ctx: &CanvasRenderingContext2d, now: f64) {
	let rules = OpacityRules {
		time_mode: state.modes.mode() == ForceMode::Time,
		highlight: state.selection.highlighted_type(),
	};
	let nodes = &state.store.graph().nodes;
	for s in &state.scene {
		let node = &nodes[s.index];
		let look = state.selection.render_state(node, now);
		let object = state.factory.object_for(node, look, rules);
		for part in object.parts() {
			fill_ring(ctx, part, s);
		}
	}
}

fn fill_ring(ctx: &CanvasRenderingContext2d, part: &Primitive, s: &SceneNode) {
	let mut ring = part.geometry.ring.iter();
	let Some(&(x0, y0)) = ring.next() else {
		return;
	};
	ctx.set_fill_style_str(&part.material.css);
	ctx.begin_path();
	ctx.move_to(s.at.x + x0 * s.at.scale, s.at.y + y0 * s.at.scale);
	for &(x, y) in ring {
		ctx.line_to(s.at.x + x * s.at.scale, s.at.y + y * s.at.scale);
	}
	ctx.close_path();
	ctx.fill();
}

/// Name of the selected node, else the hovered one.
fn draw_label(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let Some(id) = state.selection.selected().or(state.selection.hovered()) else {
		return;
	};
	let nodes = &state.store.graph().nodes;
	let Some(s) = state.scene.iter().find(|s| nodes[s.index].id == id) else {
		return;
	};
	let node = &nodes[s.index];
	let offset = state.factory.base_radius(node) * s.at.scale + 4.0;
	ctx.set_font(LABEL_FONT);
	ctx.set_fill_style_str(state.theme.foreground());
	let _ = ctx.fill_text(&node.name, s.at.x + offset, s.at.y + 4.0);
}
