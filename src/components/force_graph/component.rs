use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::{NaiveDate, Utc};
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, error, warn};
use wasm_bindgen::prelude::*;
use web_sys::{
	AbortController, CanvasRenderingContext2d, Element, HtmlCanvasElement, KeyboardEvent,
	MouseEvent, ResizeObserver, WheelEvent, Window,
};

use super::api::GraphSource;
use super::config::GraphConfig;
use super::controls::GraphControls;
use super::mode::ForceMode;
use super::render;
use super::state::{ClickOutcome, ForceGraphState, LegendEntry};
use super::store::LoadOutcome;
use super::types::GraphNode;

/// UI chrome marker; clicks inside it never capture scroll.
const CHROME_SELECTOR: &str = "[data-graph-chrome]";
const TIME_ZOOM_IN: f64 = 0.8;

type SharedState = Rc<RefCell<ForceGraphState>>;

fn today() -> NaiveDate {
	Utc::now().date_naive()
}

/// Copyable handle to the engine plus the reactive mirrors the chrome reads.
#[derive(Clone, Copy)]
struct Ui {
	graph: StoredValue<SharedState, LocalStorage>,
	legend: RwSignal<Vec<LegendEntry>>,
	mode: RwSignal<ForceMode>,
	loading: RwSignal<bool>,
	error: RwSignal<Option<String>>,
	captured: RwSignal<bool>,
}

impl Ui {
	fn with_state<R>(&self, f: impl FnOnce(&mut ForceGraphState) -> R) -> Option<R> {
		self.graph.try_with_value(|s| f(&mut s.borrow_mut()))
	}

	/// Run `f`, then refresh the chrome.
	fn update<R>(&self, f: impl FnOnce(&mut ForceGraphState) -> R) -> Option<R> {
		let out = self.with_state(f);
		self.sync();
		out
	}

	fn sync(&self) {
		let Some((legend, mode, loading, error, captured)) = self.graph.try_with_value(|s| {
			let s = s.borrow();
			(
				s.legend(),
				s.mode(),
				s.is_loading(),
				s.error().map(ToString::to_string),
				s.is_captured(),
			)
		}) else {
			return;
		};
		if self.legend.with_untracked(|l| *l != legend) {
			self.legend.set(legend);
		}
		if self.mode.get_untracked() != mode {
			self.mode.set(mode);
		}
		if self.loading.get_untracked() != loading {
			self.loading.set(loading);
		}
		if self.error.with_untracked(|e| *e != error) {
			self.error.set(error);
		}
		if self.captured.get_untracked() != captured {
			self.captured.set(captured);
		}
	}
}

/// Browser resources released on unmount.
#[derive(Default)]
struct Listeners {
	resize: Option<Closure<dyn FnMut()>>,
	observer: Option<(ResizeObserver, Closure<dyn FnMut()>)>,
	keydown: Option<Closure<dyn FnMut(KeyboardEvent)>>,
}

struct Teardown {
	state: SharedState,
	listeners: Rc<RefCell<Listeners>>,
	animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
	frame_id: Rc<Cell<Option<i32>>>,
}

impl Teardown {
	fn run(&self) {
		let window = web_sys::window();
		if let (Some(win), Some(id)) = (&window, self.frame_id.take()) {
			let _ = win.cancel_animation_frame(id);
		}
		self.animate.borrow_mut().take();

		let mut l = self.listeners.borrow_mut();
		if let Some(cb) = l.resize.take() {
			if let Some(win) = &window {
				let _ = win.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
		if let Some(cb) = l.keydown.take() {
			if let Some(win) = &window {
				let _ = win.remove_event_listener_with_callback("keydown", cb.as_ref().unchecked_ref());
			}
		}
		if let Some((observer, _cb)) = l.observer.take() {
			observer.disconnect();
		}
		drop(l);

		self.state.borrow_mut().dispose();
		debug!("force graph torn down");
	}
}

fn fit_canvas(canvas: &HtmlCanvasElement, container: &Element, state: &RefCell<ForceGraphState>) {
	let (w, h) = (
		container.client_width().max(1) as f64,
		container.client_height().max(1) as f64,
	);
	canvas.set_width(w as u32);
	canvas.set_height(h as u32);
	state.borrow_mut().resize(w, h);
}

fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?;
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn in_chrome(ev: &MouseEvent) -> bool {
	ev.target()
		.and_then(|t| t.dyn_into::<Element>().ok())
		.and_then(|el| el.closest(CHROME_SELECTOR).ok().flatten())
		.is_some()
}

/// 3D force-directed graph fed from a JSON graph source.
#[component]
pub fn ForceGraph3d(
	/// Where to fetch the graph from.
	source: GraphSource,
	/// Query value; every change cancels the running load and starts another.
	#[prop(into)]
	query: Signal<String>,
	/// Dark background and light contrast colors when `true`.
	#[prop(into)]
	dark: Signal<bool>,
	#[prop(optional)] config: Option<GraphConfig>,
	/// Imperative highlight/pulse commands from the host.
	#[prop(optional)]
	controls: Option<GraphControls>,
	/// Fired when a node of the primary type is clicked.
	#[prop(optional, into)]
	on_node_activated: Option<Callback<GraphNode>>,
) -> impl IntoView {
	let container_ref = NodeRef::<leptos::html::Div>::new();
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

	let state: SharedState = Rc::new(RefCell::new(ForceGraphState::new(
		config.unwrap_or_default(),
		800.0,
		600.0,
		js_sys::Date::now(),
	)));
	let ui = Ui {
		graph: StoredValue::new_local(state.clone()),
		legend: RwSignal::new(Vec::new()),
		mode: RwSignal::new(ForceMode::Free),
		loading: RwSignal::new(false),
		error: RwSignal::new(None),
		captured: RwSignal::new(false),
	};
	let listeners: Rc<RefCell<Listeners>> = Rc::default();
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let frame_id: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));

	// Single-flight load per query value.
	Effect::new(move |_| {
		let q = query.get();
		let controller = match AbortController::new() {
			Ok(c) => c,
			Err(e) => {
				error!("cannot create AbortController: {:?}", e);
				return;
			}
		};
		let signal = controller.signal();
		let Some(ticket) = ui.update(|s| s.begin_load(Box::new(controller))) else {
			return;
		};
		let source = source.clone();
		spawn_local(async move {
			let result = source.fetch(&q, &signal).await;
			let outcome = ui.with_state(|s| s.finish_load(ticket, result, js_sys::Date::now(), today()));
			debug!("load for {q:?}: {outcome:?}");
			if outcome.is_some_and(|o| o != LoadOutcome::Stale) {
				ui.sync();
			}
		});
	});

	Effect::new(move |_| {
		let d = dark.get();
		ui.with_state(|s| s.set_theme(d));
	});

	if let Some(controls) = controls {
		let highlight = controls.highlight();
		Effect::new(move |_| {
			let t = highlight.get();
			ui.with_state(|s| s.highlight_external(t));
		});
		let pulse = controls.pulse();
		Effect::new(move |_| {
			let req = pulse.get();
			if req.seq > 0 {
				ui.with_state(|s| s.pulse(req.node_type.as_deref(), js_sys::Date::now()));
			}
		});
	}

	let (state_init, listeners_init, animate_init, frame_init) =
		(state.clone(), listeners.clone(), animate.clone(), frame_id.clone());
	Effect::new(move |_| {
		let (Some(canvas), Some(container)) = (canvas_ref.get(), container_ref.get()) else {
			return;
		};
		if animate_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas;
		let container: Element = container.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let ctx: CanvasRenderingContext2d = match canvas.get_context("2d") {
			Ok(Some(obj)) => match obj.dyn_into() {
				Ok(ctx) => ctx,
				Err(_) => {
					error!("2d context has an unexpected type");
					return;
				}
			},
			_ => {
				error!("2d canvas context unavailable");
				return;
			}
		};
		fit_canvas(&canvas, &container, &state_init);

		let mut l = listeners_init.borrow_mut();

		let (state_resize, canvas_resize, container_resize) =
			(state_init.clone(), canvas.clone(), container.clone());
		let on_resize: Closure<dyn FnMut()> =
			Closure::new(move || fit_canvas(&canvas_resize, &container_resize, &state_resize));
		match ResizeObserver::new(on_resize.as_ref().unchecked_ref()) {
			Ok(observer) => {
				observer.observe(&container);
				l.observer = Some((observer, on_resize));
			}
			Err(e) => warn!("ResizeObserver unavailable, relying on window resize: {:?}", e),
		}

		let (state_resize, canvas_resize, container_resize) =
			(state_init.clone(), canvas.clone(), container.clone());
		let on_window_resize: Closure<dyn FnMut()> =
			Closure::new(move || fit_canvas(&canvas_resize, &container_resize, &state_resize));
		let _ = window
			.add_event_listener_with_callback("resize", on_window_resize.as_ref().unchecked_ref());
		l.resize = Some(on_window_resize);

		let on_keydown: Closure<dyn FnMut(KeyboardEvent)> = Closure::new(move |ev: KeyboardEvent| {
			if ev.key() == "Escape" && ui.update(|s| s.release_gesture()) == Some(true) {
				debug!("scroll released");
			}
		});
		let _ = window.add_event_listener_with_callback("keydown", on_keydown.as_ref().unchecked_ref());
		l.keydown = Some(on_keydown);
		drop(l);

		let (state_anim, animate_inner, frame_inner) =
			(state_init.clone(), animate_init.clone(), frame_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let now = js_sys::Date::now();
			{
				let mut s = state_anim.borrow_mut();
				s.frame(now);
				render::render(&mut s, &ctx, now);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				let win: Option<Window> = web_sys::window();
				if let Some(id) = win.and_then(|w| w.request_animation_frame(cb.as_ref().unchecked_ref()).ok()) {
					frame_inner.set(Some(id));
				}
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
				frame_init.set(Some(id));
			}
		}
	});

	let teardown = StoredValue::new_local(Teardown {
		state,
		listeners,
		animate,
		frame_id,
	});
	on_cleanup(move || {
		teardown.try_with_value(Teardown::run);
	});

	let on_mousedown = move |ev: MouseEvent| {
		if let Some((x, y)) = canvas_point(canvas_ref, &ev) {
			ui.with_state(|s| s.pointer_down(x, y));
		}
	};
	let on_mousemove = move |ev: MouseEvent| {
		if let Some((x, y)) = canvas_point(canvas_ref, &ev) {
			ui.with_state(|s| s.pointer_move(x, y, js_sys::Date::now()));
		}
	};
	let on_mouseup = move |_: MouseEvent| {
		ui.with_state(|s| s.pointer_up());
	};
	let on_mouseleave = move |_: MouseEvent| {
		ui.with_state(|s| s.pointer_leave(js_sys::Date::now()));
	};
	let on_wheel = move |ev: WheelEvent| {
		if ui.with_state(|s| s.wheel(ev.delta_y())) == Some(true) {
			ev.prevent_default();
		}
	};
	let on_click = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		let chrome = in_chrome(&ev);
		if let Some(ClickOutcome::Navigate(node)) =
			ui.update(|s| s.click_at(x, y, js_sys::Date::now(), chrome))
		{
			debug!("activating {} #{}", node.node_type, node.id);
			if let Some(cb) = on_node_activated {
				cb.run(node);
			}
		}
	};

	view! {
		<div
			node_ref=container_ref
			class="force-graph-3d"
			style="position: relative; width: 100%; height: 100%; overflow: hidden;"
			on:click=on_click
		>
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				class:captured=move || ui.captured.get()
				style="display: block;"
			/>
			<div class="graph-chrome" data-graph-chrome="">
				<div class="graph-modes">
					{ForceMode::ALL
						.into_iter()
						.map(|m| {
							view! {
								<button
									class="graph-mode"
									class:active=move || ui.mode.get() == m
									on:click=move |_| {
										ui.update(|s| s.set_mode(m, today()));
									}
								>
									{m.label()}
								</button>
							}
						})
						.collect_view()}
					<Show when=move || ui.mode.get() == ForceMode::Time>
						<button
							class="graph-time-zoom"
							on:click=move |_| {
								ui.with_state(|s| s.zoom_time(TIME_ZOOM_IN, today()));
							}
						>
							"+"
						</button>
						<button
							class="graph-time-zoom"
							on:click=move |_| {
								ui.with_state(|s| s.zoom_time(1.0 / TIME_ZOOM_IN, today()));
							}
						>
							"−"
						</button>
					</Show>
				</div>
				<ul class="graph-legend" on:mouseleave=move |_| {
					ui.with_state(|s| s.highlight_ui(None));
				}>
					{move || {
						ui.legend
							.get()
							.into_iter()
							.map(|entry| legend_row(ui, entry))
							.collect_view()
					}}
				</ul>
				<Show when=move || ui.captured.get()>
					<button
						class="graph-release"
						on:click=move |_| {
							ui.update(|s| s.release_gesture());
						}
					>
						"Release scroll (Esc)"
					</button>
				</Show>
			</div>
			<Show when=move || ui.loading.get()>
				<div class="graph-status">"Loading graph…"</div>
			</Show>
			{move || ui.error.get().map(|e| view! { <div class="graph-status graph-error">{e}</div> })}
		</div>
	}
}

fn legend_row(ui: Ui, entry: LegendEntry) -> impl IntoView {
	let (toggle_type, hover_type) = (entry.node_type.clone(), entry.node_type.clone());
	view! {
		<li
			class="graph-legend-item"
			on:mouseenter=move |_| {
				ui.with_state(|s| s.highlight_ui(Some(hover_type.clone())));
			}
		>
			<label>
				<input
					type="checkbox"
					prop:checked=entry.enabled
					on:change=move |ev| {
						let enabled = event_target_checked(&ev);
						ui.update(|s| s.set_type_enabled(&toggle_type, enabled, today()));
					}
				/>
				<span class="graph-legend-swatch" style=format!("background-color: {}", entry.color)></span>
				<span>{entry.node_type.clone()}</span>
				<span class="graph-legend-count">{format!("({})", entry.count)}</span>
			</label>
		</li>
	}
}
