use leptos::prelude::*;
use leptos_router::hooks::{use_navigate, use_query_map};
use log::info;

use crate::components::force_graph::{ForceGraph3d, GraphControls, GraphNode, GraphSource};

const GRAPH_ENDPOINT: &str = "/api/graph";
const QUERY_PARAM: &str = "q";

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let query_map = use_query_map();
	let query = Signal::derive(move || query_map.with(|m| m.get(QUERY_PARAM).unwrap_or_default()));
	let dark = RwSignal::new(true);
	let controls = GraphControls::new();

	// Activating a paper re-centres the graph on it.
	let navigate_to = RwSignal::new(None::<String>);
	let navigate = use_navigate();
	Effect::new(move |_| {
		if let Some(slug) = navigate_to.get() {
			navigate(&format!("/?{QUERY_PARAM}={slug}"), Default::default());
		}
	});
	let on_node_activated = Callback::new(move |node: GraphNode| {
		info!("opening {} ({})", node.name, node.id);
		navigate_to.set(Some(node.slug.unwrap_or_else(|| node.id.to_string())));
	});

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph" class:dark=move || dark.get()>
				<ForceGraph3d
					source=GraphSource::new(GRAPH_ENDPOINT, QUERY_PARAM)
					query=query
					dark=dark
					controls=controls
					on_node_activated=on_node_activated
				/>
				<div class="graph-overlay" data-graph-chrome="">
					<h1>"Research Graph"</h1>
					<p class="subtitle">
						"Click the scene to steer it, Esc to give scrolling back to the page."
					</p>
					<button on:click=move |_| dark.update(|d| *d = !*d)>"Toggle theme"</button>
					<button on:click=move |_| controls.highlight_nodes_by_type(Some("Author"))>
						"Highlight authors"
					</button>
					<button on:click=move |_| controls.highlight_nodes_by_type(None)>
						"Clear highlight"
					</button>
					<button on:click=move |_| controls.pulse_nodes_by_type(Some("Paper"))>
						"Pulse papers"
					</button>
				</div>
			</div>
		</ErrorBoundary>
	}
}
