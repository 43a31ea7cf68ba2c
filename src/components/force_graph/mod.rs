mod api;
mod camera;
mod component;
mod config;
mod controls;
mod factory;
mod filter;
mod gesture;
mod layout;
mod mode;
mod palette;
mod render;
mod selection;
mod simulation;
mod state;
mod store;
mod types;

pub use api::{FetchError, GraphSource};
pub use component::ForceGraph3d;
pub use config::{AxisRange, ForceParams, GraphConfig, LayerOrdering};
pub use controls::GraphControls;
pub use mode::ForceMode;
pub use types::{GraphData, GraphLink, GraphNode, NodeId};
