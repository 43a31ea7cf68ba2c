//! Graph source client. Uses the browser fetch API with an abort signal so a
//! superseded request stops before its body is decoded.

use thiserror::Error;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortSignal, Request, RequestInit, RequestMode, Response};

use super::types::RawGraph;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum FetchError {
	/// The fetch promise rejected: network down, DNS, or a CORS refusal.
	#[error("network or CORS failure: {0}")]
	Transport(String),
	#[error("server answered HTTP {status}")]
	Http { status: u16 },
	#[error("could not decode graph payload: {0}")]
	Decode(String),
	#[error("request aborted")]
	Aborted,
}

/// Where the graph comes from: `endpoint?query_param=<query>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphSource {
	pub endpoint: String,
	pub query_param: String,
}

impl GraphSource {
	pub fn new(endpoint: impl Into<String>, query_param: impl Into<String>) -> Self {
		Self {
			endpoint: endpoint.into(),
			query_param: query_param.into(),
		}
	}

	pub fn url_for(&self, query: &str) -> String {
		let encoded: String = js_sys::encode_uri_component(query).into();
		let sep = if self.endpoint.contains('?') { '&' } else { '?' };
		format!("{}{}{}={}", self.endpoint, sep, self.query_param, encoded)
	}

	pub async fn fetch(&self, query: &str, signal: &AbortSignal) -> Result<RawGraph, FetchError> {
		let url = self.url_for(query);

		let opts = RequestInit::new();
		opts.set_method("GET");
		opts.set_mode(RequestMode::Cors);
		opts.set_signal(Some(signal));

		let request = Request::new_with_str_and_init(&url, &opts)
			.map_err(|e| FetchError::Transport(format!("{:?}", e)))?;
		let window = web_sys::window().ok_or_else(|| FetchError::Transport("no window".into()))?;

		let resp_value = JsFuture::from(window.fetch_with_request(&request))
			.await
			.map_err(|e| rejected(signal, e))?;
		let resp: Response = resp_value
			.dyn_into()
			.map_err(|_| FetchError::Transport("response is not a Response".into()))?;

		if !resp.ok() {
			return Err(FetchError::Http {
				status: resp.status(),
			});
		}

		let text = JsFuture::from(resp.text().map_err(|e| rejected(signal, e))?)
			.await
			.map_err(|e| rejected(signal, e))?;
		if signal.aborted() {
			return Err(FetchError::Aborted);
		}
		let body = text
			.as_string()
			.ok_or_else(|| FetchError::Decode("body is not text".into()))?;

		serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
	}
}

fn rejected(signal: &AbortSignal, err: wasm_bindgen::JsValue) -> FetchError {
	if signal.aborted() {
		FetchError::Aborted
	} else {
		FetchError::Transport(format!("{:?}", err))
	}
}
