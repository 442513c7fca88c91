#![warn(clippy::pedantic)]

mod config;
mod error;
mod extract;
mod model;
mod openapi;
mod password;
mod response;
mod route;
mod seed;
mod session;
mod store;
#[cfg(test)]
mod test;
mod trace;

use std::{net::SocketAddr, sync::Arc};

use aide::openapi::OpenApi;
use argon2::Argon2;
use axum::{
	extract::Request,
	http::{header, HeaderName},
	Extension, Router, ServiceExt,
};
use tower::Layer;
use tower_http::{
	compression::CompressionLayer,
	cors::{Any, CorsLayer},
	normalize_path::NormalizePathLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};

pub type Store = Arc<dyn store::Storage>;
pub type AppState = State;

static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// The shared application state.
///
/// The store is behind a trait object so the same handlers run on every
/// storage backend.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub store: Store,
	pub hasher: Argon2<'static>,
	pub keys: session::Keys,
}

/// Builds the application with every route, the API docs and the HTTP layers.
pub fn app(state: State) -> Router {
	let mut api = OpenApi::default();

	route::routes()
		.nest("/docs", route::docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.fallback(route::not_found)
		.with_state(state)
		.layer(CompressionLayer::new())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any)
				.expose_headers([response::X_TOTAL_COUNT.clone(), header::CONTENT_LENGTH]),
		)
		.layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER.clone()))
		.layer(TraceLayer::new_for_http().on_response(trace::RecordLatency))
		.layer(SetRequestIdLayer::new(REQUEST_ID_HEADER.clone(), MakeRequestUuid))
}

#[tokio::main]
async fn main() {
	dotenvy::dotenv().ok();

	let config = config::Config::from_env().expect("invalid configuration");
	let _guard = trace::init_tracing_subscriber(config.otlp_endpoint.as_deref())
		.expect("failed to initialize tracing");

	if config.jwt_secret == config::DEV_JWT_SECRET {
		tracing::warn!("JWT_SECRET is not set, using the development secret");
	}

	let store = store::open(&config.storage)
		.await
		.expect("failed to open the store");

	let state = State {
		store,
		hasher: Argon2::default(),
		keys: session::Keys::new(config.jwt_secret.as_bytes()),
	};

	if let Some(admin) = &config.admin {
		seed::bootstrap_admin(&state.store, &state.hasher, admin)
			.await
			.expect("failed to create the admin account");
	}

	let app = NormalizePathLayer::trim_trailing_slash().layer(app(state));
	let address = SocketAddr::new(config.host, config.port);

	let listener = tokio::net::TcpListener::bind(address)
		.await
		.expect("failed to bind to port");

	tracing::info!(%address, storage = config.storage.kind(), "listening");

	axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.expect("server error");
}

async fn shutdown_signal() {
	if let Err(error) = tokio::signal::ctrl_c().await {
		tracing::error!(%error, "failed to listen for shutdown signal");
	}

	tracing::info!("shutting down");
}
