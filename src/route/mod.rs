use std::collections::HashMap;

use aide::axum::{routing::get_with, ApiRouter};
use axum::{http::StatusCode, routing::get, Json};

use crate::{
	error::{ErrorResponse, Message},
	model::SafeUser,
	store, AppState, Store,
};

pub mod auth;
pub mod comment;
pub mod docs;
pub mod model;
pub mod post;
pub mod user;

pub fn routes() -> ApiRouter<AppState> {
	ApiRouter::new()
		.route("/", get(index))
		.merge(auth::routes())
		.nest("/posts", post::routes())
		.nest("/comments", comment::routes())
		.nest("/users", user::routes())
		.api_route(
			"/authors",
			get_with(user::route::list_authors, user::route::list_authors_docs),
		)
}

async fn index() -> &'static str {
	"Poster API is running"
}

/// Responds to any unknown route.
pub async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
	(
		StatusCode::NOT_FOUND,
		Json(ErrorResponse::new(
			Message::new("not_found")
				.content("The requested resource does not exist.")
				.into_vec(),
		)),
	)
}

/// Every user by id, for embedding authors with `_expand=user`.
pub async fn user_map(store: &Store) -> Result<HashMap<i64, SafeUser>, store::Error> {
	Ok(store
		.list_users()
		.await?
		.into_iter()
		.map(|user| (user.id, SafeUser::from(user)))
		.collect())
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_index() {
		let app = TestApp::new();
		let response = app.server.get("/").await;

		assert_eq!(response.status_code(), StatusCode::OK);
		assert_eq!(response.text(), "Poster API is running");
	}

	#[tokio::test]
	async fn test_not_found() {
		let app = TestApp::new();
		let response = app.server.get("/nothing/here").await;

		assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
		assert_eq!(response.json::<Value>()["errors"][0]["code"], "not_found");
	}

	#[tokio::test]
	async fn test_cors_exposes_total_count() {
		let app = TestApp::new();
		let response = app
			.server
			.get("/posts")
			.add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:5173"))
			.await;

		assert_eq!(response.header("access-control-allow-origin"), "*");
		assert!(response
			.header("access-control-expose-headers")
			.to_str()
			.unwrap()
			.contains("x-total-count"));
	}

	#[tokio::test]
	async fn test_docs() {
		let app = TestApp::new();
		let response = app.server.get("/docs/api.json").await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let api = response.json::<Value>();

		assert_eq!(api["info"]["title"], "Poster API");
		assert!(api["paths"].get("/login").is_some());
		assert!(api["paths"].get("/authors").is_some());
	}
}
