use aide::axum::{routing::post_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid credentials")]
	InvalidCredentials,
	#[error("missing or invalid authorization header")]
	MissingToken,
	#[error("invalid or expired token")]
	InvalidToken,
	#[error("admin privileges required")]
	Forbidden,
	#[error("password hashing error: {0}")]
	Hash(argon2::password_hash::Error),
	#[error("token signing error: {0}")]
	Token(jsonwebtoken::errors::Error),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new().api_route("/login", post_with(login, login_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::InvalidCredentials => StatusCode::BAD_REQUEST,
			Self::MissingToken | Self::InvalidToken => StatusCode::UNAUTHORIZED,
			Self::Forbidden => StatusCode::FORBIDDEN,
			Self::Hash(..) | Self::Token(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let message = match self {
			Self::InvalidCredentials => error::Message::new("invalid_credentials"),
			Self::MissingToken => error::Message::new("missing_token"),
			Self::InvalidToken => error::Message::new("invalid_token"),
			Self::Forbidden => error::Message::new("forbidden"),
			Self::Hash(..) | Self::Token(..) => {
				return error::Message::new("internal_error")
					.content("internal server error")
					.into_vec()
			}
		};

		message.content(self.to_string()).into_vec()
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use axum_test::TestServer;
	use chrono::{Duration, Utc};

	use crate::{
		model::Role,
		route::auth::model::Session,
		store::{DocumentStore, FileBackend},
		test::*,
	};

	#[tokio::test]
	async fn test_login_flow() {
		let app = TestApp::new();
		let (jonas, _) = app.user("Jonas", Role::Worker).await;

		let response = app
			.server
			.post("/login")
			.json(&json!({ "email": jonas.email, "password": PASSWORD }))
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let body = response.json::<Value>();

		assert_eq!(body["user"]["name"], "Jonas");
		assert!(body["user"].get("password").is_none());

		let session = response.json::<Session>();
		let claims = app.state.keys.verify(&session.access_token).unwrap();

		assert_eq!(claims.id, jonas.id);
		assert_eq!(claims.role, Role::Worker);

		let response = app
			.server
			.post("/posts")
			.add_header(header::AUTHORIZATION, bearer(&session.access_token))
			.json(&json!({ "title": "Hello", "body": "World" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::CREATED);
	}

	#[tokio::test]
	async fn test_login_failures_are_indistinguishable() {
		let app = TestApp::new();
		let (jonas, _) = app.user("Jonas", Role::Worker).await;

		let wrong_password = app
			.server
			.post("/login")
			.json(&json!({ "email": jonas.email, "password": "wrong" }))
			.await;

		let unknown_email = app
			.server
			.post("/login")
			.json(&json!({ "email": "nobody@poster.com", "password": PASSWORD }))
			.await;

		assert_eq!(wrong_password.status_code(), StatusCode::BAD_REQUEST);
		assert_eq!(unknown_email.status_code(), StatusCode::BAD_REQUEST);
		assert_eq!(wrong_password.text(), unknown_email.text());
		assert_eq!(wrong_password.json::<Value>()["message"], "invalid credentials");

		let missing = app
			.server
			.post("/login")
			.json(&json!({ "email": jonas.email }))
			.await;

		assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);

		let empty = app
			.server
			.post("/login")
			.json(&json!({ "email": jonas.email, "password": "" }))
			.await;

		assert_eq!(empty.status_code(), StatusCode::BAD_REQUEST);
	}

	#[tokio::test]
	async fn test_login_upgrades_legacy_hash() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("db.json");
		let legacy = bcrypt::hash(PASSWORD, 4).unwrap();

		std::fs::write(
			&path,
			json!({
				"users": [{
					"id": 1,
					"email": "admin@poster.com",
					"name": "Admin",
					"password": legacy,
					"role": "admin",
				}],
			})
			.to_string(),
		)
		.unwrap();

		let state = crate::State {
			store: Arc::new(DocumentStore::new(FileBackend::new(path))),
			..state()
		};
		let server = TestServer::new(crate::app(state.clone())).unwrap();

		let wrong = server
			.post("/login")
			.json(&json!({ "email": "admin@poster.com", "password": "wrong" }))
			.await;

		assert_eq!(wrong.status_code(), StatusCode::BAD_REQUEST);

		let user = state.store.find_user(1).await.unwrap().unwrap();

		assert_eq!(user.password, legacy);

		for _ in 0..2 {
			let response = server
				.post("/login")
				.json(&json!({ "email": "admin@poster.com", "password": PASSWORD }))
				.await;

			assert_eq!(response.status_code(), StatusCode::OK);
			assert_eq!(response.json::<Value>()["user"]["role"], "admin");
		}

		let user = state.store.find_user(1).await.unwrap().unwrap();

		assert!(user.password.starts_with("$argon2"));
	}

	#[tokio::test]
	async fn test_expired_token_rejected() {
		let app = TestApp::new();
		let (jonas, _) = app.user("Jonas", Role::Worker).await;
		let token = app
			.state
			.keys
			.issue_at(&jonas, Utc::now() - Duration::hours(3))
			.unwrap();

		let response = app
			.server
			.post("/posts")
			.add_header(header::AUTHORIZATION, bearer(&token))
			.json(&json!({ "title": "Hello", "body": "World" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
	}

	#[tokio::test]
	async fn test_malformed_header_rejected() {
		let app = TestApp::new();

		let response = app
			.server
			.post("/posts")
			.add_header(header::AUTHORIZATION, HeaderValue::from_static("Token abc"))
			.json(&json!({ "title": "Hello", "body": "World" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
		assert_eq!(
			response.json::<Value>()["errors"][0]["code"],
			"missing_token"
		);
	}

	/// Create a worker, log in, post, get rejected deleting as another worker,
	/// then delete as an admin with the comments going along with the post.
	#[tokio::test]
	async fn test_worker_scenario() {
		let app = TestApp::new();
		let (_, admin) = app.user("Admin", Role::Admin).await;
		let (_, other) = app.user("Mia", Role::Worker).await;

		let response = app
			.server
			.post("/users")
			.add_header(header::AUTHORIZATION, admin.clone())
			.json(&json!({
				"name": "Jonas",
				"email": "jonas@poster.com",
				"password": "hunter2hunter",
				"role": "worker",
			}))
			.await;

		assert_eq!(response.status_code(), StatusCode::CREATED);

		let session = app
			.server
			.post("/login")
			.json(&json!({ "email": "jonas@poster.com", "password": "hunter2hunter" }))
			.await
			.json::<Session>();

		assert_eq!(
			app.state.keys.verify(&session.access_token).unwrap().role,
			Role::Worker
		);

		let token = bearer(&session.access_token);
		let post = app
			.server
			.post("/posts")
			.add_header(header::AUTHORIZATION, token.clone())
			.json(&json!({ "title": "Hello", "body": "World" }))
			.await
			.json::<Value>();
		let post_id = post["id"].as_i64().unwrap();

		let response = app
			.server
			.post("/comments")
			.add_header(header::AUTHORIZATION, token)
			.json(&json!({ "postId": post_id, "body": "First!" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::CREATED);

		let response = app
			.server
			.delete(&format!("/posts/{post_id}"))
			.add_header(header::AUTHORIZATION, other)
			.await;

		assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

		let response = app
			.server
			.delete(&format!("/posts/{post_id}"))
			.add_header(header::AUTHORIZATION, admin)
			.await;

		assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
		assert!(app.state.store.list_comments(post_id).await.unwrap().is_empty());
	}
}
