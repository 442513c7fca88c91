//! Helpers shared by the tests of every module.

use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use axum::extract::rejection::QueryRejection;
pub use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde::de::DeserializeOwned;
pub use serde_json::{json, Value};

use crate::{
	model::{Comment, CreateCommentInput, CreatePostInput, CreateUserInput, Post, Role, User},
	password, session,
	store::{DocumentStore, MemoryBackend},
	State,
};

/// The password of every user created by [`TestApp::user`].
pub const PASSWORD: &str = "hunter2hunter";

/// An argon2 hasher that is cheap enough to run in every test.
pub fn hasher() -> Argon2<'static> {
	let params = Params::new(8, 1, 1, None).expect("valid argon2 parameters");

	Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Application state backed by an empty in-memory store.
pub fn state() -> State {
	State {
		store: Arc::new(DocumentStore::new(MemoryBackend::default())),
		hasher: hasher(),
		keys: session::Keys::new(b"test-secret"),
	}
}

/// Deserializes a query string the same way the `Query` extractor does.
pub fn parse_query<T: DeserializeOwned>(query: &str) -> Result<T, QueryRejection> {
	let uri = format!("/?{query}").parse().expect("valid uri");

	axum::extract::Query::try_from_uri(&uri).map(|query| query.0)
}

/// An `Authorization` header value for the token.
pub fn bearer(token: &str) -> HeaderValue {
	HeaderValue::from_str(&format!("Bearer {token}")).expect("valid header value")
}

pub struct TestApp {
	pub server: TestServer,
	pub state: State,
}

impl TestApp {
	pub fn new() -> Self {
		let state = state();
		let server = TestServer::new(crate::app(state.clone())).expect("test server");

		Self { server, state }
	}

	/// Creates a user with [`PASSWORD`], returning it along with a bearer header.
	pub async fn user(&self, name: &str, role: Role) -> (User, HeaderValue) {
		let user = self
			.state
			.store
			.insert_user(CreateUserInput {
				email: format!("{}@poster.com", name.to_lowercase()),
				name: name.into(),
				password: password::hash(&self.state.hasher, PASSWORD).unwrap(),
				role,
			})
			.await
			.unwrap();

		let token = self.state.keys.issue(&user).unwrap();

		(user, bearer(&token))
	}

	pub async fn post(&self, user_id: i64, title: &str) -> Post {
		self.state
			.store
			.insert_post(
				user_id,
				CreatePostInput {
					title: title.into(),
					body: format!("The body of {title}"),
				},
			)
			.await
			.unwrap()
	}

	pub async fn comment(&self, user_id: i64, post_id: i64, body: &str) -> Comment {
		self.state
			.store
			.insert_comment(
				user_id,
				CreateCommentInput {
					post_id,
					body: body.into(),
				},
			)
			.await
			.unwrap()
	}
}
