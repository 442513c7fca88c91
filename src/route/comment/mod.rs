use aide::axum::{
	routing::{delete_with, get_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown_comment")]
	UnknownComment(i64),
	#[error("unknown_post")]
	UnknownPost(i64),
	#[error("not_author")]
	NotAuthor,
	#[error("unknown_author")]
	UnknownAuthor,
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(list_comments, list_comments_docs)
				.post_with(create_comment, create_comment_docs),
		)
		.api_route("/:id", delete_with(delete_comment, delete_comment_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownComment(..) | Self::UnknownPost(..) => StatusCode::NOT_FOUND,
			Self::NotAuthor => StatusCode::FORBIDDEN,
			Self::UnknownAuthor => StatusCode::UNAUTHORIZED,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let message = error::Message::new(self.to_string());

		match self {
			Self::UnknownComment(comment) => message
				.content("The comment does not exist.")
				.detail("comment", comment),
			Self::UnknownPost(post) => message
				.content("The post does not exist.")
				.field("postId")
				.detail("post", post),
			Self::NotAuthor => {
				message.content("Only the author or an admin can delete this comment.")
			}
			Self::UnknownAuthor => message.content("The account behind this token no longer exists."),
		}
		.into_vec()
	}
}

#[cfg(test)]
mod test {
	use crate::{model::Role, test::*};

	#[tokio::test]
	async fn test_list_comments() {
		let app = TestApp::new();
		let (jonas, _) = app.user("Jonas", Role::Worker).await;
		let post = app.post(jonas.id, "Hello").await;
		let other = app.post(jonas.id, "Other").await;

		let first = app.comment(jonas.id, post.id, "First!").await;
		let second = app.comment(jonas.id, post.id, "Second!").await;
		app.comment(jonas.id, other.id, "Elsewhere").await;

		let response = app
			.server
			.get("/comments")
			.add_query_param("postId", post.id)
			.add_query_param("_expand", "user")
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let comments = response.json::<Vec<Value>>();

		assert_eq!(comments.len(), 2);
		assert_eq!(comments[0]["id"], first.id);
		assert_eq!(comments[1]["id"], second.id);
		assert_eq!(comments[0]["postId"], post.id);
		assert_eq!(comments[0]["user"]["name"], "Jonas");
	}

	#[tokio::test]
	async fn test_list_comments_requires_post_id() {
		let app = TestApp::new();

		let response = app.server.get("/comments").await;

		assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

		let response = app
			.server
			.get("/comments")
			.add_query_param("postId", "abc")
			.await;

		assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
	}

	#[tokio::test]
	async fn test_create_comment() {
		let app = TestApp::new();
		let (jonas, token) = app.user("Jonas", Role::Worker).await;
		let post = app.post(jonas.id, "Hello").await;

		let response = app
			.server
			.post("/comments")
			.add_header(header::AUTHORIZATION, token.clone())
			.json(&json!({ "postId": 999, "body": "Into the void" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
		assert_eq!(response.json::<Value>()["errors"][0]["code"], "unknown_post");

		let response = app
			.server
			.post("/comments")
			.add_header(header::AUTHORIZATION, token.clone())
			.json(&json!({ "postId": post.id, "body": "" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

		let response = app
			.server
			.post("/comments")
			.add_header(header::AUTHORIZATION, token.clone())
			.json(&json!({ "postId": 0, "body": "Zero" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
		assert_eq!(response.json::<Value>()["errors"][0]["field"], "postId");

		let response = app
			.server
			.post("/comments")
			.add_header(header::AUTHORIZATION, token.clone())
			.json(&json!({ "postId": post.id, "content": "Wrong field" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

		let response = app
			.server
			.post("/comments")
			.add_header(header::AUTHORIZATION, token)
			.json(&json!({ "postId": post.id, "body": "Nice post!" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::CREATED);

		let comment = response.json::<Value>();

		assert_eq!(comment["userId"], jonas.id);
		assert_eq!(comment["body"], "Nice post!");
	}

	#[tokio::test]
	async fn test_create_comment_after_account_deleted() {
		let app = TestApp::new();
		let (jonas, _) = app.user("Jonas", Role::Worker).await;
		let (mia, token) = app.user("Mia", Role::Worker).await;
		let post = app.post(jonas.id, "Hello").await;

		assert!(app.state.store.delete_user(mia.id).await.unwrap());

		let response = app
			.server
			.post("/comments")
			.add_header(header::AUTHORIZATION, token)
			.json(&json!({ "postId": post.id, "body": "From beyond" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
		assert_eq!(response.json::<Value>()["errors"][0]["code"], "unknown_author");
		assert!(app.state.store.list_comments(post.id).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_delete_comment_permissions() {
		let app = TestApp::new();
		let (jonas, jonas_token) = app.user("Jonas", Role::Worker).await;
		let (_, mia) = app.user("Mia", Role::Worker).await;
		let (_, admin) = app.user("Admin", Role::Admin).await;
		let post = app.post(jonas.id, "Hello").await;
		let first = app.comment(jonas.id, post.id, "First!").await;
		let second = app.comment(jonas.id, post.id, "Second!").await;

		let response = app
			.server
			.delete(&format!("/comments/{}", first.id))
			.add_header(header::AUTHORIZATION, mia)
			.await;

		assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

		let response = app
			.server
			.delete(&format!("/comments/{}", first.id))
			.add_header(header::AUTHORIZATION, jonas_token)
			.await;

		assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

		let response = app
			.server
			.delete(&format!("/comments/{}", second.id))
			.add_header(header::AUTHORIZATION, admin.clone())
			.await;

		assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

		let response = app
			.server
			.delete(&format!("/comments/{}", second.id))
			.add_header(header::AUTHORIZATION, admin)
			.await;

		assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
	}
}
