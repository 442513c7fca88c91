use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown_post")]
	UnknownPost(i64),
	#[error("not_owner")]
	NotOwner,
	#[error("unknown_author")]
	UnknownAuthor,
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(list_posts, list_posts_docs).post_with(create_post, create_post_docs),
		)
		.api_route(
			"/:id",
			get_with(get_post, get_post_docs)
				.patch_with(update_post, update_post_docs)
				.delete_with(delete_post, delete_post_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) => StatusCode::NOT_FOUND,
			Self::NotOwner => StatusCode::FORBIDDEN,
			Self::UnknownAuthor => StatusCode::UNAUTHORIZED,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let message = error::Message::new(self.to_string());

		match self {
			Self::UnknownPost(post) => message
				.content("The post does not exist.")
				.detail("post", post),
			Self::NotOwner => message.content("Only the author or an admin can modify this post."),
			Self::UnknownAuthor => message.content("The account behind this token no longer exists."),
		}
		.into_vec()
	}
}
