use aide::axum::{
	routing::{get_with, patch_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown_user")]
	UnknownUser(i64),
	#[error("email_taken")]
	EmailTaken,
	#[error("self_delete")]
	SelfDelete,
	#[error("failed to hash password: {0}")]
	Hash(argon2::password_hash::Error),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(list_users, list_users_docs).post_with(create_user, create_user_docs),
		)
		.api_route(
			"/:id",
			patch_with(update_user, update_user_docs).delete_with(delete_user, delete_user_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownUser(..) => StatusCode::NOT_FOUND,
			Self::EmailTaken | Self::SelfDelete => StatusCode::BAD_REQUEST,
			Self::Hash(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		match self {
			Self::UnknownUser(user) => error::Message::new("unknown_user")
				.content("The user does not exist.")
				.detail("user", user),
			Self::EmailTaken => error::Message::new("email_taken")
				.content("A user with this email already exists.")
				.field("email"),
			Self::SelfDelete => {
				error::Message::new("self_delete").content("You cannot delete your own account.")
			}
			Self::Hash(..) => error::Message::new("internal_error").content("internal server error"),
		}
		.into_vec()
	}
}
