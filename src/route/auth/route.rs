use axum::extract::State;
use macros::route;

use crate::{extract::Json, openapi::tag, password, AppState};

use super::{model, Error, RouteError};

/// Replaces a legacy hash after a successful login. Failures only cost the
/// upgrade, never the login.
async fn rehash(state: &AppState, id: i64, password: &str) {
	let hash = match password::hash(&state.hasher, password) {
		Ok(hash) => hash,
		Err(error) => {
			tracing::warn!(%error, user = id, "failed to rehash legacy password");
			return;
		}
	};

	match state.store.set_password(id, hash).await {
		Ok(true) => tracing::info!(user = id, "upgraded legacy password hash"),
		Ok(false) => {}
		Err(error) => tracing::warn!(%error, user = id, "failed to store rehashed password"),
	}
}

/// Log in
/// Exchanges an email and password for a bearer token.
#[route(tag = tag::AUTH, response(status = 200, description = "Logged in successfully.", shape = "Json<model::Session>"))]
pub async fn login(
	State(state): State<AppState>,
	Json(input): Json<model::LoginInput>,
) -> Result<Json<model::Session>, RouteError> {
	let Some(user) = state.store.find_user_by_email(&input.email).await? else {
		password::verify_absent(&state.hasher, &input.password);

		return Err(Error::InvalidCredentials.into());
	};

	if !password::verify(&state.hasher, &input.password, &user.password).map_err(Error::Hash)? {
		return Err(Error::InvalidCredentials.into());
	}

	if password::needs_rehash(&user.password) {
		rehash(&state, user.id, &input.password).await;
	}

	let access_token = state.keys.issue(&user).map_err(Error::Token)?;

	tracing::info!(user = user.id, "logged in");

	Ok(Json(model::Session {
		access_token,
		user: user.into(),
	}))
}
