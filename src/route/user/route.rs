use axum::extract::State;
use macros::route;

use crate::{
	extract::{Admin, Json, Path},
	openapi::tag,
	password,
	response::{Created, NoContent},
	route::model::IdInput,
	store, AppState, Store,
};

use super::{model, Error, RouteError};

fn map_email_taken(error: store::Error) -> RouteError {
	match error {
		store::Error::EmailTaken => Error::EmailTaken.into(),
		error => error.into(),
	}
}

/// List users
/// Returns every user ordered by id, without their password hashes.
#[route(tag = tag::USER)]
pub async fn list_users(
	State(store): State<Store>,
	Admin(_): Admin,
) -> Result<Json<Vec<model::SafeUser>>, RouteError> {
	let users = store.list_users().await?;

	Ok(Json(users.into_iter().map(model::SafeUser::from).collect()))
}

/// Create user
/// Creates a new user. The password is stored as a salted argon2 hash.
#[route(tag = tag::USER)]
pub async fn create_user(
	State(state): State<AppState>,
	Admin(admin): Admin,
	Json(mut input): Json<model::CreateUserInput>,
) -> Result<Created<model::SafeUser>, RouteError> {
	input.password = password::hash(&state.hasher, &input.password).map_err(Error::Hash)?;

	let user = state
		.store
		.insert_user(input)
		.await
		.map_err(map_email_taken)?;

	tracing::info!(user = user.id, admin = admin.id, "created user");

	Ok(Created(user.into()))
}

/// Update user
/// Updates the name, email or role of a user.
#[route(tag = tag::USER)]
pub async fn update_user(
	State(store): State<Store>,
	Admin(_): Admin,
	Path(IdInput { id }): Path<IdInput>,
	Json(input): Json<model::UpdateUserInput>,
) -> Result<Json<model::SafeUser>, RouteError> {
	let user = store
		.update_user(id, input)
		.await
		.map_err(map_email_taken)?
		.ok_or(Error::UnknownUser(id))?;

	Ok(Json(user.into()))
}

/// Delete user
/// Deletes a user along with their posts, the comments on those posts and their own comments.
/// Admins cannot delete their own account.
#[route(tag = tag::USER)]
pub async fn delete_user(
	State(store): State<Store>,
	Admin(admin): Admin,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<NoContent, RouteError> {
	if admin.id == id {
		return Err(Error::SelfDelete.into());
	}

	if !store.delete_user(id).await? {
		return Err(Error::UnknownUser(id).into());
	}

	tracing::info!(user = id, admin = admin.id, "deleted user");

	Ok(NoContent)
}

/// List authors
/// Returns the public profile of every user, sorted by name.
#[route(tag = tag::USER)]
pub async fn list_authors(
	State(store): State<Store>,
) -> Result<Json<Vec<model::Author>>, RouteError> {
	let mut authors = store
		.list_users()
		.await?
		.into_iter()
		.map(model::Author::from)
		.collect::<Vec<_>>();

	authors.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

	Ok(Json(authors))
}
