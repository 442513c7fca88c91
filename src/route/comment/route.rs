use axum::extract::State;
use macros::route;

use crate::{
	extract::{Identity, Json, Path, Query},
	openapi::tag,
	response::{Created, NoContent},
	route::{
		model::{ExpandInput, IdInput},
		user_map,
	},
	store, Store,
};

use super::{model, Error, RouteError};

/// List comments
/// Returns the comments of a post, oldest first.
#[route(tag = tag::COMMENT)]
pub async fn list_comments(
	State(store): State<Store>,
	Query(input): Query<model::ListCommentsInput>,
	Query(expand): Query<ExpandInput>,
) -> Result<Json<Vec<model::CommentView>>, RouteError> {
	let comments = store.list_comments(input.post_id).await?;
	let users = if expand.user() {
		Some(user_map(&store).await?)
	} else {
		None
	};

	Ok(Json(
		comments
			.into_iter()
			.map(|comment| model::CommentView::new(comment, users.as_ref()))
			.collect(),
	))
}

/// Create comment
/// Leaves a comment on an existing post as the authenticated user.
#[route(tag = tag::COMMENT)]
pub async fn create_comment(
	State(store): State<Store>,
	identity: Identity,
	Json(input): Json<model::CreateCommentInput>,
) -> Result<Created<model::Comment>, RouteError> {
	let comment = store
		.insert_comment(identity.id, input)
		.await
		.map_err(|error| match error {
			store::Error::UnknownPost(post) => Error::UnknownPost(post).into(),
			store::Error::UnknownUser(..) => Error::UnknownAuthor.into(),
			error => RouteError::from(error),
		})?;

	Ok(Created(comment))
}

/// Delete comment
/// Deletes a comment. Only its author or an admin can do this.
#[route(tag = tag::COMMENT)]
pub async fn delete_comment(
	State(store): State<Store>,
	identity: Identity,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<NoContent, RouteError> {
	let comment = store
		.find_comment(id)
		.await?
		.ok_or(Error::UnknownComment(id))?;

	if !identity.can_modify(comment.user_id) {
		return Err(Error::NotAuthor.into());
	}

	if !store.delete_comment(id).await? {
		return Err(Error::UnknownComment(id).into());
	}

	Ok(NoContent)
}
