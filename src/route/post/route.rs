use axum::extract::State;
use macros::route;

use crate::{
	extract::{Identity, Json, Path, Query},
	openapi::tag,
	response::{Created, NoContent, Paginated},
	route::{
		model::{ExpandInput, IdInput, Paginate},
		user_map,
	},
	store, Store,
};

use super::{model, Error, RouteError};

/// List posts
/// Returns a page of posts matching the filters, newest first unless `order=asc`.
/// The number of posts matching before pagination is sent in the `X-Total-Count` header.
#[route(tag = tag::POST)]
pub async fn list_posts(
	State(store): State<Store>,
	Query(paginate): Query<Paginate>,
	Query(expand): Query<ExpandInput>,
	Query(filter): Query<model::ListPostsInput>,
) -> Result<Paginated<model::PostView>, RouteError> {
	let page = store.list_posts(&filter.into_query(&paginate)).await?;
	let users = if expand.user() {
		Some(user_map(&store).await?)
	} else {
		None
	};

	Ok(Paginated {
		total: page.total,
		items: page
			.items
			.into_iter()
			.map(|post| model::PostView::new(post, users.as_ref()))
			.collect(),
	})
}

/// Get single post
/// Returns a single post by its unique id.
#[route(tag = tag::POST)]
pub async fn get_post(
	State(store): State<Store>,
	Path(IdInput { id }): Path<IdInput>,
	Query(expand): Query<ExpandInput>,
) -> Result<Json<model::PostView>, RouteError> {
	let post = store.find_post(id).await?.ok_or(Error::UnknownPost(id))?;
	let users = if expand.user() {
		Some(user_map(&store).await?)
	} else {
		None
	};

	Ok(Json(model::PostView::new(post, users.as_ref())))
}

/// Create post
/// Creates a new post owned by the authenticated user.
#[route(tag = tag::POST)]
pub async fn create_post(
	State(store): State<Store>,
	identity: Identity,
	Json(input): Json<model::CreatePostInput>,
) -> Result<Created<model::Post>, RouteError> {
	let post = store
		.insert_post(identity.id, input)
		.await
		.map_err(|error| match error {
			store::Error::UnknownUser(..) => Error::UnknownAuthor.into(),
			error => RouteError::from(error),
		})?;

	tracing::info!(post = post.id, user = identity.id, "created post");

	Ok(Created(post))
}

/// Update post
/// Updates the title or body of a post. Only its author or an admin can do this.
#[route(tag = tag::POST)]
pub async fn update_post(
	State(store): State<Store>,
	identity: Identity,
	Path(IdInput { id }): Path<IdInput>,
	Json(input): Json<model::UpdatePostInput>,
) -> Result<Json<model::Post>, RouteError> {
	let post = store.find_post(id).await?.ok_or(Error::UnknownPost(id))?;

	if !identity.can_modify(post.user_id) {
		return Err(Error::NotOwner.into());
	}

	let post = store
		.update_post(id, input)
		.await?
		.ok_or(Error::UnknownPost(id))?;

	Ok(Json(post))
}

/// Delete post
/// Deletes a post along with its comments. Only its author or an admin can do this.
#[route(tag = tag::POST)]
pub async fn delete_post(
	State(store): State<Store>,
	identity: Identity,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<NoContent, RouteError> {
	let post = store.find_post(id).await?.ok_or(Error::UnknownPost(id))?;

	if !identity.can_modify(post.user_id) {
		return Err(Error::NotOwner.into());
	}

	if !store.delete_post(id).await? {
		return Err(Error::UnknownPost(id).into());
	}

	tracing::info!(post = id, user = identity.id, "deleted post");

	Ok(NoContent)
}
