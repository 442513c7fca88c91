//! Persistence for users, posts and comments.
//!
//! Handlers only ever see the [`Storage`] trait, so the same routes run on top of
//! a JSON document ([`DocumentStore`]) or PostgreSQL ([`PgStore`]).

mod document;
mod postgres;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Deserialize;

pub use document::{DocumentStore, FileBackend, MemoryBackend};
pub use postgres::PgStore;

use crate::{
	config::StorageConfig,
	model::{
		Comment, CreateCommentInput, CreatePostInput, CreateUserInput, Post, UpdatePostInput,
		UpdateUserInput, User,
	},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
	#[error("malformed document: {0}")]
	Document(#[from] serde_json::Error),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("migration error: {0}")]
	Migrate(#[from] sqlx::migrate::MigrateError),
	#[error("email already taken")]
	EmailTaken,
	#[error("user {0} does not exist")]
	UnknownUser(i64),
	#[error("post {0} does not exist")]
	UnknownPost(i64),
}

/// Sort direction for post listings, by effective date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Order {
	Asc,
	#[default]
	Desc,
}

/// Filters, ordering and paging for a post listing.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
	/// Case-insensitive substring of the title or body. Never empty.
	pub search: Option<String>,
	pub user_id: Option<i64>,
	/// Inclusive lower bound on the effective date.
	pub from: Option<DateTime<Utc>>,
	/// Inclusive upper bound on the effective date.
	pub to: Option<DateTime<Utc>>,
	pub order: Order,
	pub offset: i64,
	pub limit: i64,
}

impl PostQuery {
	/// Whether the post passes every filter. Ordering and paging are not considered.
	pub fn matches(&self, post: &Post) -> bool {
		if self.user_id.is_some_and(|user_id| post.user_id != user_id) {
			return false;
		}

		if let Some(search) = &self.search {
			let search = search.to_lowercase();

			if !post.title.to_lowercase().contains(&search)
				&& !post.body.to_lowercase().contains(&search)
			{
				return false;
			}
		}

		if self.from.is_none() && self.to.is_none() {
			return true;
		}

		// posts without any timestamp cannot fall inside a date range
		let Some(date) = post.effective_date() else {
			return false;
		};

		!(self.from.is_some_and(|from| date < from) || self.to.is_some_and(|to| date > to))
	}
}

/// A slice of a listing, along with the number of items matching before slicing.
#[derive(Debug)]
pub struct Page<T> {
	pub total: i64,
	pub items: Vec<T>,
}

/// Storage for every entity of the application.
///
/// Deleting a user or post also deletes everything that depends on it, so
/// callers never have to clean up after a delete.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
	/// Lists every user, ordered by id.
	async fn list_users(&self) -> Result<Vec<User>, Error>;
	async fn find_user(&self, id: i64) -> Result<Option<User>, Error>;
	async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;
	/// Inserts a new user. The `password` must already be hashed.
	///
	/// Returns [`Error::EmailTaken`] if another user has the same email.
	async fn insert_user(&self, user: CreateUserInput) -> Result<User, Error>;
	/// Applies the changes that are set, returning `None` if the user does not exist.
	///
	/// Returns [`Error::EmailTaken`] if another user has the new email.
	async fn update_user(&self, id: i64, changes: UpdateUserInput) -> Result<Option<User>, Error>;
	/// Replaces the stored password hash, returning `false` if the user does not exist.
	async fn set_password(&self, id: i64, password: String) -> Result<bool, Error>;
	/// Deletes a user, their posts, the comments on those posts and their own comments.
	async fn delete_user(&self, id: i64) -> Result<bool, Error>;

	async fn list_posts(&self, query: &PostQuery) -> Result<Page<Post>, Error>;
	async fn find_post(&self, id: i64) -> Result<Option<Post>, Error>;
	/// Inserts a post owned by `user_id`.
	///
	/// Returns [`Error::UnknownUser`] if the owner no longer exists.
	async fn insert_post(&self, user_id: i64, post: CreatePostInput) -> Result<Post, Error>;
	/// Applies the changes that are set and bumps `updated_at`, returning `None` if the post does not exist.
	async fn update_post(&self, id: i64, changes: UpdatePostInput) -> Result<Option<Post>, Error>;
	/// Deletes a post and its comments.
	async fn delete_post(&self, id: i64) -> Result<bool, Error>;

	/// Lists the comments of a post, oldest first.
	async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, Error>;
	async fn find_comment(&self, id: i64) -> Result<Option<Comment>, Error>;
	/// Inserts a comment by `user_id`, checking both references in the same write.
	///
	/// Returns [`Error::UnknownPost`] if the post does not exist and
	/// [`Error::UnknownUser`] if the author no longer exists.
	async fn insert_comment(
		&self,
		user_id: i64,
		comment: CreateCommentInput,
	) -> Result<Comment, Error>;
	async fn delete_comment(&self, id: i64) -> Result<bool, Error>;
}

/// Opens the store described by the configuration.
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn Storage>, Error> {
	let store: Arc<dyn Storage> = match config {
		StorageConfig::Postgres(url) => Arc::new(PgStore::connect(url).await?),
		StorageConfig::File(path) => Arc::new(DocumentStore::new(FileBackend::new(path.clone()))),
		StorageConfig::Memory => Arc::new(DocumentStore::new(MemoryBackend::default())),
	};

	Ok(store)
}
