use std::{io, path::PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use super::{Error, Order, Page, PostQuery, Storage};
use crate::model::{
	Comment, CreateCommentInput, CreatePostInput, CreateUserInput, Post, Timestamp,
	UpdatePostInput, UpdateUserInput, User,
};

/// The whole data set, as persisted in a single JSON document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Document {
	#[serde(default)]
	pub users: Vec<User>,
	#[serde(default)]
	pub posts: Vec<Post>,
	#[serde(default)]
	pub comments: Vec<Comment>,
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
	ids.max().map_or(1, |id| id + 1)
}

/// A modification time strictly after `previous`, even if the clock has not moved.
fn touch(previous: Timestamp) -> DateTime<Utc> {
	let now = Utc::now();

	match previous {
		Some(previous) if previous >= now => previous + Duration::microseconds(1),
		_ => now,
	}
}

fn to_usize(value: i64) -> usize {
	usize::try_from(value).unwrap_or(0)
}

impl Document {
	pub fn insert_user(&mut self, user: CreateUserInput) -> Result<User, Error> {
		if self.users.iter().any(|u| u.email == user.email) {
			return Err(Error::EmailTaken);
		}

		let now = Utc::now();
		let user = User {
			id: next_id(self.users.iter().map(|u| u.id)),
			email: user.email,
			name: user.name,
			password: user.password,
			role: user.role,
			created_at: Some(now),
			updated_at: Some(now),
		};

		self.users.push(user.clone());
		Ok(user)
	}

	pub fn update_user(&mut self, id: i64, changes: UpdateUserInput) -> Result<Option<User>, Error> {
		if let Some(email) = &changes.email {
			if self.users.iter().any(|u| u.id != id && &u.email == email) {
				return Err(Error::EmailTaken);
			}
		}

		let Some(user) = self.users.iter_mut().find(|u| u.id == id) else {
			return Ok(None);
		};

		if let Some(email) = changes.email {
			user.email = email;
		}

		if let Some(name) = changes.name {
			user.name = name;
		}

		if let Some(role) = changes.role {
			user.role = role;
		}

		user.updated_at = Some(touch(user.updated_at));

		Ok(Some(user.clone()))
	}

	pub fn set_password(&mut self, id: i64, password: String) -> bool {
		let Some(user) = self.users.iter_mut().find(|u| u.id == id) else {
			return false;
		};

		user.password = password;
		true
	}

	pub fn delete_user(&mut self, id: i64) -> bool {
		let before = self.users.len();
		self.users.retain(|u| u.id != id);

		if self.users.len() == before {
			return false;
		}

		let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.posts)
			.into_iter()
			.partition(|p| p.user_id == id);

		self.posts = kept;
		self.comments
			.retain(|c| c.user_id != id && !removed.iter().any(|p| p.id == c.post_id));

		true
	}

	pub fn list_posts(&self, query: &PostQuery) -> Page<Post> {
		let mut matching = self
			.posts
			.iter()
			.filter(|post| query.matches(post))
			.collect::<Vec<_>>();

		matching.sort_by_key(|post| (post.effective_date(), post.id));

		if query.order == Order::Desc {
			matching.reverse();
		}

		let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
		let items = matching
			.into_iter()
			.skip(to_usize(query.offset))
			.take(to_usize(query.limit))
			.cloned()
			.collect();

		Page { total, items }
	}

	pub fn insert_post(&mut self, user_id: i64, post: CreatePostInput) -> Result<Post, Error> {
		if !self.users.iter().any(|u| u.id == user_id) {
			return Err(Error::UnknownUser(user_id));
		}

		let now = Utc::now();
		let post = Post {
			id: next_id(self.posts.iter().map(|p| p.id)),
			user_id,
			title: post.title,
			body: post.body,
			created_at: Some(now),
			updated_at: Some(now),
		};

		self.posts.push(post.clone());
		Ok(post)
	}

	pub fn update_post(&mut self, id: i64, changes: UpdatePostInput) -> Option<Post> {
		let post = self.posts.iter_mut().find(|p| p.id == id)?;

		if let Some(title) = changes.title {
			post.title = title;
		}

		if let Some(body) = changes.body {
			post.body = body;
		}

		post.updated_at = Some(touch(post.effective_date()));

		Some(post.clone())
	}

	pub fn delete_post(&mut self, id: i64) -> bool {
		let before = self.posts.len();
		self.posts.retain(|p| p.id != id);

		if self.posts.len() == before {
			return false;
		}

		self.comments.retain(|c| c.post_id != id);
		true
	}

	pub fn list_comments(&self, post_id: i64) -> Vec<Comment> {
		let mut comments = self
			.comments
			.iter()
			.filter(|c| c.post_id == post_id)
			.cloned()
			.collect::<Vec<_>>();

		comments.sort_by_key(|c| (c.created_at, c.id));
		comments
	}

	pub fn insert_comment(
		&mut self,
		user_id: i64,
		comment: CreateCommentInput,
	) -> Result<Comment, Error> {
		if !self.posts.iter().any(|p| p.id == comment.post_id) {
			return Err(Error::UnknownPost(comment.post_id));
		}

		if !self.users.iter().any(|u| u.id == user_id) {
			return Err(Error::UnknownUser(user_id));
		}

		let now = Utc::now();
		let comment = Comment {
			id: next_id(self.comments.iter().map(|c| c.id)),
			post_id: comment.post_id,
			user_id,
			body: comment.body,
			created_at: Some(now),
			updated_at: Some(now),
		};

		self.comments.push(comment.clone());
		Ok(comment)
	}

	pub fn delete_comment(&mut self, id: i64) -> bool {
		let before = self.comments.len();
		self.comments.retain(|c| c.id != id);

		self.comments.len() != before
	}
}

/// Where a [`DocumentStore`] keeps its document.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
	async fn load(&self) -> Result<Document, Error>;
	async fn save(&self, document: &Document) -> Result<(), Error>;
}

/// Keeps the document in a JSON file.
pub struct FileBackend {
	path: PathBuf,
}

impl FileBackend {
	pub fn new(path: PathBuf) -> Self {
		Self { path }
	}
}

#[async_trait::async_trait]
impl Backend for FileBackend {
	async fn load(&self) -> Result<Document, Error> {
		match tokio::fs::read(&self.path).await {
			Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
			Err(error) if error.kind() == io::ErrorKind::NotFound => {
				tracing::debug!(path = %self.path.display(), "document does not exist yet, starting empty");

				Ok(Document::default())
			}
			Err(error) => Err(error.into()),
		}
	}

	async fn save(&self, document: &Document) -> Result<(), Error> {
		let json = serde_json::to_vec_pretty(document)?;
		let staging = self.path.with_extension("tmp");

		// readers either see the old or the new document, never half of one
		tokio::fs::write(&staging, json).await?;
		tokio::fs::rename(&staging, &self.path).await?;

		Ok(())
	}
}

/// Keeps the document in memory, for tests and throwaway instances.
#[derive(Default)]
pub struct MemoryBackend {
	document: RwLock<Document>,
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
	async fn load(&self) -> Result<Document, Error> {
		Ok(self.document.read().await.clone())
	}

	async fn save(&self, document: &Document) -> Result<(), Error> {
		*self.document.write().await = document.clone();

		Ok(())
	}
}

/// A [`Storage`] that reads the whole [`Document`] for every operation and writes it
/// back after every modification.
///
/// Modifications are serialized within the process. Several processes sharing one
/// file can still overwrite each other's changes.
pub struct DocumentStore<B> {
	backend: B,
	lock: Mutex<()>,
}

impl<B: Backend> DocumentStore<B> {
	pub fn new(backend: B) -> Self {
		Self {
			backend,
			lock: Mutex::new(()),
		}
	}

	async fn read(&self) -> Result<Document, Error> {
		self.backend.load().await
	}

	async fn modify<R, F>(&self, f: F) -> Result<R, Error>
	where
		F: FnOnce(&mut Document) -> Result<R, Error> + Send,
		R: Send,
	{
		let _guard = self.lock.lock().await;
		let mut document = self.backend.load().await?;
		let result = f(&mut document)?;

		self.backend.save(&document).await?;
		Ok(result)
	}
}

#[async_trait::async_trait]
impl<B: Backend> Storage for DocumentStore<B> {
	async fn list_users(&self) -> Result<Vec<User>, Error> {
		let mut users = self.read().await?.users;

		users.sort_by_key(|u| u.id);
		Ok(users)
	}

	async fn find_user(&self, id: i64) -> Result<Option<User>, Error> {
		Ok(self.read().await?.users.into_iter().find(|u| u.id == id))
	}

	async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
		Ok(self
			.read()
			.await?
			.users
			.into_iter()
			.find(|u| u.email == email))
	}

	async fn insert_user(&self, user: CreateUserInput) -> Result<User, Error> {
		self.modify(|document| document.insert_user(user)).await
	}

	async fn update_user(&self, id: i64, changes: UpdateUserInput) -> Result<Option<User>, Error> {
		self.modify(|document| document.update_user(id, changes))
			.await
	}

	async fn set_password(&self, id: i64, password: String) -> Result<bool, Error> {
		self.modify(|document| Ok(document.set_password(id, password)))
			.await
	}

	async fn delete_user(&self, id: i64) -> Result<bool, Error> {
		self.modify(|document| Ok(document.delete_user(id))).await
	}

	async fn list_posts(&self, query: &PostQuery) -> Result<Page<Post>, Error> {
		Ok(self.read().await?.list_posts(query))
	}

	async fn find_post(&self, id: i64) -> Result<Option<Post>, Error> {
		Ok(self.read().await?.posts.into_iter().find(|p| p.id == id))
	}

	async fn insert_post(&self, user_id: i64, post: CreatePostInput) -> Result<Post, Error> {
		self.modify(|document| document.insert_post(user_id, post))
			.await
	}

	async fn update_post(&self, id: i64, changes: UpdatePostInput) -> Result<Option<Post>, Error> {
		self.modify(|document| Ok(document.update_post(id, changes)))
			.await
	}

	async fn delete_post(&self, id: i64) -> Result<bool, Error> {
		self.modify(|document| Ok(document.delete_post(id))).await
	}

	async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, Error> {
		Ok(self.read().await?.list_comments(post_id))
	}

	async fn find_comment(&self, id: i64) -> Result<Option<Comment>, Error> {
		Ok(self.read().await?.comments.into_iter().find(|c| c.id == id))
	}

	async fn insert_comment(
		&self,
		user_id: i64,
		comment: CreateCommentInput,
	) -> Result<Comment, Error> {
		self.modify(|document| document.insert_comment(user_id, comment))
			.await
	}

	async fn delete_comment(&self, id: i64) -> Result<bool, Error> {
		self.modify(|document| Ok(document.delete_comment(id))).await
	}
}
