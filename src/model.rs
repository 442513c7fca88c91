use chrono::{DateTime, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Timestamps are optional because records written by older versions of the
/// JSON document may not carry them.
pub type Timestamp = Option<DateTime<Utc>>;

/// What a user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
	/// Manages users and can modify anything.
	Admin,
	/// Can only modify their own posts and comments.
	Worker,
}

/// A single user, as stored.
///
/// This includes the password hash, so it must never be returned to a client.
/// Use [`SafeUser`] or [`Author`] for that.
#[model]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
pub struct User {
	/// The unique identifier of the user.
	#[model(skip)]
	pub id: i64,
	/// The user's email address, used for logging in.
	#[validate(email)]
	pub email: String,
	/// The name that is displayed to other users.
	#[validate(length(min = 1, max = 128))]
	pub name: String,
	/// The user's password. Only ever stored as an argon2 hash.
	#[model(create_only)]
	#[validate(length(min = 1, max = 128))]
	pub password: String,
	/// The role of the user.
	pub role: Role,
	/// The creation time of the user.
	#[model(skip)]
	#[serde(default)]
	pub created_at: Timestamp,
	/// The last time the user was modified.
	#[model(skip)]
	#[serde(default)]
	pub updated_at: Timestamp,
}

/// A user without any secrets, safe to return to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SafeUser {
	pub id: i64,
	pub email: String,
	pub name: String,
	pub role: Role,
	pub created_at: Timestamp,
	pub updated_at: Timestamp,
}

impl From<User> for SafeUser {
	fn from(user: User) -> Self {
		Self {
			id: user.id,
			email: user.email,
			name: user.name,
			role: user.role,
			created_at: user.created_at,
			updated_at: user.updated_at,
		}
	}
}

/// The public view of a user, as listed on `/authors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Author {
	pub id: i64,
	pub name: String,
	pub email: String,
}

impl From<User> for Author {
	fn from(user: User) -> Self {
		Self {
			id: user.id,
			name: user.name,
			email: user.email,
		}
	}
}

/// A single post, created by a user.
#[model]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
pub struct Post {
	/// The unique identifier of the post.
	#[model(skip)]
	pub id: i64,
	/// The user that created the post.
	#[model(skip)]
	#[serde(rename = "userId")]
	pub user_id: i64,
	/// The title of the post.
	#[validate(length(min = 1))]
	pub title: String,
	/// The content of the post.
	#[validate(length(min = 1))]
	pub body: String,
	/// The creation time of the post.
	#[model(skip)]
	#[serde(default)]
	pub created_at: Timestamp,
	/// The last time the post was modified.
	#[model(skip)]
	#[serde(default)]
	pub updated_at: Timestamp,
}

impl Post {
	/// The date used for sorting and date filters.
	pub fn effective_date(&self) -> Timestamp {
		effective_date(self.created_at, self.updated_at)
	}
}

/// The later of the two timestamps, or whichever one is present.
pub fn effective_date(created_at: Timestamp, updated_at: Timestamp) -> Timestamp {
	match (created_at, updated_at) {
		(Some(created_at), Some(updated_at)) => Some(created_at.max(updated_at)),
		(created_at, updated_at) => created_at.or(updated_at),
	}
}

/// A comment left on a post.
#[model(create)]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
pub struct Comment {
	/// The unique identifier of the comment.
	#[model(skip)]
	pub id: i64,
	/// The post that the comment belongs to.
	#[serde(rename = "postId")]
	#[validate(range(min = 1))]
	pub post_id: i64,
	/// The user that wrote the comment.
	#[model(skip)]
	#[serde(rename = "userId")]
	pub user_id: i64,
	/// The text of the comment.
	#[validate(length(min = 1))]
	pub body: String,
	/// The creation time of the comment.
	#[model(skip)]
	#[serde(default)]
	pub created_at: Timestamp,
	/// The last time the comment was modified.
	#[model(skip)]
	#[serde(default)]
	pub updated_at: Timestamp,
}
