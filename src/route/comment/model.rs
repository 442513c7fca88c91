use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::model::{Comment, CreateCommentInput};
use crate::model::SafeUser;

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct ListCommentsInput {
	/// The post to list the comments of.
	#[serde(rename = "postId")]
	#[validate(range(min = 1))]
	pub post_id: i64,
}

/// A comment, optionally with its author embedded.
#[derive(Debug, Serialize, JsonSchema)]
pub struct CommentView {
	#[serde(flatten)]
	pub comment: Comment,
	/// The author, present when `_expand=user` is requested.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user: Option<SafeUser>,
}

impl CommentView {
	pub fn new(comment: Comment, users: Option<&HashMap<i64, SafeUser>>) -> Self {
		let user = users.and_then(|users| users.get(&comment.user_id).cloned());

		Self { comment, user }
	}
}
