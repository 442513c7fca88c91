use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::SafeUser;

#[derive(Deserialize, Validate, JsonSchema)]
pub struct LoginInput {
	#[validate(length(min = 1))]
	pub email: String,
	#[validate(length(min = 1))]
	pub password: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct Session {
	/// A bearer token, valid for two hours.
	#[serde(rename = "accessToken")]
	pub access_token: String,
	/// The user that logged in.
	pub user: SafeUser,
}
