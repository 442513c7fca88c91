use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::model::{CreatePostInput, Post, UpdatePostInput};
use crate::{
	model::SafeUser,
	route::model::{empty_as_none, Paginate},
	store::{Order, PostQuery},
};

#[derive(Debug, thiserror::Error)]
#[error("expected a YYYY-MM-DD date or an RFC 3339 timestamp")]
pub struct InvalidDate;

/// A date filter, either a whole day or an exact instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateInput {
	Day(NaiveDate),
	Instant(DateTime<Utc>),
}

impl FromStr for DateInput {
	type Err = InvalidDate;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
			return Ok(Self::Instant(instant.with_timezone(&Utc)));
		}

		NaiveDate::parse_from_str(value, "%Y-%m-%d")
			.map(Self::Day)
			.map_err(|_| InvalidDate)
	}
}

impl DateInput {
	/// The first instant covered by the filter.
	pub fn start(self) -> DateTime<Utc> {
		match self {
			Self::Day(day) => Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)),
			Self::Instant(instant) => instant,
		}
	}

	/// The last instant covered by the filter.
	pub fn end(self) -> DateTime<Utc> {
		match self {
			Self::Day(day) => {
				Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)) + Duration::days(1)
					- Duration::nanoseconds(1)
			}
			Self::Instant(instant) => instant,
		}
	}
}

#[derive(Debug, Default, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListPostsInput {
	/// Only include posts whose title or body contains this text, ignoring case.
	#[serde(default)]
	pub q: Option<String>,
	/// Only include posts created by this user.
	#[serde(default, deserialize_with = "empty_as_none")]
	#[schemars(with = "Option<i64>")]
	pub user_id: Option<i64>,
	/// Only include posts last touched on or after this date.
	#[serde(default, deserialize_with = "empty_as_none")]
	#[schemars(with = "Option<String>")]
	pub date_from: Option<DateInput>,
	/// Only include posts last touched on or before this date. A bare date
	/// includes the whole day.
	#[serde(default, deserialize_with = "empty_as_none")]
	#[schemars(with = "Option<String>")]
	pub date_to: Option<DateInput>,
	#[serde(default)]
	pub order: Order,
}

impl ListPostsInput {
	pub fn into_query(self, paginate: &Paginate) -> PostQuery {
		PostQuery {
			search: self
				.q
				.as_deref()
				.map(str::trim)
				.filter(|q| !q.is_empty())
				.map(str::to_owned),
			user_id: self.user_id,
			from: self.date_from.map(DateInput::start),
			to: self.date_to.map(DateInput::end),
			order: self.order,
			offset: paginate.offset(),
			limit: paginate.limit(),
		}
	}
}

/// A post, optionally with its author embedded.
#[derive(Debug, Serialize, JsonSchema)]
pub struct PostView {
	#[serde(flatten)]
	pub post: Post,
	/// The author, present when `_expand=user` is requested.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user: Option<SafeUser>,
}

impl PostView {
	pub fn new(post: Post, users: Option<&HashMap<i64, SafeUser>>) -> Self {
		let user = users.and_then(|users| users.get(&post.user_id).cloned());

		Self { post, user }
	}
}
