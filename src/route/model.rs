use std::str::FromStr;

use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer};
use validator::{Validate, ValidationError, ValidationErrors};

/// These can be removed when [`serde`] supports
/// literal defaults: <https://github.com/serde-rs/serde/issues/368>
#[inline]
fn one() -> i64 {
	1
}

#[inline]
fn ten() -> i64 {
	10
}

/// Deserializes an optional query value, treating an empty string as absent.
pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: FromStr,
	T::Err: std::fmt::Display,
{
	match Option::<String>::deserialize(deserializer)? {
		Some(value) if !value.trim().is_empty() => {
			value.trim().parse().map(Some).map_err(de::Error::custom)
		}
		_ => Ok(None),
	}
}

/// The largest accepted `_limit`.
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct Paginate {
	/// The page number to return (1-indexed). Pages past the last one are empty.
	#[schemars(range(min = 1))]
	#[serde(rename = "_page", default = "one")]
	pub page: i64,
	/// The number of items to return per page.
	#[schemars(range(min = 1, max = 100))]
	#[serde(rename = "_limit", default = "ten")]
	pub size: i64,
}

fn out_of_range(message: &'static str) -> ValidationError {
	ValidationError::new("range").with_message(message.into())
}

// Written by hand so errors carry the query names instead of the field names.
impl Validate for Paginate {
	fn validate(&self) -> Result<(), ValidationErrors> {
		let mut errors = ValidationErrors::new();

		if self.page < 1 {
			errors.add("_page", out_of_range("_page must be at least 1"));
		}

		if !(1..=MAX_PAGE_SIZE).contains(&self.size) {
			errors.add("_limit", out_of_range("_limit must be between 1 and 100"));
		}

		if errors.is_empty() {
			Ok(())
		} else {
			Err(errors)
		}
	}
}

impl Default for Paginate {
	fn default() -> Self {
		Self {
			page: one(),
			size: ten(),
		}
	}
}

impl Paginate {
	pub fn offset(&self) -> i64 {
		(self.page - 1).saturating_mul(self.size)
	}

	pub fn limit(&self) -> i64 {
		self.size
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct IdInput {
	#[validate(range(min = 1))]
	pub id: i64,
}

/// A related record to embed in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Expand {
	/// The author, without secrets.
	User,
}

#[derive(Debug, Default, Deserialize, Validate, JsonSchema)]
pub struct ExpandInput {
	#[serde(rename = "_expand", default)]
	pub expand: Option<Expand>,
}

impl ExpandInput {
	pub fn user(&self) -> bool {
		self.expand == Some(Expand::User)
	}
}

#[cfg(test)]
mod test {
	use serde::Deserialize;
	use validator::Validate;

	use super::{empty_as_none, ExpandInput, Paginate};
	use crate::test::parse_query as parse;

	#[test]
	fn test_paginate_offset() {
		let mut paginate = Paginate { page: 1, size: 10 };

		assert_eq!(paginate.offset(), 0);

		paginate.page = 2;

		assert_eq!(paginate.offset(), 10);

		paginate.size = 5;

		assert_eq!(paginate.offset(), 5);

		paginate.page = 3;

		assert_eq!(paginate.offset(), 10);
	}

	#[test]
	fn test_paginate_limit() {
		let paginate = Paginate { page: 1, size: 10 };

		assert_eq!(paginate.limit(), 10);
	}

	#[test]
	fn test_paginate_query_names() {
		let paginate: Paginate = parse("_page=3&_limit=5").unwrap();

		assert_eq!(paginate.page, 3);
		assert_eq!(paginate.limit(), 5);

		let paginate: Paginate = parse("").unwrap();

		assert_eq!(paginate.page, 1);
		assert_eq!(paginate.limit(), 10);
	}

	#[test]
	fn test_paginate_bounds() {
		assert!(Paginate { page: 5000, size: 100 }.validate().is_ok());

		let errors = Paginate { page: 0, size: 101 }.validate().unwrap_err();
		let fields = errors.field_errors();

		assert!(fields.contains_key("_page"));
		assert!(fields.contains_key("_limit"));
		assert!(!fields.contains_key("page"));

		let errors = Paginate { page: 1, size: 0 }.validate().unwrap_err();

		assert_eq!(errors.field_errors().len(), 1);
		assert!(errors.field_errors().contains_key("_limit"));
	}

	#[test]
	fn test_expand() {
		let expand: ExpandInput = parse("_expand=user").unwrap();

		assert!(expand.user());
		assert!(parse::<ExpandInput>("_expand=post").is_err());
	}

	#[derive(Deserialize)]
	struct Filter {
		#[serde(default, deserialize_with = "empty_as_none")]
		id: Option<i64>,
	}

	#[test]
	fn test_empty_as_none() {
		let filter: Filter = parse("id=").unwrap();
		assert_eq!(filter.id, None);

		let filter: Filter = parse("id=12").unwrap();
		assert_eq!(filter.id, Some(12));

		assert!(parse::<Filter>("id=twelve").is_err());
	}
}
