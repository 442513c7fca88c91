use std::borrow::Cow;

use aide::{
	gen::GenContext,
	openapi::{Operation, Response},
	OperationOutput,
};
use axum::{
	extract::rejection::{JsonRejection, PathRejection, QueryRejection},
	http::StatusCode,
	response::IntoResponse,
	Json,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::store;

pub type Map = serde_json::Map<String, serde_json::Value>;

/// A single error message sent to the client.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message<'a> {
	/// A machine-readable code, such as `unknown_post`.
	pub code: Cow<'a, str>,
	/// A human-readable description of the error.
	pub content: Cow<'a, str>,
	/// The input field that caused the error, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'a, str>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Map>,
}

impl<'a> Message<'a> {
	pub fn new(code: impl Into<Cow<'a, str>>) -> Self {
		let code = code.into();

		Self {
			content: code.clone(),
			code,
			field: None,
			details: None,
		}
	}

	pub fn content(mut self, content: impl Into<Cow<'a, str>>) -> Self {
		self.content = content.into();
		self
	}

	pub fn field(mut self, field: impl Into<Cow<'a, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(Map::new)
			.insert(key.into(), value.into());
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorResponse {
	/// The content of the first error, for clients that only show one.
	pub message: Cow<'static, str>,
	pub errors: Vec<Message<'static>>,
}

impl ErrorResponse {
	pub fn new(errors: Vec<Message<'static>>) -> Self {
		Self {
			message: errors
				.first()
				.map_or(Cow::Borrowed("unknown error"), |error| error.content.clone()),
			errors,
		}
	}
}

/// The wire name of an input field, since every multi-word input is camelCase.
fn wire_name(field: &str) -> String {
	let mut name = String::with_capacity(field.len());
	let mut upper = false;

	for c in field.chars() {
		if c == '_' && !name.is_empty() {
			upper = true;
		} else if upper {
			name.extend(c.to_uppercase());
			upper = false;
		} else {
			name.push(c);
		}
	}

	name
}

fn respond(status: StatusCode, errors: Vec<Message<'static>>) -> axum::response::Response {
	(status, Json(ErrorResponse::new(errors))).into_response()
}

/// An error specific to a group of routes.
///
/// The messages are sent to the client as-is, so they should never contain
/// sensitive information.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;
	fn into_errors(self) -> Vec<Message<'static>>;
}

/// Errors shared by every route, mostly extractor rejections.
///
/// The Display implementation is only ever logged, so it can contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] JsonRejection),
	#[error("query error: {0}")]
	Query(#[from] QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] PathRejection),
	#[error("storage error: {0}")]
	Store(#[from] store::Error),
}

impl AppError {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..) | Self::Json(..) | Self::Query(..) | Self::Path(..) => {
				StatusCode::BAD_REQUEST
			}
			Self::Store(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn into_errors(self) -> Vec<Message<'static>> {
		match self {
			Self::Validation(errors) => {
				let mut messages = errors
					.field_errors()
					.into_iter()
					.flat_map(|(field, errors)| {
						errors.iter().map(move |error| {
							let content = error
								.message
								.clone()
								.unwrap_or_else(|| format!("{field} is invalid").into());

							Message::new(error.code.clone())
								.content(content)
								.field(wire_name(field))
						})
					})
					.collect::<Vec<_>>();

				// `field_errors` is backed by a hash map
				messages.sort_by(|a, b| a.field.cmp(&b.field));
				messages
			}
			Self::Json(rejection) => Message::new("invalid_json")
				.content(rejection.body_text())
				.into_vec(),
			Self::Query(rejection) => Message::new("invalid_query")
				.content(rejection.body_text())
				.into_vec(),
			Self::Path(rejection) => Message::new("invalid_path")
				.content(rejection.body_text())
				.into_vec(),
			Self::Store(..) => Message::new("internal_error")
				.content("internal server error")
				.into_vec(),
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> axum::response::Response {
		if let Self::Store(ref error) = self {
			tracing::error!(%error, "storage failure");
		}

		respond(self.status(), self.into_errors())
	}
}

impl OperationOutput for AppError {
	type Inner = ErrorResponse;
}

/// The error returned by route handlers, either a shared [`AppError`] or one
/// specific to the route group.
#[derive(Debug)]
pub enum RouteError<T> {
	App(AppError),
	Route(T),
}

impl<T: ErrorShape> From<T> for RouteError<T> {
	fn from(error: T) -> Self {
		Self::Route(error)
	}
}

impl<T> From<AppError> for RouteError<T> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<T> From<store::Error> for RouteError<T> {
	fn from(error: store::Error) -> Self {
		Self::App(AppError::Store(error))
	}
}

impl<T: ErrorShape> IntoResponse for RouteError<T> {
	fn into_response(self) -> axum::response::Response {
		match self {
			Self::App(error) => error.into_response(),
			Self::Route(error) => {
				let status = error.status();

				if status.is_server_error() {
					tracing::error!(%error, "route failure");
				}

				respond(status, error.into_errors())
			}
		}
	}
}

impl<T> OperationOutput for RouteError<T> {
	type Inner = ErrorResponse;

	fn operation_response(ctx: &mut GenContext, operation: &mut Operation) -> Option<Response> {
		Json::<ErrorResponse>::operation_response(ctx, operation)
	}
}

#[cfg(test)]
mod test {
	use axum::http::StatusCode;
	use validator::Validate;

	use super::{wire_name, AppError, ErrorResponse, Message};

	#[derive(Validate)]
	struct Input {
		#[validate(email)]
		email: String,
		#[validate(length(min = 1))]
		name: String,
		#[validate(range(min = 1))]
		post_id: i64,
	}

	#[test]
	fn test_message_builder() {
		let message = Message::new("unknown_post")
			.content("The post does not exist.")
			.detail("post", 4);

		let value = serde_json::to_value(&message).unwrap();

		assert_eq!(value["code"], "unknown_post");
		assert_eq!(value["content"], "The post does not exist.");
		assert_eq!(value["details"]["post"], 4);
		assert!(value.get("field").is_none());
	}

	#[test]
	fn test_validation_errors() {
		let errors = Input {
			email: "not-an-email".into(),
			name: String::new(),
			post_id: 0,
		}
		.validate()
		.unwrap_err();

		let error = AppError::from(errors);

		assert_eq!(error.status(), StatusCode::BAD_REQUEST);

		let errors = error.into_errors();

		assert_eq!(errors.len(), 3);
		assert_eq!(errors[0].field.as_deref(), Some("email"));
		assert_eq!(errors[1].field.as_deref(), Some("name"));
		assert_eq!(errors[2].field.as_deref(), Some("postId"));
	}

	#[test]
	fn test_wire_name() {
		assert_eq!(wire_name("post_id"), "postId");
		assert_eq!(wire_name("email"), "email");
		assert_eq!(wire_name("_limit"), "_limit");
	}

	#[test]
	fn test_response_message_is_first_error() {
		let response = ErrorResponse::new(vec![
			Message::new("a").content("first"),
			Message::new("b").content("second"),
		]);

		assert_eq!(response.message, "first");
		assert_eq!(ErrorResponse::new(Vec::new()).message, "unknown error");
	}
}
