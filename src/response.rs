use aide::{
	gen::GenContext,
	openapi::{Operation, Response as ApiResponse},
	OperationOutput,
};
use axum::{
	http::{HeaderName, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use schemars::JsonSchema;
use serde::Serialize;

/// The header carrying the number of items that matched before pagination.
pub static X_TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

/// A newly created resource, sent with `201 Created`.
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
	fn into_response(self) -> Response {
		(StatusCode::CREATED, Json(self.0)).into_response()
	}
}

impl<T: JsonSchema> OperationOutput for Created<T> {
	type Inner = T;

	fn operation_response(ctx: &mut GenContext, operation: &mut Operation) -> Option<ApiResponse> {
		Json::<T>::operation_response(ctx, operation)
	}

	fn inferred_responses(
		ctx: &mut GenContext,
		operation: &mut Operation,
	) -> Vec<(Option<u16>, ApiResponse)> {
		Self::operation_response(ctx, operation)
			.map(|response| vec![(Some(201), response)])
			.unwrap_or_default()
	}
}

/// An empty `204 No Content` response.
pub struct NoContent;

impl IntoResponse for NoContent {
	fn into_response(self) -> Response {
		StatusCode::NO_CONTENT.into_response()
	}
}

impl OperationOutput for NoContent {
	type Inner = ();

	fn operation_response(_ctx: &mut GenContext, _operation: &mut Operation) -> Option<ApiResponse> {
		Some(ApiResponse {
			description: "No content".into(),
			..Default::default()
		})
	}

	fn inferred_responses(
		ctx: &mut GenContext,
		operation: &mut Operation,
	) -> Vec<(Option<u16>, ApiResponse)> {
		Self::operation_response(ctx, operation)
			.map(|response| vec![(Some(204), response)])
			.unwrap_or_default()
	}
}

/// One page of items, with the total number of matches in `X-Total-Count`.
pub struct Paginated<T> {
	pub total: i64,
	pub items: Vec<T>,
}

impl<T: Serialize> IntoResponse for Paginated<T> {
	fn into_response(self) -> Response {
		([(X_TOTAL_COUNT.clone(), self.total.to_string())], Json(self.items)).into_response()
	}
}

impl<T: JsonSchema> OperationOutput for Paginated<T> {
	type Inner = Vec<T>;

	fn operation_response(ctx: &mut GenContext, operation: &mut Operation) -> Option<ApiResponse> {
		Json::<Vec<T>>::operation_response(ctx, operation)
	}

	fn inferred_responses(
		ctx: &mut GenContext,
		operation: &mut Operation,
	) -> Vec<(Option<u16>, ApiResponse)> {
		Json::<Vec<T>>::inferred_responses(ctx, operation)
	}
}
