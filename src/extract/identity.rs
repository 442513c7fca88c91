use aide::{gen::GenContext, openapi::Operation, OperationInput};
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request},
};

use crate::{
	error::RouteError,
	model::Role,
	openapi::SECURITY_SCHEME_BEARER,
	route::auth,
	session::{self, Claims},
};

pub const AUTHORIZATION_PREFIX: &str = "Bearer ";

/// The authenticated caller, decoded from a bearer token.
///
/// If the `Authorization` header is missing or malformed, a
/// [`auth::Error::MissingToken`] is returned. If the token does not verify or
/// has expired, a [`auth::Error::InvalidToken`] is returned.
///
/// ```rust
/// async fn route(identity: Identity) {
///   println!("{}", identity.email);
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
	pub id: i64,
	pub email: String,
	pub role: Role,
}

impl Identity {
	pub fn is_admin(&self) -> bool {
		self.role == Role::Admin
	}

	/// Whether the caller may modify a resource owned by `owner`.
	pub fn can_modify(&self, owner: i64) -> bool {
		self.is_admin() || self.id == owner
	}
}

impl From<Claims> for Identity {
	fn from(claims: Claims) -> Self {
		Self {
			id: claims.id,
			email: claims.email,
			role: claims.role,
		}
	}
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
	session::Keys: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let token = parts
			.headers
			.get(header::AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.strip_prefix(AUTHORIZATION_PREFIX))
			.map(str::trim)
			.filter(|token| !token.is_empty())
			.ok_or(auth::Error::MissingToken)?;

		let claims = session::Keys::from_ref(state)
			.verify(token)
			.map_err(|error| {
				tracing::debug!(%error, "rejected bearer token");
				auth::Error::InvalidToken
			})?;

		Ok(claims.into())
	}
}

impl OperationInput for Identity {
	/// Adds a bearer token requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut GenContext, operation: &mut Operation) {
		operation.security.push(
			[(SECURITY_SCHEME_BEARER.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		);
	}
}

/// An authenticated caller with the admin role.
///
/// Any other role is rejected with [`auth::Error::Forbidden`].
#[derive(Debug)]
pub struct Admin(pub Identity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Admin
where
	session::Keys: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let identity = Identity::from_request_parts(parts, state).await?;

		if !identity.is_admin() {
			return Err(auth::Error::Forbidden.into());
		}

		Ok(Self(identity))
	}
}

impl OperationInput for Admin {
	fn operation_input(ctx: &mut GenContext, operation: &mut Operation) {
		Identity::operation_input(ctx, operation);
	}
}

#[cfg(test)]
mod test {
	use super::Identity;
	use crate::model::Role;

	#[test]
	fn test_can_modify() {
		let worker = Identity {
			id: 2,
			email: "jonas@poster.com".into(),
			role: Role::Worker,
		};
		let admin = Identity {
			id: 1,
			email: "admin@poster.com".into(),
			role: Role::Admin,
		};

		assert!(worker.can_modify(2));
		assert!(!worker.can_modify(3));
		assert!(admin.can_modify(3));
	}
}
