use chrono::{DateTime, Utc};
use jsonwebtoken::{errors::Error, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::model::{Role, User};

/// How long an access token stays valid, in seconds.
pub const TOKEN_LIFETIME: i64 = 2 * 60 * 60;

/// The claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	pub id: i64,
	pub email: String,
	pub role: Role,
	pub iat: i64,
	pub exp: i64,
}

/// The keys used to sign and verify access tokens (HS256 with a shared secret).
#[derive(Clone)]
pub struct Keys {
	encoding: EncodingKey,
	decoding: DecodingKey,
	validation: Validation,
}

impl Keys {
	pub fn new(secret: &[u8]) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.leeway = 0;

		Self {
			encoding: EncodingKey::from_secret(secret),
			decoding: DecodingKey::from_secret(secret),
			validation,
		}
	}

	/// Issues a new access token for the user.
	pub fn issue(&self, user: &User) -> Result<String, Error> {
		self.issue_at(user, Utc::now())
	}

	pub fn issue_at(&self, user: &User, issued_at: DateTime<Utc>) -> Result<String, Error> {
		let claims = Claims {
			id: user.id,
			email: user.email.clone(),
			role: user.role,
			iat: issued_at.timestamp(),
			exp: issued_at.timestamp() + TOKEN_LIFETIME,
		};

		jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
	}

	/// Verifies the signature and expiry of a token, returning its claims.
	pub fn verify(&self, token: &str) -> Result<Claims, Error> {
		jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation).map(|data| data.claims)
	}
}

#[cfg(test)]
mod test {
	use chrono::{Duration, Utc};

	use super::{Keys, TOKEN_LIFETIME};
	use crate::model::{Role, User};

	fn user() -> User {
		User {
			id: 3,
			email: "jonas@poster.com".into(),
			name: "Jonas".into(),
			password: String::new(),
			role: Role::Worker,
			created_at: None,
			updated_at: None,
		}
	}

	#[test]
	fn test_issue_and_verify() {
		let keys = Keys::new(b"secret");
		let token = keys.issue(&user()).unwrap();
		let claims = keys.verify(&token).unwrap();

		assert_eq!(claims.id, 3);
		assert_eq!(claims.email, "jonas@poster.com");
		assert_eq!(claims.role, Role::Worker);
		assert_eq!(claims.exp - claims.iat, TOKEN_LIFETIME);
	}

	#[test]
	fn test_expired_token_rejected() {
		let keys = Keys::new(b"secret");
		let token = keys
			.issue_at(&user(), Utc::now() - Duration::hours(3))
			.unwrap();

		assert!(keys.verify(&token).is_err());
	}

	#[test]
	fn test_wrong_secret_rejected() {
		let token = Keys::new(b"secret").issue(&user()).unwrap();

		assert!(Keys::new(b"other").verify(&token).is_err());
	}
}
