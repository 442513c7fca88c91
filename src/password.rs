use argon2::{
	password_hash::{self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
	Argon2,
};

/// Hashes a password with a fresh random salt, returning a PHC string.
pub fn hash(hasher: &Argon2, password: &str) -> Result<String, password_hash::Error> {
	let salt = SaltString::generate(&mut OsRng);

	Ok(hasher.hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Whether the hash was made by bcrypt, as in documents written by older versions.
fn is_bcrypt(hash: &str) -> bool {
	["$2a$", "$2b$", "$2y$"]
		.iter()
		.any(|prefix| hash.starts_with(prefix))
}

/// Checks a password against a stored hash.
///
/// Stored hashes are argon2 PHC strings, or bcrypt for accounts imported from
/// an older document. Anything else is logged and never matches.
pub fn verify(hasher: &Argon2, password: &str, hash: &str) -> Result<bool, password_hash::Error> {
	if is_bcrypt(hash) {
		return Ok(bcrypt::verify(password, hash).unwrap_or_else(|error| {
			tracing::warn!(%error, "stored bcrypt hash is malformed");
			false
		}));
	}

	let hash = match PasswordHash::new(hash) {
		Ok(hash) => hash,
		Err(error) => {
			tracing::warn!(%error, "stored password hash is not a PHC string");

			return Ok(false);
		}
	};

	match hasher.verify_password(password.as_bytes(), &hash) {
		Ok(()) => Ok(true),
		Err(password_hash::Error::Password) => Ok(false),
		Err(error) => Err(error),
	}
}

/// Does the work of [`verify`] when there is no stored hash, so a missing
/// account takes as long to reject as a wrong password.
pub fn verify_absent(hasher: &Argon2, password: &str) {
	if let Err(error) = hash(hasher, password) {
		tracing::warn!(%error, "failed to hash password");
	}
}

/// Whether a hash that just verified should be replaced with a fresh argon2 one.
pub fn needs_rehash(hash: &str) -> bool {
	!hash.starts_with("$argon2")
}
