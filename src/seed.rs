use argon2::Argon2;

use crate::{
	config::AdminSeed,
	model::{CreateUserInput, Role, User},
	password, store, Store,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("storage error: {0}")]
	Store(#[from] store::Error),
	#[error("failed to hash the admin password: {0}")]
	Hash(#[from] argon2::password_hash::Error),
}

/// Creates the configured admin account, but only if the store has no users.
///
/// Returns the new user, or `None` if the store was already populated.
pub async fn bootstrap_admin(
	store: &Store,
	hasher: &Argon2<'_>,
	seed: &AdminSeed,
) -> Result<Option<User>, Error> {
	if !store.list_users().await?.is_empty() {
		return Ok(None);
	}

	let user = store
		.insert_user(CreateUserInput {
			email: seed.email.clone(),
			name: seed.name.clone(),
			password: password::hash(hasher, &seed.password)?,
			role: Role::Admin,
		})
		.await?;

	tracing::info!(id = user.id, email = %user.email, "created bootstrap admin");

	Ok(Some(user))
}

#[cfg(test)]
mod test {
	use super::bootstrap_admin;
	use crate::{config::AdminSeed, model::Role, password, test};

	#[tokio::test]
	async fn test_bootstrap_only_on_empty_store() {
		let state = test::state();
		let seed = AdminSeed {
			email: "admin@poster.com".into(),
			password: "admin".into(),
			name: "Admin User".into(),
		};

		let admin = bootstrap_admin(&state.store, &state.hasher, &seed)
			.await
			.unwrap()
			.unwrap();

		assert_eq!(admin.role, Role::Admin);
		assert!(password::verify(&state.hasher, "admin", &admin.password).unwrap());

		let again = bootstrap_admin(&state.store, &state.hasher, &seed)
			.await
			.unwrap();

		assert!(again.is_none());
		assert_eq!(state.store.list_users().await.unwrap().len(), 1);
	}
}
