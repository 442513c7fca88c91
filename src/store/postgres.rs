use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{Error, Order, Page, PostQuery, Storage};
use crate::model::{
	Comment, CreateCommentInput, CreatePostInput, CreateUserInput, Post, UpdatePostInput,
	UpdateUserInput, User,
};

/// The effective date of a post, `GREATEST` skips whichever side is `NULL`.
const EFFECTIVE_DATE: &str = "GREATEST(created_at, updated_at)";

/// A [`Storage`] backed by PostgreSQL.
///
/// Cascading deletes are handled by the foreign keys in `migrations/`.
pub struct PgStore {
	pool: PgPool,
}

impl PgStore {
	/// Connects to the database and applies any pending migrations.
	pub async fn connect(url: &str) -> Result<Self, Error> {
		let pool = PgPool::connect(url).await?;

		sqlx::migrate!().run(&pool).await?;

		Ok(Self::new(pool))
	}

	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}

fn map_unique_email(error: sqlx::Error) -> Error {
	if let sqlx::Error::Database(ref database) = error {
		if database.constraint() == Some("user_email_key") {
			return Error::EmailTaken;
		}
	}

	error.into()
}

/// Maps a foreign key violation on insert to the missing reference.
fn map_missing_reference(error: sqlx::Error, user_id: i64, post_id: Option<i64>) -> Error {
	if let sqlx::Error::Database(ref database) = error {
		match (database.constraint(), post_id) {
			(Some("post_user_id_fkey" | "comment_user_id_fkey"), _) => {
				return Error::UnknownUser(user_id);
			}
			(Some("comment_post_id_fkey"), Some(post_id)) => return Error::UnknownPost(post_id),
			_ => {}
		}
	}

	error.into()
}

/// Escapes the wildcards of a `LIKE` pattern.
fn escape_like(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());

	for c in value.chars() {
		if matches!(c, '\\' | '%' | '_') {
			escaped.push('\\');
		}

		escaped.push(c);
	}

	escaped
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &PostQuery) {
	builder.push(" WHERE TRUE");

	if let Some(search) = &query.search {
		let pattern = format!("%{}%", escape_like(search));

		builder
			.push(" AND (title ILIKE ")
			.push_bind(pattern.clone())
			.push(" OR body ILIKE ")
			.push_bind(pattern)
			.push(")");
	}

	if let Some(user_id) = query.user_id {
		builder.push(" AND user_id = ").push_bind(user_id);
	}

	if let Some(from) = query.from {
		builder
			.push(format_args!(" AND {EFFECTIVE_DATE} >= "))
			.push_bind(from);
	}

	if let Some(to) = query.to {
		builder
			.push(format_args!(" AND {EFFECTIVE_DATE} <= "))
			.push_bind(to);
	}
}

#[async_trait::async_trait]
impl Storage for PgStore {
	async fn list_users(&self) -> Result<Vec<User>, Error> {
		let users = sqlx::query_as::<_, User>(r#"SELECT * FROM "user" ORDER BY id"#)
			.fetch_all(&self.pool)
			.await?;

		Ok(users)
	}

	async fn find_user(&self, id: i64) -> Result<Option<User>, Error> {
		let user = sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE id = $1"#)
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;

		Ok(user)
	}

	async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
		let user = sqlx::query_as::<_, User>(r#"SELECT * FROM "user" WHERE email = $1"#)
			.bind(email)
			.fetch_optional(&self.pool)
			.await?;

		Ok(user)
	}

	async fn insert_user(&self, user: CreateUserInput) -> Result<User, Error> {
		sqlx::query_as::<_, User>(
			r#"
				INSERT INTO "user" (email, name, password, role)
				VALUES ($1, $2, $3, $4)
				RETURNING *
			"#,
		)
		.bind(user.email)
		.bind(user.name)
		.bind(user.password)
		.bind(user.role)
		.fetch_one(&self.pool)
		.await
		.map_err(map_unique_email)
	}

	async fn update_user(&self, id: i64, changes: UpdateUserInput) -> Result<Option<User>, Error> {
		sqlx::query_as::<_, User>(
			r#"
				UPDATE "user"
				SET
					email = COALESCE($1, email),
					name = COALESCE($2, name),
					role = COALESCE($3, role),
					updated_at = GREATEST(now(), updated_at + INTERVAL '1 microsecond')
				WHERE id = $4
				RETURNING *
			"#,
		)
		.bind(changes.email)
		.bind(changes.name)
		.bind(changes.role)
		.bind(id)
		.fetch_optional(&self.pool)
		.await
		.map_err(map_unique_email)
	}

	async fn set_password(&self, id: i64, password: String) -> Result<bool, Error> {
		let status = sqlx::query(r#"UPDATE "user" SET password = $1 WHERE id = $2"#)
			.bind(password)
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(status.rows_affected() > 0)
	}

	async fn delete_user(&self, id: i64) -> Result<bool, Error> {
		let status = sqlx::query(r#"DELETE FROM "user" WHERE id = $1"#)
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(status.rows_affected() > 0)
	}

	async fn list_posts(&self, query: &PostQuery) -> Result<Page<Post>, Error> {
		let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM post");
		push_filters(&mut count, query);

		let total = count
			.build_query_scalar::<i64>()
			.fetch_one(&self.pool)
			.await?;

		let direction = match query.order {
			Order::Asc => "ASC NULLS FIRST",
			Order::Desc => "DESC NULLS LAST",
		};

		let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM post");
		push_filters(&mut select, query);

		select
			.push(format_args!(
				" ORDER BY {EFFECTIVE_DATE} {direction}, id {}",
				if query.order == Order::Asc { "ASC" } else { "DESC" }
			))
			.push(" LIMIT ")
			.push_bind(query.limit)
			.push(" OFFSET ")
			.push_bind(query.offset);

		let items = select
			.build_query_as::<Post>()
			.fetch_all(&self.pool)
			.await?;

		Ok(Page { total, items })
	}

	async fn find_post(&self, id: i64) -> Result<Option<Post>, Error> {
		let post = sqlx::query_as::<_, Post>("SELECT * FROM post WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;

		Ok(post)
	}

	async fn insert_post(&self, user_id: i64, post: CreatePostInput) -> Result<Post, Error> {
		let post = sqlx::query_as::<_, Post>(
			r#"
				INSERT INTO post (user_id, title, body)
				VALUES ($1, $2, $3)
				RETURNING *
			"#,
		)
		.bind(user_id)
		.bind(post.title)
		.bind(post.body)
		.fetch_one(&self.pool)
		.await
		.map_err(|error| map_missing_reference(error, user_id, None))?;

		Ok(post)
	}

	async fn update_post(&self, id: i64, changes: UpdatePostInput) -> Result<Option<Post>, Error> {
		let post = sqlx::query_as::<_, Post>(
			r#"
				UPDATE post
				SET
					title = COALESCE($1, title),
					body = COALESCE($2, body),
					updated_at = GREATEST(now(), updated_at + INTERVAL '1 microsecond')
				WHERE id = $3
				RETURNING *
			"#,
		)
		.bind(changes.title)
		.bind(changes.body)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(post)
	}

	async fn delete_post(&self, id: i64) -> Result<bool, Error> {
		let status = sqlx::query("DELETE FROM post WHERE id = $1")
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(status.rows_affected() > 0)
	}

	async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, Error> {
		let comments = sqlx::query_as::<_, Comment>(
			r#"
				SELECT * FROM comment
				WHERE post_id = $1
				ORDER BY created_at ASC, id ASC
			"#,
		)
		.bind(post_id)
		.fetch_all(&self.pool)
		.await?;

		Ok(comments)
	}

	async fn find_comment(&self, id: i64) -> Result<Option<Comment>, Error> {
		let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comment WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;

		Ok(comment)
	}

	async fn insert_comment(
		&self,
		user_id: i64,
		comment: CreateCommentInput,
	) -> Result<Comment, Error> {
		let post_id = comment.post_id;
		let comment = sqlx::query_as::<_, Comment>(
			r#"
				INSERT INTO comment (post_id, user_id, body)
				VALUES ($1, $2, $3)
				RETURNING *
			"#,
		)
		.bind(comment.post_id)
		.bind(user_id)
		.bind(comment.body)
		.fetch_one(&self.pool)
		.await
		.map_err(|error| map_missing_reference(error, user_id, Some(post_id)))?;

		Ok(comment)
	}

	async fn delete_comment(&self, id: i64) -> Result<bool, Error> {
		let status = sqlx::query("DELETE FROM comment WHERE id = $1")
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(status.rows_affected() > 0)
	}
}

#[cfg(test)]
mod test {
	use sqlx::PgPool;

	use super::{escape_like, PgStore};
	use crate::{
		model::{CreateCommentInput, CreatePostInput, CreateUserInput, Role},
		store::{Error, PostQuery, Storage},
	};

	#[test]
	fn test_escape_like() {
		assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
		assert_eq!(escape_like("plain"), "plain");
	}

	#[sqlx::test]
	#[ignore = "requires a PostgreSQL database in DATABASE_URL"]
	async fn test_delete_user_cascades(pool: PgPool) {
		let store = PgStore::new(pool);

		let user = store
			.insert_user(CreateUserInput {
				email: "jonas@poster.com".into(),
				name: "Jonas".into(),
				password: "hash".into(),
				role: Role::Worker,
			})
			.await
			.unwrap();

		let duplicate = store
			.insert_user(CreateUserInput {
				email: "jonas@poster.com".into(),
				name: "Jonas".into(),
				password: "hash".into(),
				role: Role::Worker,
			})
			.await;

		assert!(matches!(duplicate, Err(Error::EmailTaken)));

		let post = store
			.insert_post(
				user.id,
				CreatePostInput {
					title: "Hello world".into(),
					body: "100% real".into(),
				},
			)
			.await
			.unwrap();

		store
			.insert_comment(
				user.id,
				CreateCommentInput {
					post_id: post.id,
					body: "Nice post!".into(),
				},
			)
			.await
			.unwrap();

		let page = store
			.list_posts(&PostQuery {
				search: Some("100%".into()),
				limit: 10,
				..Default::default()
			})
			.await
			.unwrap();

		assert_eq!(page.total, 1);

		let missing_post = store
			.insert_comment(
				user.id,
				CreateCommentInput {
					post_id: post.id + 1,
					body: "Nowhere".into(),
				},
			)
			.await;

		assert!(matches!(missing_post, Err(Error::UnknownPost(id)) if id == post.id + 1));

		assert!(store.delete_user(user.id).await.unwrap());
		assert!(store.find_post(post.id).await.unwrap().is_none());
		assert!(store.list_comments(post.id).await.unwrap().is_empty());

		let orphan = store
			.insert_post(
				user.id,
				CreatePostInput {
					title: "Too late".into(),
					body: "The author is gone".into(),
				},
			)
			.await;

		assert!(matches!(orphan, Err(Error::UnknownUser(id)) if id == user.id));
	}
}
