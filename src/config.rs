use std::{
	net::{IpAddr, Ipv4Addr},
	path::PathBuf,
};

/// Only ever used by debug builds, release builds refuse to start without `JWT_SECRET`.
pub const DEV_JWT_SECRET: &str = "super_secret_dev_key_change_me";

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_DATA_FILE: &str = "db.json";
const DEFAULT_ADMIN_NAME: &str = "Admin User";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{name} must be set")]
	Missing { name: &'static str },
	#[error("{name} must be {expected}, got {value:?}")]
	Invalid {
		name: &'static str,
		expected: &'static str,
		value: String,
	},
}

/// Where the data set lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
	Postgres(String),
	File(PathBuf),
	Memory,
}

impl StorageConfig {
	/// A short name for logs, without any connection secrets.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Postgres(..) => "postgres",
			Self::File(..) => "file",
			Self::Memory => "memory",
		}
	}
}

/// The admin account created on an empty store.
#[derive(Clone)]
pub struct AdminSeed {
	pub email: String,
	pub password: String,
	pub name: String,
}

/// Runtime configuration, read from the environment.
#[derive(Clone)]
pub struct Config {
	pub host: IpAddr,
	pub port: u16,
	pub jwt_secret: String,
	pub storage: StorageConfig,
	pub admin: Option<AdminSeed>,
	pub otlp_endpoint: Option<String>,
}

impl Config {
	/// Reads the configuration from environment variables.
	pub fn from_env() -> Result<Self, Error> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads the configuration through `lookup`, where blank values count as unset.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
		let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

		let host = match var("HOST") {
			Some(value) => value.parse().map_err(|_| Error::Invalid {
				name: "HOST",
				expected: "an IP address",
				value,
			})?,
			None => IpAddr::V4(Ipv4Addr::LOCALHOST),
		};

		let port = match var("PORT") {
			Some(value) => value.parse().map_err(|_| Error::Invalid {
				name: "PORT",
				expected: "a port number",
				value,
			})?,
			None => DEFAULT_PORT,
		};

		let jwt_secret = match var("JWT_SECRET") {
			Some(secret) => secret,
			None if cfg!(debug_assertions) => DEV_JWT_SECRET.to_owned(),
			None => return Err(Error::Missing { name: "JWT_SECRET" }),
		};

		let database_url = var("DATABASE_URL");
		let data_file = || var("DATA_FILE").map_or_else(|| DEFAULT_DATA_FILE.into(), PathBuf::from);

		let storage = match var("STORAGE").map(|kind| kind.to_ascii_lowercase()) {
			None => database_url.map_or_else(|| StorageConfig::File(data_file()), StorageConfig::Postgres),
			Some(kind) => match kind.as_str() {
				"postgres" => StorageConfig::Postgres(
					database_url.ok_or(Error::Missing {
						name: "DATABASE_URL",
					})?,
				),
				"file" => StorageConfig::File(data_file()),
				"memory" => StorageConfig::Memory,
				_ => {
					return Err(Error::Invalid {
						name: "STORAGE",
						expected: "one of postgres, file or memory",
						value: kind,
					})
				}
			},
		};

		let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
			(Some(email), Some(password)) => Some(AdminSeed {
				email,
				password,
				name: var("ADMIN_NAME").unwrap_or_else(|| DEFAULT_ADMIN_NAME.into()),
			}),
			(None, None) => None,
			(Some(_), None) => return Err(Error::Missing { name: "ADMIN_PASSWORD" }),
			(None, Some(_)) => return Err(Error::Missing { name: "ADMIN_EMAIL" }),
		};

		Ok(Self {
			host,
			port,
			jwt_secret,
			storage,
			admin,
			otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
		})
	}
}
