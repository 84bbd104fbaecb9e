//! Repository factory for dependency injection.
//!
//! The booking store is chosen once, at construction, from an explicit
//! [`RepositoryType`], the environment, or `repository.toml`. Callers hold
//! the result as `Arc<dyn BookingRepository>` and never learn which store
//! they got.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::repo_config::RepositoryConfig;
use super::repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
use super::repositories::PostgresRepository;
use super::repository::{BookingRepository, ErrorContext, RepositoryError, RepositoryResult};
use super::PostgresConfig;

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// Postgres + Diesel implementation
    Postgres,
    /// In-memory local repository
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Parse repository type from string ("postgres", "pg", "local", "memory").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// Get repository type from environment variable.
    ///
    /// Reads `REPOSITORY_TYPE`. Without it, defaults to Postgres if a
    /// database URL is present, otherwise Local.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("REPOSITORY_TYPE") {
            return val.parse().unwrap_or_else(|e| {
                log::warn!("{}; falling back to the local store", e);
                Self::Local
            });
        }

        if std::env::var("DATABASE_URL").is_ok() || std::env::var("PG_DATABASE_URL").is_ok() {
            Self::Postgres
        } else {
            Self::Local
        }
    }
}

#[cfg(not(feature = "postgres-repo"))]
fn feature_disabled() -> RepositoryError {
    RepositoryError::configuration_with_context(
        "Postgres repository feature not enabled",
        ErrorContext::new("create_repository"),
    )
}

/// Repository factory for creating booking stores.
///
/// # Example
/// ```
/// use clinic_scheduling::db::{RepositoryFactory, RepositoryType};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let repo = RepositoryFactory::create(RepositoryType::Local, None).await.unwrap();
/// assert!(repo.health_check().await.unwrap());
/// # });
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository instance based on type.
    ///
    /// # Arguments
    /// * `repo_type` - Type of repository to create
    /// * `postgres_config` - Database configuration (required for Postgres)
    pub async fn create(
        repo_type: RepositoryType,
        postgres_config: Option<&PostgresConfig>,
    ) -> RepositoryResult<Arc<dyn BookingRepository>> {
        match repo_type {
            RepositoryType::Local => Ok(Self::create_local()),
            RepositoryType::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config = postgres_config.ok_or_else(|| {
                        RepositoryError::configuration_with_context(
                            "Postgres repository requires PostgresConfig",
                            ErrorContext::new("create_repository"),
                        )
                    })?;
                    let pg = Self::create_postgres(config).await?;
                    Ok(pg as Arc<dyn BookingRepository>)
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    let _ = postgres_config;
                    Err(feature_disabled())
                }
            }
        }
    }

    /// Create a Postgres repository, running pending migrations.
    #[cfg(feature = "postgres-repo")]
    pub async fn create_postgres(
        config: &PostgresConfig,
    ) -> RepositoryResult<Arc<PostgresRepository>> {
        let config = config.clone();
        // Pool construction and migrations block on network I/O
        let repo = tokio::task::spawn_blocking(move || PostgresRepository::new(config))
            .await
            .map_err(|e| {
                RepositoryError::internal_with_context(
                    format!("Task join error: {}", e),
                    ErrorContext::new("create_postgres"),
                )
            })??;
        Ok(Arc::new(repo))
    }

    /// Create an in-memory local repository.
    pub fn create_local() -> Arc<dyn BookingRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create repository from environment configuration.
    ///
    /// See [`RepositoryType::from_env`] and `PostgresConfig::from_env`.
    pub async fn from_env() -> RepositoryResult<Arc<dyn BookingRepository>> {
        let builder = RepositoryBuilder::new().from_env()?;
        builder.build().await
    }

    /// Create repository from a TOML configuration file.
    pub async fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> RepositoryResult<Arc<dyn BookingRepository>> {
        let config = RepositoryConfig::from_file(config_path)?;
        Self::from_repository_config(&config).await
    }

    /// Create repository from the default configuration file location.
    pub async fn from_default_config() -> RepositoryResult<Arc<dyn BookingRepository>> {
        let config = RepositoryConfig::from_default_location()?;
        Self::from_repository_config(&config).await
    }

    /// Create repository from an already-loaded configuration.
    pub async fn from_repository_config(
        config: &RepositoryConfig,
    ) -> RepositoryResult<Arc<dyn BookingRepository>> {
        RepositoryBuilder::new().with_config(config)?.build().await
    }
}

/// Builder for configuring repository creation.
///
/// ```
/// use clinic_scheduling::db::{RepositoryBuilder, RepositoryType};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let repo = RepositoryBuilder::new()
///     .repository_type(RepositoryType::Local)
///     .build()
///     .await
///     .unwrap();
/// assert!(repo.list_bookings().await.unwrap().is_empty());
/// # });
/// ```
pub struct RepositoryBuilder {
    repo_type: RepositoryType,
    postgres_config: Option<PostgresConfig>,
}

impl RepositoryBuilder {
    /// Create a new repository builder.
    ///
    /// Defaults to Postgres if a database URL is configured, otherwise Local.
    pub fn new() -> Self {
        Self {
            repo_type: RepositoryType::from_env(),
            postgres_config: None,
        }
    }

    /// Set the repository type.
    pub fn repository_type(mut self, repo_type: RepositoryType) -> Self {
        self.repo_type = repo_type;
        self
    }

    /// Set the Postgres configuration.
    pub fn postgres_config(mut self, config: PostgresConfig) -> Self {
        self.postgres_config = Some(config);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Result<Self, RepositoryError> {
        self.repo_type = RepositoryType::from_env();
        if self.repo_type == RepositoryType::Postgres {
            self.postgres_config = Some(postgres_config_from_env("from_env")?);
        }
        Ok(self)
    }

    /// Load configuration from a TOML file.
    pub fn from_config_file<P: AsRef<Path>>(self, config_path: P) -> Result<Self, RepositoryError> {
        let repo_config = RepositoryConfig::from_file(config_path)?;
        self.with_config(&repo_config)
    }

    /// Load configuration from the default `repository.toml` location.
    pub fn from_default_config(self) -> Result<Self, RepositoryError> {
        let repo_config = RepositoryConfig::from_default_location()?;
        self.with_config(&repo_config)
    }

    /// Apply a loaded configuration.
    ///
    /// `REPOSITORY_TYPE` in the environment overrides the file's type.
    pub fn with_config(mut self, repo_config: &RepositoryConfig) -> Result<Self, RepositoryError> {
        self.repo_type = match std::env::var("REPOSITORY_TYPE") {
            Ok(_) => RepositoryType::from_env(),
            Err(_) => repo_config.repository_type().map_err(|e| {
                RepositoryError::configuration_with_context(
                    format!("Invalid repository type: {}", e),
                    ErrorContext::new("with_config"),
                )
            })?,
        };

        if self.repo_type == RepositoryType::Postgres {
            // The file may select "local" while the environment asks for Postgres
            self.postgres_config = match repo_config.to_postgres_config() {
                Ok(Some(config)) => Some(config),
                Ok(None) | Err(_) => Some(postgres_config_from_env("with_config")?),
            };
        }

        Ok(self)
    }

    /// Build the repository instance.
    pub async fn build(self) -> RepositoryResult<Arc<dyn BookingRepository>> {
        log::info!("Creating {:?} booking store", self.repo_type);
        RepositoryFactory::create(self.repo_type, self.postgres_config.as_ref()).await
    }
}

fn postgres_config_from_env(operation: &str) -> RepositoryResult<PostgresConfig> {
    PostgresConfig::from_env()
        .map_err(|e| RepositoryError::configuration_with_context(e, ErrorContext::new(operation)))
}

impl Default for RepositoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
