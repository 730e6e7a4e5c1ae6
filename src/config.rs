use std::env;

use crate::error::{AppError, AppResult};

/// Where item and enquiry rows live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendConfig {
    Postgres {
        database_url: String,
        run_migrations: bool,
    },
    /// PostgREST surface of the hosted backend.
    Rest { url: String, api_key: String },
    Memory,
}

/// Durable destination for uploaded images.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageConfig {
    R2 {
        bucket: String,
        account_id: String,
        access_key: String,
        secret_key: String,
    },
    Gcs {
        bucket: String,
    },
    /// Images stay as session-local blob references.
    None,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub backend: BackendConfig,
    pub storage: StorageConfig,
    pub public_image_base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            get(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::Config(format!("{} is not set", key)))
        };

        let backend = match get("BACKEND").as_deref().unwrap_or("postgres") {
            "postgres" => BackendConfig::Postgres {
                database_url: required("DATABASE_URL")?,
                run_migrations: get("RUN_MIGRATIONS")
                    .map(|v| !matches!(v.as_str(), "0" | "false" | "no"))
                    .unwrap_or(true),
            },
            "rest" => BackendConfig::Rest {
                url: required("SUPABASE_URL")?,
                api_key: required("SUPABASE_ANON_KEY")?,
            },
            "memory" => BackendConfig::Memory,
            other => {
                return Err(AppError::Config(format!(
                    "BACKEND must be 'postgres', 'rest' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let storage = if let Some(bucket) = get("R2_BUCKET").filter(|v| !v.is_empty()) {
            StorageConfig::R2 {
                bucket,
                account_id: required("R2_ACCOUNT_ID")?,
                access_key: required("R2_ACCESS_KEY_ID")?,
                secret_key: required("R2_SECRET_ACCESS_KEY")?,
            }
        } else if let Some(bucket) = get("GCS_BUCKET").filter(|v| !v.is_empty()) {
            StorageConfig::Gcs { bucket }
        } else {
            StorageConfig::None
        };

        Ok(Config {
            backend,
            storage,
            public_image_base_url: get("PUBLIC_IMAGE_BASE_URL").filter(|v| !v.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_to_postgres() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/items")]))
            .unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Postgres {
                database_url: "postgres://localhost/items".into(),
                run_migrations: true,
            }
        );
        assert_eq!(config.storage, StorageConfig::None);
        assert!(config.public_image_base_url.is_none());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_rest_backend_with_r2_storage() {
        let config = Config::from_lookup(lookup(&[
            ("BACKEND", "rest"),
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("R2_BUCKET", "items"),
            ("R2_ACCOUNT_ID", "acc"),
            ("R2_ACCESS_KEY_ID", "ak"),
            ("R2_SECRET_ACCESS_KEY", "sk"),
            ("PUBLIC_IMAGE_BASE_URL", "https://img.example.com"),
        ]))
        .unwrap();
        assert!(matches!(config.backend, BackendConfig::Rest { .. }));
        assert!(matches!(config.storage, StorageConfig::R2 { ref bucket, .. } if bucket == "items"));
        assert_eq!(
            config.public_image_base_url.as_deref(),
            Some("https://img.example.com")
        );
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = Config::from_lookup(lookup(&[("BACKEND", "mysql")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_run_migrations_can_be_disabled() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/items"),
            ("RUN_MIGRATIONS", "false"),
        ]))
        .unwrap();
        assert!(matches!(
            config.backend,
            BackendConfig::Postgres { run_migrations: false, .. }
        ));
    }
}
