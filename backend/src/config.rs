//! Process configuration, loaded once at startup.
//!
//! Values come from the environment (a `.env` file is honoured through
//! `dotenvy`). The audit rules, including the static database name table,
//! default to the production values and can be replaced wholesale with a JSON
//! file named by `CARD_AUDIT_RULES`.

use crate::error::AuditError;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

/// Connection settings for the BI tool API.
#[derive(Debug, Clone)]
pub struct MetabaseConfig {
    /// Base URL without trailing slash, e.g. `https://metabase.example.com`.
    pub base_url: String,
    pub api_key: String,
}

/// Static rules the transform, selector and executor run against.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditRules {
    /// Database id to human-readable name. JSON keys are the ids as strings.
    pub databases: HashMap<i64, String>,
    pub production_db_name: String,
    pub excluded_collection_id: i64,
    pub excluded_db_id: i64,
    /// Cards unused for strictly more days than this are archived.
    pub archive_after_days: i64,
    pub update_bucket_days: i64,
    pub usage_bucket_days: i64,
}

impl Default for AuditRules {
    fn default() -> Self {
        let databases = [
            (3, "legacy - scorecard"),
            (34, "legacy - prod"),
            (35, "data_prod"),
            (37, "raw_hex"),
            (38, "raw_portable"),
            (40, "raw_dataddo"),
            (41, "raw_tarmac"),
            (67, "raw_fivetran"),
            (68, "raw_airbyte"),
            (100, "data_stg"),
            (133, "raw_planner"),
        ]
        .into_iter()
        .map(|(id, name)| (id, name.to_string()))
        .collect();

        AuditRules {
            databases,
            production_db_name: "data_prod".to_string(),
            // Onsite embeddings collection.
            excluded_collection_id: 1950,
            // Metabase's own metadata database.
            excluded_db_id: 13371337,
            archive_after_days: 100,
            update_bucket_days: 100,
            usage_bucket_days: 10,
        }
    }
}

impl AuditRules {
    pub fn from_json(raw: &str) -> Result<Self, AuditError> {
        let rules: AuditRules = serde_json::from_str(raw)?;
        if rules.update_bucket_days <= 0 || rules.usage_bucket_days <= 0 {
            return Err(AuditError::Config(
                "bucket widths must be positive".to_string(),
            ));
        }
        Ok(rules)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub metabase: MetabaseConfig,
    pub rules: AuditRules,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AuditError> {
        dotenvy::dotenv().ok();

        let base_url = required("METABASE_URL")?.trim_end_matches('/').to_string();
        let api_key = required("METABASE_API_KEY")?;

        let host = env::var("CARD_AUDIT_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match env::var("CARD_AUDIT_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| AuditError::Config(format!("CARD_AUDIT_PORT is not a port: {raw}")))?,
            Err(_) => DEFAULT_PORT,
        };

        let rules = match env::var("CARD_AUDIT_RULES") {
            Ok(path) => {
                let raw = fs::read_to_string(&path)
                    .map_err(|e| AuditError::Config(format!("cannot read {path}: {e}")))?;
                AuditRules::from_json(&raw)?
            }
            Err(_) => AuditRules::default(),
        };

        Ok(AppConfig {
            host,
            port,
            metabase: MetabaseConfig { base_url, api_key },
            rules,
        })
    }
}

fn required(key: &str) -> Result<String, AuditError> {
    env::var(key).map_err(|_| AuditError::Config(format!("{key} environment variable not set")))
}
