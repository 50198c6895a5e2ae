//! AWS Secrets Manager integration.
//!
//! The only secret this service needs is the database credential bundle.
//! Lambda containers are reused across invocations, so the fetched secret
//! string is cached per ARN for the life of the process.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::{Error, Result};

static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Database credentials as provisioned in Secrets Manager. Host, port and
/// database name are optional overrides; the environment configuration
/// supplies them otherwise.
#[derive(Debug, Deserialize)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
}

/// Fetch and parse database credentials, reading through the process cache.
pub async fn get_database_credentials(
    client: &SecretsClient,
    secret_arn: &str,
) -> Result<DatabaseCredentials> {
    if let Some(cached) = cache().read().await.get(secret_arn) {
        return parse_credentials(cached);
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    let credentials = parse_credentials(&secret_string)?;

    cache()
        .write()
        .await
        .insert(secret_arn.to_string(), secret_string);

    Ok(credentials)
}

fn parse_credentials(secret_string: &str) -> Result<DatabaseCredentials> {
    serde_json::from_str(secret_string)
        .map_err(|e| Error::Aws(format!("Failed to parse database credentials: {}", e)))
}

/// Clear the secrets cache (useful for testing or credential rotation).
pub async fn clear_cache() {
    cache().write().await.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credentials() {
        let json = r#"{"username":"fmadmin","password":"secret123","port":5432,"dbname":"facility_ms"}"#;
        let creds = parse_credentials(json).unwrap();
        assert_eq!(creds.username, "fmadmin");
        assert_eq!(creds.password, "secret123");
        assert_eq!(creds.host, None);
        assert_eq!(creds.dbname, Some("facility_ms".to_string()));
    }

    #[test]
    fn test_parse_credentials_rejects_incomplete_secret() {
        assert!(parse_credentials(r#"{"username":"fmadmin"}"#).is_err());
    }
}
