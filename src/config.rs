use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use uuid::Uuid;

use crate::errors::{PortalError, Result};
use crate::interest::GrossReporting;

/// portal configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub host: String,
    pub port: u16,
    /// shared secret expected in `x-cron-secret`; unset rejects every run
    pub cron_secret: Option<String>,
    /// shared secret expected in `x-admin-secret`; unset disables admin routes
    pub admin_secret: Option<String>,
    pub signing_secret: String,
    pub public_base_url: String,
    pub data_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub loans_file: PathBuf,
    pub currency: String,
    pub gross_reporting: GrossReporting,
    pub signed_url_ttl_secs: u64,
    /// header text on generated receipts
    pub issuer_name: String,
}

impl std::fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "<set>"))
            .field("admin_secret", &self.admin_secret.as_ref().map(|_| "<set>"))
            .field("public_base_url", &self.public_base_url)
            .field("data_dir", &self.data_dir)
            .field("storage_dir", &self.storage_dir)
            .field("loans_file", &self.loans_file)
            .field("currency", &self.currency)
            .field("gross_reporting", &self.gross_reporting)
            .field("signed_url_ttl_secs", &self.signed_url_ttl_secs)
            .field("issuer_name", &self.issuer_name)
            .finish_non_exhaustive()
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("./data");
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cron_secret: None,
            admin_secret: None,
            signing_secret: Uuid::new_v4().simple().to_string(),
            public_base_url: "http://127.0.0.1:8080".to_string(),
            storage_dir: data_dir.join("storage"),
            loans_file: data_dir.join("loans.json"),
            data_dir,
            currency: "EUR".to_string(),
            gross_reporting: GrossReporting::Rounded,
            signed_url_ttl_secs: 60,
            issuer_name: "Investor Portal".to_string(),
        }
    }
}

impl PortalConfig {
    /// load config from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// load config from any key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get("HOST").unwrap_or(defaults.host);
        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| invalid(format!("PORT is not a port number: {raw}")))?,
            None => defaults.port,
        };
        let data_dir = get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir);
        let storage_dir = get("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("storage"));
        let loans_file = get("LOANS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("loans.json"));
        let gross_reporting = match get("GROSS_REPORTING") {
            Some(raw) => raw.parse().map_err(invalid)?,
            None => defaults.gross_reporting,
        };
        let signed_url_ttl_secs = match get("SIGNED_URL_TTL_SECS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| invalid(format!("SIGNED_URL_TTL_SECS is not a number: {raw}")))?,
            None => defaults.signed_url_ttl_secs,
        };
        let public_base_url = get("PUBLIC_BASE_URL").unwrap_or_else(|| format!("http://{host}:{port}"));

        let config = Self {
            host,
            port,
            cron_secret: get("CRON_SECRET"),
            admin_secret: get("ADMIN_SECRET"),
            signing_secret: get("SIGNING_SECRET").unwrap_or(defaults.signing_secret),
            public_base_url,
            data_dir,
            storage_dir,
            loans_file,
            currency: get("CURRENCY").unwrap_or(defaults.currency),
            gross_reporting,
            signed_url_ttl_secs,
            issuer_name: get("ISSUER_NAME").unwrap_or(defaults.issuer_name),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.signing_secret.is_empty() {
            return Err(invalid("signing secret must not be empty"));
        }
        if self.signed_url_ttl_secs == 0 {
            return Err(invalid("signed URL TTL must be positive"));
        }
        if self.currency.is_empty() {
            return Err(invalid("currency must not be empty"));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::seconds(self.signed_url_ttl_secs as i64)
    }

    pub fn receipts_file(&self) -> PathBuf {
        self.data_dir.join("receipts.json")
    }

    pub fn documents_file(&self) -> PathBuf {
        self.data_dir.join("documents.json")
    }
}

fn invalid(message: impl Into<String>) -> PortalError {
    PortalError::Configuration {
        message: message.into(),
    }
}
