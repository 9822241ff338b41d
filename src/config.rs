use std::{fs, path::PathBuf};

use fractic_server_error::ServerError;

use crate::errors::{InvalidConfig, ReadError};

/// Top-level configuration, usually loaded from a JSON file:
///
/// ```json
/// {
///   "cache": {
///     "localDbPath": "data/mileage_cache.db",
///     "companyAddress": "100 Depot Rd, Madison, WI 53703"
///   },
///   "aggregation": { "invoiceNumberBase": 5000 }
/// }
/// ```
///
/// Omitted fields take their defaults.
#[derive(Debug, Clone, Default, serde_derive::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillingConfig {
    pub cache: CacheStoreConfig,
    pub aggregation: AggregationConfig,
}

#[derive(Debug, Clone, serde_derive::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheStoreConfig {
    /// Working copy of the cache database.
    pub local_db_path: PathBuf,
    /// Object name of the database snapshot on the remote mirror.
    pub remote_db_object: String,
    /// Object name of the metadata JSON on the remote mirror. The same file
    /// name is used for the local copy next to the database.
    pub remote_metadata_object: String,
    /// Origin of every dead-mileage leg.
    pub company_address: String,
}

#[derive(Debug, Clone, serde_derive::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregationConfig {
    /// Invoice number of the first passenger group in a run.
    pub invoice_number_base: u64,
}

// --

impl Default for CacheStoreConfig {
    fn default() -> Self {
        Self {
            local_db_path: PathBuf::from("mileage_cache.db"),
            remote_db_object: "mileage_cache.db".to_string(),
            remote_metadata_object: "mileage_cache_metadata.json".to_string(),
            company_address: String::new(),
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            invoice_number_base: 1,
        }
    }
}

impl BillingConfig {
    pub fn from_json(s: &str) -> Result<Self, ServerError> {
        let config: Self =
            serde_json::from_str(s).map_err(|e| InvalidConfig::with_debug("malformed JSON", &e))?;
        config.cache.validate()?;
        Ok(config)
    }

    pub fn from_file<P>(path: P) -> Result<Self, ServerError>
    where
        P: AsRef<std::path::Path>,
    {
        Self::from_json(&fs::read_to_string(path).map_err(|e| ReadError::with_debug(&e))?)
    }
}

impl CacheStoreConfig {
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.local_db_path.as_os_str().is_empty() {
            return Err(InvalidConfig::new("localDbPath is empty"));
        }
        if self.remote_db_object.trim().is_empty() || self.remote_metadata_object.trim().is_empty()
        {
            return Err(InvalidConfig::new("remote object names must not be empty"));
        }
        if self.remote_db_object == self.remote_metadata_object {
            return Err(InvalidConfig::new(
                "remoteDbObject and remoteMetadataObject must differ",
            ));
        }
        Ok(())
    }

    /// Local copy of the metadata object, stored next to the database.
    pub(crate) fn local_metadata_path(&self) -> PathBuf {
        self.local_db_path.with_file_name(&self.remote_metadata_object)
    }
}
