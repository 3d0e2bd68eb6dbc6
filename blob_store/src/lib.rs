use std::{env, fmt, sync::Arc};

use bytes::Bytes;
use object_store::{
    aws::AmazonS3Builder,
    azure::MicrosoftAzureBuilder,
    parse_url,
    path::Path,
    ObjectStore,
    ObjectStoreScheme,
    PutPayload,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

mod error;
pub use error::{BlobError, BlobResult};

#[derive(Clone, Serialize, Deserialize)]
pub struct AzureCredentials {
    pub account_name: String,
    pub account_key: String,
}

impl fmt::Debug for AzureCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureCredentials")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobStorageConfig {
    /// Base URL of the store: `az://container`, `s3://bucket/prefix`,
    /// `file:///abs/dir` or `memory:///`.
    pub path: String,
    #[serde(default)]
    pub azure: Option<AzureCredentials>,
}

impl BlobStorageConfig {
    pub fn new(path: &str) -> Self {
        BlobStorageConfig {
            path: format!("file://{}", path),
            azure: None,
        }
    }

    pub fn azure(container: &str, credentials: AzureCredentials) -> Self {
        BlobStorageConfig {
            path: format!("az://{}", container),
            azure: Some(credentials),
        }
    }
}

impl Default for BlobStorageConfig {
    fn default() -> Self {
        let blob_store_path = env::current_dir()
            .unwrap_or_else(|_| env::temp_dir())
            .join("dataflow_storage/blobs");
        Self::new(&blob_store_path.to_string_lossy())
    }
}

#[derive(Debug, Clone)]
pub struct PutResult {
    pub url: String,
    pub size_bytes: u64,
    pub sha256_hash: String,
}

/// How stored objects are addressed in responses.
#[derive(Debug, Clone)]
enum Location {
    AzureBlob { account: String, container: String },
    Prefix(String),
}

impl Location {
    fn url_for(&self, path: &Path) -> String {
        match self {
            Location::AzureBlob { account, container } => {
                format!("https://{account}.blob.core.windows.net/{container}/{path}")
            }
            Location::Prefix(prefix) => format!("{prefix}{path}"),
        }
    }
}

#[derive(Clone)]
pub struct BlobStorage {
    object_store: Arc<dyn ObjectStore>,
    path: Path,
    location: Location,
}

impl fmt::Debug for BlobStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStorage")
            .field("path", &self.path)
            .field("location", &self.location)
            .finish()
    }
}

impl BlobStorage {
    pub fn new(config: BlobStorageConfig) -> BlobResult<Self> {
        let url = Url::parse(&config.path).map_err(|e| BlobError::InvalidUrl {
            url: config.path.clone(),
            reason: e.to_string(),
        })?;
        let (object_store, path, location) =
            Self::build_object_store(&url, config.azure.as_ref())?;
        info!(url = %config.path, "using blob store");
        Ok(Self {
            object_store,
            path,
            location,
        })
    }

    fn build_object_store(
        url: &Url,
        azure: Option<&AzureCredentials>,
    ) -> BlobResult<(Arc<dyn ObjectStore>, Path, Location)> {
        let (scheme, path) = ObjectStoreScheme::parse(url).map_err(|e| BlobError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let host = url.host_str().unwrap_or_default().to_string();
        let prefix = Location::Prefix(format!("{}://{}/", url.scheme(), host));

        match scheme {
            ObjectStoreScheme::MicrosoftAzure => {
                // explicit credentials win over AZURE_* environment variables.
                let mut builder = MicrosoftAzureBuilder::from_env().with_url(url.as_str());
                let mut account = env::var("AZURE_STORAGE_ACCOUNT_NAME").ok();
                if let Some(credentials) = azure {
                    builder = builder
                        .with_account(&credentials.account_name)
                        .with_access_key(&credentials.account_key);
                    account = Some(credentials.account_name.clone());
                }
                let store = builder.build()?;
                let location = match account {
                    Some(account) => Location::AzureBlob {
                        account,
                        container: host,
                    },
                    None => prefix,
                };
                Ok((Arc::new(store), path, location))
            }
            ObjectStoreScheme::AmazonS3 => {
                let store = AmazonS3Builder::from_env().with_url(url.as_str()).build()?;
                Ok((Arc::new(store), path, prefix))
            }
            _ => {
                let (store, path) = parse_url(url)?;
                Ok((Arc::from(store), path, prefix))
            }
        }
    }

    /// Resolves a flat object name to its path inside the configured base.
    pub fn object_path(&self, key: &str) -> BlobResult<Path> {
        validate_key(key)?;
        Ok(self.path.child(key))
    }

    /// Public URL of the object stored under `key`.
    pub fn url_for(&self, key: &str) -> BlobResult<String> {
        Ok(self.location.url_for(&self.object_path(key)?))
    }

    /// Stores `data` under `key`, replacing any previous object.
    pub async fn put(&self, key: &str, data: Bytes) -> BlobResult<PutResult> {
        let path = self.object_path(key)?;
        let sha256_hash = format!("{:x}", Sha256::digest(&data));
        let size_bytes = data.len() as u64;

        self.object_store
            .put(&path, PutPayload::from(data))
            .await?;
        debug!(%path, size_bytes, "stored blob");

        Ok(PutResult {
            url: self.location.url_for(&path),
            size_bytes,
            sha256_hash,
        })
    }

    pub async fn get(&self, key: &str) -> BlobResult<Bytes> {
        let path = self.object_path(key)?;
        let result = match self.object_store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(BlobError::NotFound {
                    key: key.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let bytes = result.bytes().await?;
        debug!(%path, size_bytes = bytes.len(), "read blob");
        Ok(bytes)
    }
}

fn validate_key(key: &str) -> BlobResult<()> {
    let reason = if key.trim().is_empty() {
        "name is empty"
    } else if key == "." || key == ".." {
        "relative path segments are not allowed"
    } else if key.contains(['/', '\\']) {
        "path separators are not allowed"
    } else if key.chars().any(char::is_control) {
        "control characters are not allowed"
    } else {
        return Ok(());
    };
    Err(BlobError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_storage(dir: &tempfile::TempDir) -> BlobStorage {
        BlobStorage::new(BlobStorageConfig::new(&dir.path().to_string_lossy())).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = disk_storage(&dir);

        let data = Bytes::from_static(b"Product,Amount\nWidgetA,100\n");
        let put = storage.put("sales.csv", data.clone()).await.unwrap();

        assert_eq!(put.size_bytes, data.len() as u64);
        assert_eq!(put.sha256_hash.len(), 64);
        assert!(put.url.starts_with("file:///"));
        assert!(put.url.ends_with("/sales.csv"));
        assert!(dir.path().join("sales.csv").exists());

        assert_eq!(storage.get("sales.csv").await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_put_overwrites_previous_blob() {
        let storage = BlobStorage::new(BlobStorageConfig {
            path: "memory:///".to_string(),
            azure: None,
        })
        .unwrap();

        storage.put("a.csv", Bytes::from_static(b"first")).await.unwrap();
        storage.put("a.csv", Bytes::from_static(b"second")).await.unwrap();

        assert_eq!(
            storage.get("a.csv").await.unwrap(),
            Bytes::from_static(b"second")
        );
    }

    #[tokio::test]
    async fn test_get_missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = disk_storage(&dir);

        let err = storage.get("missing.csv").await.unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err:?}");
    }

    #[test]
    fn test_rejects_unsafe_names() {
        let storage = BlobStorage::new(BlobStorageConfig {
            path: "memory:///".to_string(),
            azure: None,
        })
        .unwrap();

        for key in ["", "  ", ".", "..", "a/b.csv", "..\\x.csv", "a\nb"] {
            let err = storage.object_path(key).unwrap_err();
            assert!(
                matches!(err, BlobError::InvalidKey { .. }),
                "{key:?} accepted"
            );
        }
        assert!(storage.object_path("sales 2024.csv").is_ok());
    }

    #[test]
    fn test_azure_location_uses_account_endpoint() {
        let storage = BlobStorage::new(BlobStorageConfig::azure(
            "dataflow",
            AzureCredentials {
                account_name: "salesacct".to_string(),
                // base64 of "fake-key"
                account_key: "ZmFrZS1rZXk=".to_string(),
            },
        ))
        .unwrap();

        assert_eq!(
            storage.url_for("sales.csv").unwrap(),
            "https://salesacct.blob.core.windows.net/dataflow/sales.csv"
        );
    }

    #[test]
    fn test_invalid_url() {
        let err = BlobStorage::new(BlobStorageConfig {
            path: "not a url".to_string(),
            azure: None,
        })
        .unwrap_err();
        assert!(matches!(err, BlobError::InvalidUrl { .. }));
    }

    #[test]
    fn test_credentials_are_redacted() {
        let credentials = AzureCredentials {
            account_name: "salesacct".to_string(),
            account_key: "secret".to_string(),
        };
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("salesacct"));
        assert!(!rendered.contains("secret"));
    }
}
