use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub post_api: PostApiConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// ReliefWeb read API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub url: String,
    /// Sent as the `appname` query parameter with every request
    #[serde(default = "default_appname")]
    pub appname: String,
    #[serde(default = "default_timeout")]
    pub timeout: HumanDuration,
    #[serde(default = "default_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Public ReliefWeb website, used when rewriting API URLs
    #[serde(default = "default_website")]
    pub website: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            appname: default_appname(),
            timeout: default_timeout(),
            connect_timeout: default_timeout(),
            user_agent: default_user_agent(),
            website: default_website(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.reliefweb.int/v1".to_string()
}

fn default_appname() -> String {
    "reliefweb-sync".to_string()
}

fn default_timeout() -> HumanDuration {
    HumanDuration::from_secs(5)
}

fn default_user_agent() -> String {
    concat!("reliefweb-sync/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_website() -> String {
    "https://reliefweb.int".to_string()
}

/// Cache backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Memory,
    #[default]
    Fjall,
}

/// Response cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_lifetime")]
    pub lifetime: HumanDuration,
    #[serde(default = "default_cache_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub backend: CacheBackendKind,
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Extra cache tags per API resource
    #[serde(default)]
    pub resource_tags: HashMap<String, Vec<String>>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lifetime: default_cache_lifetime(),
            namespace: default_cache_namespace(),
            backend: CacheBackendKind::default(),
            path: default_cache_path(),
            resource_tags: HashMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_lifetime() -> HumanDuration {
    HumanDuration::from_secs(300)
}

fn default_cache_namespace() -> String {
    "reliefweb:api".to_string()
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/cache")
}

/// ReliefWeb POST API settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PostApiConfig {
    /// Base URL of the JSON schemas, `{schema_url}/{type}.json`
    pub schema_url: Option<String>,
    /// Base URL used to derive the unique URL of each submission
    pub submission_base_url: Option<String>,
    pub provider_id: Option<String>,
    /// POST API key (loaded from environment, not from config file)
    #[serde(skip)]
    pub api_key: Option<String>,
}

/// Webhook server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Externally reachable base URL, used for file preview links
    #[serde(default = "default_public_url")]
    pub public_url: String,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_url: default_public_url(),
            store_path: default_store_path(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/resources")
}

/// Attachment storage provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Memory,
    #[default]
    Local,
}

/// Attachment storage settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// How long temporary files are kept before garbage collection
    #[serde(default = "default_temporary_grace")]
    pub temporary_grace: HumanDuration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::default(),
            root: default_storage_root(),
            temporary_grace: default_temporary_grace(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("data/files")
}

fn default_temporary_grace() -> HumanDuration {
    HumanDuration::from_secs(6 * 3_600)
}
