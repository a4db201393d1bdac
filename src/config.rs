use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/storefront_admin".to_string(),
            max_connections: 20,
        }
    }
}

/// 本地开发用签名密钥, 部署时必须覆盖
pub const DEV_SIGNING_SECRET: &str = "dev-signing-secret";

/// 对象存储配置
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: String,
    pub public_base_url: String,
    pub signing_secret: String,
    pub upload_ttl_secs: u64,
    pub default_read_secs: u64,
    pub min_read_secs: u64,
    pub max_read_secs: u64,
    pub max_upload_bytes: usize,
    pub public_prefixes: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "./data/objects".to_string(),
            public_base_url: "http://127.0.0.1:8080".to_string(),
            signing_secret: DEV_SIGNING_SECRET.to_string(),
            upload_ttl_secs: 300,
            default_read_secs: 60,
            min_read_secs: 10,
            max_read_secs: 600,
            max_upload_bytes: 20 * 1024 * 1024,
            public_prefixes: vec![
                "products".to_string(),
                "categories".to_string(),
                "promotions".to_string(),
            ],
        }
    }
}

// 签名密钥不写入日志
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("root", &self.root)
            .field("public_base_url", &self.public_base_url)
            .field("signing_secret", &"***")
            .field("upload_ttl_secs", &self.upload_ttl_secs)
            .field("default_read_secs", &self.default_read_secs)
            .field("min_read_secs", &self.min_read_secs)
            .field("max_read_secs", &self.max_read_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("public_prefixes", &self.public_prefixes)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 → config/default.toml → APP__* 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let mut config: AppConfig = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("storage.public_prefixes")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        config.storage.validate()?;
        if config.storage.uses_dev_secret() {
            tracing::warn!(
                "storage.signing_secret is the development default, set APP__STORAGE__SIGNING_SECRET"
            );
        }
        Ok(config)
    }
}

impl StorageConfig {
    pub fn uses_dev_secret(&self) -> bool {
        self.signing_secret == DEV_SIGNING_SECRET
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_read_secs > self.max_read_secs {
            return Err(ConfigError::Message(format!(
                "storage.min_read_secs ({}) exceeds storage.max_read_secs ({})",
                self.min_read_secs, self.max_read_secs
            )));
        }
        if self.signing_secret.is_empty() {
            return Err(ConfigError::Message(
                "storage.signing_secret must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
