use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

// RFC 3986 unreserved 字符之外全部编码
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// 对象存储后端
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> std::io::Result<()>;
    async fn get(&self, key: &str) -> std::io::Result<Option<Vec<u8>>>;
    /// 返回对象是否存在并被删除
    async fn delete(&self, key: &str) -> std::io::Result<bool>;
}

/// 以根目录下文件保存对象
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> std::io::Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await
    }

    async fn get(&self, key: &str) -> std::io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, key: &str) -> std::io::Result<bool> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// 限时对象 URL 的 HMAC-SHA256 签名
pub struct UrlSigner {
    secret: Vec<u8>,
}

impl UrlSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self, method: &str, key: &str, expires_at: i64) -> AppResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        mac.update(format!("{}\n{}\n{}", method, key, expires_at).as_bytes());
        Ok(mac)
    }

    pub fn sign(&self, method: &str, key: &str, expires_at: i64) -> AppResult<String> {
        Ok(hex::encode(self.mac(method, key, expires_at)?.finalize().into_bytes()))
    }

    pub fn verify(
        &self,
        method: &str,
        key: &str,
        expires_at: i64,
        signature: &str,
        now: i64,
    ) -> AppResult<()> {
        let provided = hex::decode(signature).map_err(|_| AppError::InvalidSignature)?;
        self.mac(method, key, expires_at)?
            .verify_slice(&provided)
            .map_err(|_| AppError::InvalidSignature)?;
        if now > expires_at {
            return Err(AppError::LinkExpired);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadFile {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresignUploadRequest {
    pub files: Vec<UploadFile>,
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub key: String,
    pub upload_url: String,
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresignUploadResponse {
    pub items: Vec<PresignedUpload>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignReadResponse {
    pub url: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteObjectResponse {
    pub success: bool,
    pub key: String,
}

/// 预签名上传/下载与对象删除
pub struct StorageService {
    signer: UrlSigner,
    store: Arc<dyn ObjectStore>,
    config: StorageConfig,
}

impl StorageService {
    pub fn new(config: StorageConfig, store: Arc<dyn ObjectStore>) -> Self {
        if config.min_read_secs > config.max_read_secs {
            tracing::warn!(
                "min_read_secs {} exceeds max_read_secs {}, using {} for both",
                config.min_read_secs,
                config.max_read_secs,
                config.min_read_secs
            );
        }
        Self {
            signer: UrlSigner::new(&config.signing_secret),
            store,
            config,
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// 下载有效期限制在配置窗口内, 窗口倒置时以下限为准
    pub fn clamp_read_expiry(&self, requested: Option<u64>) -> u64 {
        let min = self.config.min_read_secs;
        let max = self.config.max_read_secs.max(min);
        requested
            .unwrap_or(self.config.default_read_secs)
            .clamp(min, max)
    }

    pub fn presign_upload(&self, req: &PresignUploadRequest) -> AppResult<PresignUploadResponse> {
        let prefix = req.prefix.trim_matches('/');
        validate_key(prefix)?;
        if req.files.is_empty() {
            return Err(AppError::BadRequest("No files to upload".to_string()));
        }
        if let Some(file) = req
            .files
            .iter()
            .find(|f| f.name.trim().is_empty() || f.content_type.trim().is_empty())
        {
            return Err(AppError::BadRequest(format!(
                "File '{}' needs a name and a content type",
                file.name
            )));
        }

        let expires_at = Utc::now().timestamp() + self.config.upload_ttl_secs as i64;
        let items = req
            .files
            .iter()
            .map(|file| {
                let key = format!(
                    "{}/{}-{}",
                    prefix,
                    uuid::Uuid::new_v4(),
                    sanitize_file_name(&file.name)
                );
                let signature = self.signer.sign("PUT", &key, expires_at)?;
                Ok(PresignedUpload {
                    upload_url: self.signed_url(&key, expires_at, &signature),
                    public_url: self.public_url(&key),
                    key,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        tracing::info!("Presigned {} upload(s) under {}", items.len(), prefix);
        Ok(PresignUploadResponse { items })
    }

    pub fn presign_read(&self, key: &str, expires: Option<u64>) -> AppResult<PresignReadResponse> {
        validate_key(key)?;
        let expires_in = self.clamp_read_expiry(expires);
        let expires_at = Utc::now().timestamp() + expires_in as i64;
        let signature = self.signer.sign("GET", key, expires_at)?;
        Ok(PresignReadResponse {
            url: self.signed_url(key, expires_at, &signature),
            expires_in,
        })
    }

    pub async fn delete(&self, key: &str) -> AppResult<DeleteObjectResponse> {
        validate_key(key)?;
        let removed = self.store.delete(key).await?;
        tracing::info!("Deleted object {} (existed: {})", key, removed);
        Ok(DeleteObjectResponse {
            success: true,
            key: key.to_string(),
        })
    }

    /// 并发删除多个对象, 逐个返回结果, 失败不重试
    pub async fn delete_many(&self, keys: &[String]) -> Vec<(String, AppResult<()>)> {
        let results = join_all(keys.iter().map(|key| async move {
            let result = self.delete(key).await.map(|_| ());
            (key.clone(), result)
        }))
        .await;
        for (key, result) in &results {
            if let Err(e) = result {
                tracing::warn!("Failed to delete object {}: {}", key, e);
            }
        }
        results
    }

    pub async fn put_signed(
        &self,
        key: &str,
        expires_at: i64,
        signature: &str,
        bytes: Vec<u8>,
    ) -> AppResult<()> {
        validate_key(key)?;
        self.signer
            .verify("PUT", key, expires_at, signature, Utc::now().timestamp())?;
        let size = bytes.len();
        self.store.put(key, bytes).await?;
        tracing::info!("Stored object {} ({} bytes)", key, size);
        Ok(())
    }

    pub async fn get_signed(&self, key: &str, expires_at: i64, signature: &str) -> AppResult<Vec<u8>> {
        validate_key(key)?;
        self.signer
            .verify("GET", key, expires_at, signature, Utc::now().timestamp())?;
        self.read(key).await
    }

    /// 无签名读取, 仅限公开前缀
    pub async fn get_public(&self, key: &str) -> AppResult<Vec<u8>> {
        validate_key(key)?;
        if !self.is_public(key) {
            return Err(AppError::NotFound(format!("object {}", key)));
        }
        self.read(key).await
    }

    pub fn is_public(&self, key: &str) -> bool {
        key.split('/')
            .next()
            .map_or(false, |first| self.config.public_prefixes.iter().any(|p| p == first))
    }

    async fn read(&self, key: &str) -> AppResult<Vec<u8>> {
        self.store
            .get(key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("object {}", key)))
    }

    fn signed_url(&self, key: &str, expires_at: i64, signature: &str) -> String {
        format!(
            "{}/objects/{}?expires={}&signature={}",
            self.config.public_base_url.trim_end_matches('/'),
            encode_key(key),
            expires_at,
            signature
        )
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/public/{}",
            self.config.public_base_url.trim_end_matches('/'),
            encode_key(key)
        )
    }
}

// 逐段编码, 保留 `/` 分隔
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|seg| utf8_percent_encode(seg, KEY_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// key 必须是由普通路径段组成的相对路径
pub fn validate_key(key: &str) -> AppResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid object key: {}", key)))
    }
}

pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .take(100)
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (StorageService, PathBuf) {
        let root = std::env::temp_dir().join(format!("storage-test-{}", uuid::Uuid::new_v4()));
        let config = StorageConfig {
            root: root.to_string_lossy().into_owned(),
            public_base_url: "http://localhost:8080/".to_string(),
            signing_secret: "test-secret".to_string(),
            ..StorageConfig::default()
        };
        let store = Arc::new(LocalObjectStore::new(root.clone()));
        (StorageService::new(config, store), root)
    }

    fn query_param(url: &str, name: &str) -> String {
        url.split(['?', '&'])
            .find_map(|part| part.strip_prefix(&format!("{}=", name)))
            .unwrap()
            .to_string()
    }

    #[test]
    fn read_expiry_is_clamped() {
        let (storage, _) = service();
        assert_eq!(storage.presign_read("docs/a.pdf", Some(5)).unwrap().expires_in, 10);
        assert_eq!(storage.presign_read("docs/a.pdf", Some(9999)).unwrap().expires_in, 600);
        assert_eq!(storage.presign_read("docs/a.pdf", Some(120)).unwrap().expires_in, 120);
        assert_eq!(storage.presign_read("docs/a.pdf", None).unwrap().expires_in, 60);
    }

    #[test]
    fn signature_binds_method_and_key() {
        let signer = UrlSigner::new("secret");
        let sig = signer.sign("PUT", "products/a.png", 1000).unwrap();
        assert!(signer.verify("PUT", "products/a.png", 1000, &sig, 999).is_ok());
        assert!(matches!(
            signer.verify("GET", "products/a.png", 1000, &sig, 999),
            Err(AppError::InvalidSignature)
        ));
        assert!(matches!(
            signer.verify("PUT", "products/b.png", 1000, &sig, 999),
            Err(AppError::InvalidSignature)
        ));
        assert!(matches!(
            signer.verify("PUT", "products/a.png", 1000, &sig, 1001),
            Err(AppError::LinkExpired)
        ));
        assert!(matches!(
            signer.verify("PUT", "products/a.png", 1000, "zz", 999),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn presign_upload_builds_keys_under_prefix() {
        let (storage, _) = service();
        let req = PresignUploadRequest {
            files: vec![UploadFile {
                name: "front view.PNG".to_string(),
                content_type: "image/png".to_string(),
            }],
            prefix: "/products/".to_string(),
        };
        let res = storage.presign_upload(&req).unwrap();
        let item = &res.items[0];
        assert!(item.key.starts_with("products/"));
        assert!(item.key.ends_with("-front-view.PNG"));
        assert!(item
            .upload_url
            .starts_with(&format!("http://localhost:8080/objects/{}?expires=", item.key)));
        assert_eq!(item.public_url, format!("http://localhost:8080/public/{}", item.key));
    }

    #[test]
    fn presign_upload_rejects_bad_input() {
        let (storage, _) = service();
        let empty = PresignUploadRequest {
            files: vec![],
            prefix: "products".to_string(),
        };
        assert!(matches!(storage.presign_upload(&empty), Err(AppError::BadRequest(_))));
        let traversal = PresignUploadRequest {
            files: vec![UploadFile {
                name: "a.png".to_string(),
                content_type: "image/png".to_string(),
            }],
            prefix: "../etc".to_string(),
        };
        assert!(matches!(storage.presign_upload(&traversal), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn signed_put_then_get_then_delete() {
        let (storage, root) = service();
        let req = PresignUploadRequest {
            files: vec![UploadFile {
                name: "license.pdf".to_string(),
                content_type: "application/pdf".to_string(),
            }],
            prefix: "providers".to_string(),
        };
        let item = storage.presign_upload(&req).unwrap().items.remove(0);
        let expires: i64 = query_param(&item.upload_url, "expires").parse().unwrap();
        let signature = query_param(&item.upload_url, "signature");
        storage
            .put_signed(&item.key, expires, &signature, b"pdf".to_vec())
            .await
            .unwrap();

        // 上传签名不能用于下载
        assert!(matches!(
            storage.get_signed(&item.key, expires, &signature).await,
            Err(AppError::InvalidSignature)
        ));
        let read = storage.presign_read(&item.key, Some(60)).unwrap();
        let read_expires: i64 = query_param(&read.url, "expires").parse().unwrap();
        let read_sig = query_param(&read.url, "signature");
        assert_eq!(
            storage.get_signed(&item.key, read_expires, &read_sig).await.unwrap(),
            b"pdf".to_vec()
        );
        // providers 不是公开前缀
        assert!(matches!(storage.get_public(&item.key).await, Err(AppError::NotFound(_))));

        let deleted = storage.delete(&item.key).await.unwrap();
        assert!(deleted.success);
        assert!(matches!(
            storage.get_signed(&item.key, read_expires, &read_sig).await,
            Err(AppError::NotFound(_))
        ));
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn delete_many_reports_each_key() {
        let (storage, root) = service();
        let results = storage
            .delete_many(&["products/a.png".to_string(), "../bad".to_string()])
            .await;
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(AppError::BadRequest(_))));
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my-photo--1-.jpg");
        assert_eq!(sanitize_file_name("../.."), "-");
        assert_eq!(sanitize_file_name("   "), "file");
    }

    #[test]
    fn inverted_read_window_uses_lower_bound() {
        let config = StorageConfig {
            min_read_secs: 700,
            max_read_secs: 600,
            ..StorageConfig::default()
        };
        let storage = StorageService::new(config, Arc::new(LocalObjectStore::new("unused")));
        assert_eq!(storage.clamp_read_expiry(None), 700);
        assert_eq!(storage.clamp_read_expiry(Some(9999)), 700);
    }

    #[tokio::test]
    async fn keys_are_encoded_in_urls() {
        let (storage, root) = service();
        let read = storage.presign_read("providers/tax form #2.pdf", Some(60)).unwrap();
        assert!(read
            .url
            .starts_with("http://localhost:8080/objects/providers/tax%20form%20%232.pdf?expires="));
        assert_eq!(
            storage.public_url("products/a b.png"),
            "http://localhost:8080/public/products/a%20b.png"
        );

        // 签名针对解码后的 key
        storage
            .store
            .put("providers/tax form #2.pdf", b"pdf".to_vec())
            .await
            .unwrap();
        let expires: i64 = query_param(&read.url, "expires").parse().unwrap();
        let signature = query_param(&read.url, "signature");
        assert_eq!(
            storage
                .get_signed("providers/tax form #2.pdf", expires, &signature)
                .await
                .unwrap(),
            b"pdf".to_vec()
        );
        let _ = std::fs::remove_dir_all(root);
    }
}
