//! 本地键值存储
//!
//! 以 JSON 形式按字符串键保存值。底层原始存储可替换：
//! 内存实现用于测试，文件实现作为命令行客户端的持久化会话存储。
//!
//! 读取永远不会向调用方报错：键不存在、值为字面量 `undefined`、
//! 或无法解析时都返回 `None`，无法解析时还会把该键重置为空字符串。

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// 原始字符串存储后端
pub trait StorageBackend: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.insert(key.to_string(), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.remove(key);
    }
}

/// 基于单个 JSON 文件的存储
///
/// 文件内容是 `{ key: raw_string }` 映射，每次写入都会整体落盘。
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    items: Mutex<HashMap<String, String>>,
}

impl FileBackend {
    /// 打开存储文件；文件不存在或损坏时从空存储开始
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();

        let items = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Storage file corrupted, starting empty");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read storage file");
                HashMap::new()
            }
        };

        Self {
            path,
            items: Mutex::new(items),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &HashMap<String, String>) {
        let content = match serde_json::to_string_pretty(items) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize storage");
                return;
            }
        };

        if let Err(e) = self.write_file(&content) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write storage file");
        }
    }

    /// 先写临时文件再重命名；文件中保存令牌，Unix 下只允许所有者读写
    fn write_file(&self, content: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp, &self.path)
    }
}

impl StorageBackend for FileBackend {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.insert(key.to_string(), value.to_string());
        self.persist(&items);
    }

    fn remove_item(&self, key: &str) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        if items.remove(key).is_some() {
            self.persist(&items);
        }
    }
}

/// JSON 键值存储服务
#[derive(Clone)]
pub struct StorageService {
    backend: Arc<dyn StorageBackend>,
}

impl StorageService {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// 序列化为 JSON 后写入
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.backend.set_item(key, &json),
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to serialize storage value"),
        }
    }

    /// 读取并解析 JSON
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.backend.get_item(key)?;
        if raw.is_empty() || raw == "undefined" {
            return None;
        }

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Storage value could not be parsed, resetting key");
                self.backend.set_item(key, "");
                None
            }
        }
    }

    pub fn remove(&self, key: &str) {
        self.backend.remove_item(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        id: i64,
        username: String,
        roles: Vec<String>,
    }

    #[test]
    fn test_get_missing_key() {
        let storage = StorageService::in_memory();
        assert_eq!(storage.get::<String>("never-written"), None);
    }

    #[test]
    fn test_set_then_get() {
        let storage = StorageService::in_memory();
        let snapshot = Snapshot {
            id: 7,
            username: "alice".to_string(),
            roles: vec!["ADMIN".to_string(), "USER".to_string()],
        };

        storage.set("auth-data", &snapshot);
        assert_eq!(storage.get::<Snapshot>("auth-data"), Some(snapshot));

        storage.set("auth-token", "Bearer abc");
        assert_eq!(storage.backend().get_item("auth-token").as_deref(), Some("\"Bearer abc\""));
        assert_eq!(storage.get::<String>("auth-token").as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_literal_undefined_is_absent() {
        let storage = StorageService::in_memory();
        storage.backend().set_item("auth-token", "undefined");
        assert_eq!(storage.get::<String>("auth-token"), None);
        // 字面量 undefined 不触发重置
        assert_eq!(storage.backend().get_item("auth-token").as_deref(), Some("undefined"));
    }

    #[test]
    fn test_unparsable_value_is_reset() {
        let storage = StorageService::in_memory();
        storage.backend().set_item("auth-data", "{not json");

        assert_eq!(storage.get::<serde_json::Value>("auth-data"), None);
        assert_eq!(storage.backend().get_item("auth-data").as_deref(), Some(""));
        assert_eq!(storage.get::<serde_json::Value>("auth-data"), None);
    }

    #[test]
    fn test_remove() {
        let storage = StorageService::in_memory();
        storage.set("auth-token", "Bearer abc");
        storage.remove("auth-token");
        assert_eq!(storage.get::<String>("auth-token"), None);
    }

    #[test]
    fn test_file_backend_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let storage = StorageService::new(Arc::new(FileBackend::open(&path)));
        storage.set("auth-token", "Bearer persisted");

        let reopened = StorageService::new(Arc::new(FileBackend::open(&path)));
        assert_eq!(reopened.get::<String>("auth-token").as_deref(), Some("Bearer persisted"));
    }

    #[test]
    fn test_file_backend_corrupted_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "garbage").unwrap();

        let backend = FileBackend::open(&path);
        assert_eq!(backend.get_item("auth-token"), None);
    }

    #[test]
    fn test_file_backend_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("account").join("session.json");

        let storage = StorageService::new(Arc::new(FileBackend::open(&path)));
        storage.set("auth-token", "Bearer nested");

        assert!(path.exists());
        let reopened = StorageService::new(Arc::new(FileBackend::open(&path)));
        assert_eq!(reopened.get::<String>("auth-token").as_deref(), Some("Bearer nested"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_backend_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let backend = FileBackend::open(&path);
        backend.set_item("auth-token", "\"Bearer abc\"");

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
