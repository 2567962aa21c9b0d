use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::assets::HashIndex;
use crate::bundle::Platform;
use crate::error::{DiffError, Result};

/// 基线构建的哈希索引缓存，供同一 CI 任务中后续调用复用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineCache {
    pub revision: String,
    pub platform: Platform,
    pub created_at: String,
    pub hashes: HashIndex,
}

impl BaselineCache {
    pub fn new(revision: impl Into<String>, platform: Platform, hashes: HashIndex) -> Self {
        Self {
            revision: revision.into(),
            platform,
            created_at: chrono::Utc::now().to_rfc3339(),
            hashes,
        }
    }

    /// 缓存是否对应同一个基线修订与平台
    pub fn matches(&self, revision: &str, platform: Platform) -> bool {
        self.revision == revision && self.platform == platform
    }
}

pub fn write_baseline_cache(path: &Path, cache: &BaselineCache) -> Result<()> {
    let content = toml::to_string_pretty(cache).map_err(|e| DiffError::serialization(path, e))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(DiffError::io(parent))?;
    }
    fs::write(path, content).map_err(DiffError::io(path))
}

/// 读取缓存；文件不存在返回 `NotFound`，格式错误返回 `Serialization`
pub fn read_baseline_cache(path: &Path) -> Result<BaselineCache> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DiffError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(DiffError::io(path)(e)),
    };
    toml::from_str(&content).map_err(|e| DiffError::serialization(path, e))
}

/// 加载与给定修订、平台匹配的缓存索引，不存在或不匹配时返回 `None`
pub fn load_cached_baseline(
    path: &Path,
    revision: &str,
    platform: Platform,
) -> Result<Option<HashIndex>> {
    match read_baseline_cache(path) {
        Ok(cache) if cache.matches(revision, platform) => Ok(Some(cache.hashes)),
        Ok(cache) => {
            log::warn!(
                "忽略过期的基线缓存 {} (修订 {} / {}，需要 {} / {})",
                path.display(),
                cache.revision,
                cache.platform,
                revision,
                platform
            );
            Ok(None)
        }
        Err(DiffError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
