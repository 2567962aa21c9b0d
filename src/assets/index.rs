use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::extensions::AssetExtensions;
use crate::error::Result;
use crate::utils::{compute_file_hash, list_files};

/// 内容哈希 -> 相对路径
///
/// 同一内容的多个文件只保留最后写入的一个路径，内容逐字节相同，取哪个都一样。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashIndex(BTreeMap<String, String>);

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hash: impl Into<String>, path: impl Into<String>) {
        self.0.insert(hash.into(), path.into());
    }

    pub fn get(&self, hash: &str) -> Option<&str> {
        self.0.get(hash).map(String::as_str)
    }

    pub fn contains_hash(&self, hash: &str) -> bool {
        self.0.contains_key(hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(h, p)| (h.as_str(), p.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<H: Into<String>, P: Into<String>> FromIterator<(H, P)> for HashIndex {
    fn from_iter<T: IntoIterator<Item = (H, P)>>(iter: T) -> Self {
        let mut index = HashIndex::new();
        for (hash, path) in iter {
            index.insert(hash, path);
        }
        index
    }
}

/// 遍历 `root_dir`，对扩展名在 `asset_exts` 中的文件计算哈希
///
/// 任一文件读取失败都会让整个索引构建失败。
pub fn build_index(root_dir: &Path, asset_exts: &AssetExtensions) -> Result<HashIndex> {
    let mut index = HashIndex::new();

    for (path, relative) in list_files(root_dir)? {
        if !asset_exts.matches(&relative) {
            continue;
        }
        let hash = compute_file_hash(&path)?;
        log::trace!("{} {}", &hash[..12], relative);
        index.insert(hash, relative);
    }

    log::debug!("{} 中共 {} 个资源", root_dir.display(), index.len());
    Ok(index)
}
