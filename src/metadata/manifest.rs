use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::assets::MainAssets;
use crate::error::{DiffError, Result};

/// 变化资源列表，用于差异报告
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangedAssetsManifest(pub BTreeSet<String>);

impl ChangedAssetsManifest {
    pub fn write(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn read(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 随应用打包的资源清单：资源标识 -> (scale -> 主包路径)
///
/// 运行时据此把被剔除的资源解析回已安装的主包。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest(pub BTreeMap<String, MainAssets>);

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main_assets(&self, asset: &str) -> Option<&MainAssets> {
        self.0.get(asset)
    }

    /// 查找某个资源在某个倍率下的主包路径
    pub fn lookup(&self, asset: &str, scale: &str) -> Option<&str> {
        self.0.get(asset)?.get(scale).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn read(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content =
        serde_json::to_string_pretty(value).map_err(|e| DiffError::serialization(path, e))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(DiffError::io(parent))?;
    }
    fs::write(path, content).map_err(DiffError::io(path))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DiffError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(DiffError::io(path)(e)),
    };
    serde_json::from_str(&content).map_err(|e| DiffError::serialization(path, e))
}

/// 打包进应用的清单文件位置
///
/// 占用时写入空对象；除非调用 `commit`，离开作用域时（包括出错返回）
/// 会再次重置为空对象，保证中途失败不会留下残缺清单。
#[derive(Debug)]
pub struct ManifestSlot {
    path: PathBuf,
    armed: bool,
}

impl ManifestSlot {
    pub fn claim(path: impl Into<PathBuf>) -> Result<Self> {
        let slot = Self {
            path: path.into(),
            armed: true,
        };
        slot.reset()?;
        Ok(slot)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&mut self, manifest: &AssetManifest) -> Result<()> {
        log::info!("写入资源清单 {}", self.path.display());
        manifest.write(&self.path)
    }

    /// 流程成功完成，保留已写入的内容
    pub fn commit(mut self) {
        self.armed = false;
    }

    fn reset(&self) -> Result<()> {
        AssetManifest::new().write(&self.path)
    }
}

impl Drop for ManifestSlot {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.reset() {
            log::error!("无法重置资源清单 {}: {}", self.path.display(), e);
        }
    }
}
