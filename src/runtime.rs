//! 设备端的资源解析
//!
//! 更新包中被剔除的资源需要从已安装的主包中加载。应用启动时用随包清单构造
//! 一个 [`AssetResolver`] 并调用 [`install`] 安装一次，之后每次解析资源都经由
//! [`resolve`]：清单中有对应倍率的条目时指向主包，否则使用更新包自身的默认位置。

use std::path::Path;
use std::sync::OnceLock;

use crate::bundle::Platform;
use crate::error::{DiffError, Result};
use crate::metadata::AssetManifest;

/// 一次资源解析请求
#[derive(Debug, Clone, Copy)]
pub struct AssetRequest<'a> {
    /// 资源标识：iOS 为去掉倍率后缀的相对路径，Android 为去掉 `drawable-*/` 目录的文件名
    pub asset: &'a str,
    pub scale: &'a str,
    /// 更新包自身解析出的默认 URI
    pub default_uri: &'a str,
}

/// 已安装应用的主包信息，由原生层提供
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallInfo {
    pub platform: Platform,
    pub main_bundle_path: String,
}

impl InstallInfo {
    /// iOS 为主包内文件的 `file://` URI，Android 直接使用资源名
    pub fn main_bundle_uri(&self, main_asset: &str) -> String {
        match self.platform {
            Platform::Ios => format!(
                "file://{}/{}",
                self.main_bundle_path.trim_end_matches('/'),
                main_asset
            ),
            Platform::Android => main_asset.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssetResolver {
    /// 没有清单：始终使用默认位置
    #[default]
    Default,
    /// 按清单回退到主包
    MainBundle {
        install: InstallInfo,
        manifest: AssetManifest,
    },
}

impl AssetResolver {
    /// 清单为空时退化为默认解析
    pub fn new(install: InstallInfo, manifest: AssetManifest) -> Self {
        if manifest.is_empty() {
            return AssetResolver::Default;
        }
        AssetResolver::MainBundle { install, manifest }
    }

    pub fn from_json(install: InstallInfo, json: &str) -> Result<Self> {
        let manifest = AssetManifest::from_json(json)
            .map_err(|e| DiffError::serialization(Path::new("bundle_config.json"), e))?;
        Ok(Self::new(install, manifest))
    }

    pub fn resolve(&self, request: &AssetRequest<'_>) -> String {
        match self {
            AssetResolver::Default => request.default_uri.to_string(),
            AssetResolver::MainBundle { install, manifest } => {
                match manifest.lookup(request.asset, request.scale) {
                    Some(main_asset) => install.main_bundle_uri(main_asset),
                    None => request.default_uri.to_string(),
                }
            }
        }
    }
}

static INSTALLED: OnceLock<AssetResolver> = OnceLock::new();

/// 在应用启动时安装一次；重复安装会原样返回传入的解析器
pub fn install(resolver: AssetResolver) -> std::result::Result<(), AssetResolver> {
    INSTALLED.set(resolver)
}

/// 使用已安装的解析器；未安装时返回默认 URI
pub fn resolve(request: &AssetRequest<'_>) -> String {
    match INSTALLED.get() {
        Some(resolver) => resolver.resolve(request),
        None => request.default_uri.to_string(),
    }
}
