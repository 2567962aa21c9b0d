use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::error::{DiffError, Result};
use crate::utils::extension;

/// 打包器配置中被视为"资源"的文件扩展名集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetExtensions(BTreeSet<String>);

impl AssetExtensions {
    /// 扩展名可以带或不带前导点，空集合视为配置缺失
    pub fn new<I, S>(exts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = exts
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect();

        if set.is_empty() {
            return Err(DiffError::Configuration(
                "资源扩展名列表为空 (assetExts)".to_string(),
            ));
        }
        Ok(Self(set))
    }

    /// 从 `metro.config.json` 的 `resolver.assetExts` 读取
    pub fn from_metro_config(project_root: &Path) -> Result<Option<Self>> {
        #[derive(Deserialize)]
        struct MetroConfig {
            resolver: Option<Resolver>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Resolver {
            asset_exts: Option<Vec<String>>,
        }

        let path = project_root.join("metro.config.json");
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(DiffError::io(&path))?;
        let config: MetroConfig =
            serde_json::from_str(&content).map_err(|e| DiffError::serialization(&path, e))?;

        match config.resolver.and_then(|r| r.asset_exts) {
            Some(exts) => Self::new(exts).map(Some),
            None => Err(DiffError::Configuration(format!(
                "{} 中没有 resolver.assetExts",
                path.display()
            ))),
        }
    }

    pub fn contains(&self, ext: &str) -> bool {
        self.0.contains(ext)
    }

    /// 相对路径是否属于资源文件
    pub fn matches(&self, relative_path: &str) -> bool {
        extension(relative_path).is_some_and(|ext| self.contains(ext))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn normalizes_leading_dots() {
        let exts = AssetExtensions::new([".png", "jpg", " ttf "]).unwrap();
        assert!(exts.matches("assets/icon.png"));
        assert!(exts.matches("fonts/Inter.ttf"));
        assert!(!exts.matches("index.android.bundle"));
        assert!(!exts.matches("assets/icon.PNG"));
    }

    #[test]
    fn empty_list_is_a_configuration_error() {
        let err = AssetExtensions::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, DiffError::Configuration(_)));
    }

    #[test]
    fn reads_metro_config_json() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("metro.config.json"),
            r#"{ "resolver": { "assetExts": ["png", "webp"] } }"#,
        )
        .unwrap();

        let exts = AssetExtensions::from_metro_config(dir.path()).unwrap().unwrap();
        assert_eq!(exts.iter().collect::<Vec<_>>(), vec!["png", "webp"]);
    }

    #[test]
    fn metro_config_without_asset_exts_fails() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("metro.config.json"), r#"{ "resolver": {} }"#).unwrap();

        let err = AssetExtensions::from_metro_config(dir.path()).unwrap_err();
        assert!(matches!(err, DiffError::Configuration(_)));
    }

    #[test]
    fn missing_metro_config_is_none() {
        let dir = tempdir().unwrap();
        assert!(AssetExtensions::from_metro_config(dir.path()).unwrap().is_none());
    }
}
