use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::assets::AssetExtensions;
use crate::error::{DiffError, Result};
use crate::utils::sanitize_revision;

/// 项目根目录下可选的配置文件名
pub const PROJECT_CONFIG_FILE: &str = "code-push-diff.toml";
/// 覆盖基线缓存路径的环境变量
pub const BASELINE_CACHE_ENV: &str = "CODE_PUSH_DIFF_BASELINE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }

    pub fn default_bundle_name(&self) -> String {
        match self {
            Platform::Ios => "main.jsbundle".to_string(),
            Platform::Android => "index.android.bundle".to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            other => Err(DiffError::Configuration(format!("不支持的平台: {}", other))),
        }
    }
}

/// `code-push-diff.toml`
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub asset_exts: Option<Vec<String>>,
    pub bundle_name: Option<String>,
    pub entry_file: Option<PathBuf>,
    pub reinstall_command: Option<String>,
    pub use_bytecode: Option<bool>,
}

impl ProjectConfig {
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(PROJECT_CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(DiffError::io(&path))?;
        toml::from_str(&content).map_err(|e| DiffError::serialization(&path, e))
    }
}

/// 未经解析的打包参数，字段均可缺省
#[derive(Debug, Clone, Default)]
pub struct BundleArgs {
    pub platform: String,
    pub base: String,
    pub project_root: Option<PathBuf>,
    pub entry_file: Option<PathBuf>,
    pub bundle_name: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub sourcemap_output: Option<PathBuf>,
    pub reinstall_command: Option<String>,
    pub use_bytecode: Option<bool>,
    pub development: bool,
    pub asset_exts: Vec<String>,
    pub baseline_cache: Option<PathBuf>,
    pub fresh_baseline: bool,
    pub manifest_path: Option<PathBuf>,
    pub extra_bundler_options: Vec<String>,
    pub extra_bytecode_flags: Vec<String>,
}

/// 解析完成、不可变的打包配置，在流程开始前一次性生成
#[derive(Debug, Clone, PartialEq)]
pub struct BundlerConfig {
    pub platform: Platform,
    pub base: String,
    pub project_root: PathBuf,
    pub entry_file: PathBuf,
    pub bundle_name: String,
    pub output_dir: PathBuf,
    /// 显式指定的 sourcemap 路径；缺省时放在每次构建目录下
    pub sourcemap_output: Option<PathBuf>,
    pub reinstall_command: String,
    pub use_bytecode: bool,
    pub development: bool,
    pub asset_exts: AssetExtensions,
    pub baseline_cache: PathBuf,
    /// 忽略已有缓存，重新构建基线
    pub fresh_baseline: bool,
    pub manifest_path: PathBuf,
    pub extra_bundler_options: Vec<String>,
    pub extra_bytecode_flags: Vec<String>,
}

impl BundlerConfig {
    pub fn resolve(args: BundleArgs) -> Result<Self> {
        let platform: Platform = args.platform.parse()?;
        if args.base.trim().is_empty() {
            return Err(DiffError::Configuration("缺少基线修订 (--base)".to_string()));
        }

        let project_root = match args.project_root {
            Some(root) => root,
            None => std::env::current_dir().map_err(DiffError::io("."))?,
        };
        let project = ProjectConfig::load(&project_root)?;

        let entry_file = match args.entry_file.or(project.entry_file) {
            Some(file) => {
                if !project_root.join(&file).is_file() {
                    return Err(DiffError::Configuration(format!(
                        "入口文件不存在: {}",
                        file.display()
                    )));
                }
                file
            }
            None => default_entry_file(&project_root, platform)?,
        };

        let asset_exts = resolve_asset_exts(&project_root, args.asset_exts, project.asset_exts)?;

        let output_dir = args
            .output_dir
            .unwrap_or_else(|| std::env::temp_dir().join("code-push-diff"));
        let baseline_cache = args
            .baseline_cache
            .or_else(|| std::env::var_os(BASELINE_CACHE_ENV).map(PathBuf::from))
            .unwrap_or_else(|| default_baseline_cache(platform, &args.base));
        let manifest_path = args.manifest_path.unwrap_or_else(|| {
            project_root
                .join("node_modules")
                .join("code-push-diff")
                .join("bundle_config.json")
        });

        Ok(Self {
            platform,
            bundle_name: args
                .bundle_name
                .or(project.bundle_name)
                .unwrap_or_else(|| platform.default_bundle_name()),
            reinstall_command: args
                .reinstall_command
                .or(project.reinstall_command)
                .unwrap_or_else(|| install_node_modules_command(&project_root).to_string()),
            use_bytecode: args.use_bytecode.or(project.use_bytecode).unwrap_or(true),
            base: args.base,
            project_root,
            entry_file,
            output_dir,
            sourcemap_output: args.sourcemap_output,
            development: args.development,
            asset_exts,
            baseline_cache,
            fresh_baseline: args.fresh_baseline,
            manifest_path,
            extra_bundler_options: args.extra_bundler_options,
            extra_bytecode_flags: args.extra_bytecode_flags,
        })
    }

    /// 某个修订的构建目录，每次编译前都会被清空
    pub fn build_dir(&self, revision: &str) -> PathBuf {
        self.output_dir.join(sanitize_revision(revision))
    }
}

fn default_entry_file(project_root: &Path, platform: Platform) -> Result<PathBuf> {
    let candidates = [format!("index.{}.js", platform), "index.js".to_string()];
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|file| project_root.join(file).is_file())
        .ok_or_else(|| {
            DiffError::Configuration(format!(
                "入口文件 \"index.{}.js\" 或 \"index.js\" 不存在",
                platform
            ))
        })
}

fn resolve_asset_exts(
    project_root: &Path,
    cli: Vec<String>,
    project: Option<Vec<String>>,
) -> Result<AssetExtensions> {
    if !cli.is_empty() {
        return AssetExtensions::new(cli);
    }
    if let Some(exts) = project {
        return AssetExtensions::new(exts);
    }
    AssetExtensions::from_metro_config(project_root)?.ok_or_else(|| {
        DiffError::Configuration(format!(
            "未找到资源扩展名配置 (metro.config.json 的 resolver.assetExts 或 {})",
            PROJECT_CONFIG_FILE
        ))
    })
}

fn default_baseline_cache(platform: Platform, base: &str) -> PathBuf {
    std::env::temp_dir()
        .join("code-push-diff-cache")
        .join(format!("baseline-{}-{}.toml", platform, sanitize_revision(base)))
}

/// 根据锁文件推断依赖安装命令
pub fn install_node_modules_command(project_root: &Path) -> &'static str {
    if project_root.join("yarn.lock").is_file() || project_root.join(".yarnrc.yml").is_file() {
        return "yarn install";
    }
    if project_root.join("pnpm-lock.yaml").is_file() {
        return "pnpm install";
    }
    "npm install"
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(root: &Path) -> BundleArgs {
        BundleArgs {
            platform: "ios".to_string(),
            base: "main".to_string(),
            project_root: Some(root.to_path_buf()),
            asset_exts: vec!["png".to_string()],
            baseline_cache: Some(root.join("cache.toml")),
            ..Default::default()
        }
    }

    #[test]
    fn resolves_platform_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.js"), "").unwrap();
        fs::write(dir.path().join("yarn.lock"), "").unwrap();

        let config = BundlerConfig::resolve(args(dir.path())).unwrap();

        assert_eq!(config.platform, Platform::Ios);
        assert_eq!(config.bundle_name, "main.jsbundle");
        assert_eq!(config.entry_file, PathBuf::from("index.js"));
        assert_eq!(config.reinstall_command, "yarn install");
        assert!(config.use_bytecode);
        assert!(config.manifest_path.ends_with("node_modules/code-push-diff/bundle_config.json"));
    }

    #[test]
    fn prefers_platform_specific_entry_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.js"), "").unwrap();
        fs::write(dir.path().join("index.android.js"), "").unwrap();

        let mut a = args(dir.path());
        a.platform = "Android".to_string();
        let config = BundlerConfig::resolve(a).unwrap();

        assert_eq!(config.entry_file, PathBuf::from("index.android.js"));
        assert_eq!(config.bundle_name, "index.android.bundle");
        assert_eq!(config.reinstall_command, "npm install");
    }

    #[test]
    fn unknown_platform_fails_fast() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.js"), "").unwrap();

        let mut a = args(dir.path());
        a.platform = "windows".to_string();
        let err = BundlerConfig::resolve(a).unwrap_err();
        assert!(matches!(err, DiffError::Configuration(_)));
    }

    #[test]
    fn missing_entry_file_fails_fast() {
        let dir = tempdir().unwrap();
        let err = BundlerConfig::resolve(args(dir.path())).unwrap_err();
        assert!(matches!(err, DiffError::Configuration(_)));
    }

    #[test]
    fn missing_asset_exts_fails_fast() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.js"), "").unwrap();

        let mut a = args(dir.path());
        a.asset_exts.clear();
        let err = BundlerConfig::resolve(a).unwrap_err();
        assert!(matches!(err, DiffError::Configuration(_)));
    }

    #[test]
    fn project_config_fills_gaps() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("app.js"), "").unwrap();
        fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            r#"
asset_exts = ["png", "ttf"]
entry_file = "app.js"
reinstall_command = "bun install"
use_bytecode = false
"#,
        )
        .unwrap();

        let mut a = args(dir.path());
        a.asset_exts.clear();
        let config = BundlerConfig::resolve(a).unwrap();

        assert_eq!(config.entry_file, PathBuf::from("app.js"));
        assert_eq!(config.reinstall_command, "bun install");
        assert!(!config.use_bytecode);
        assert!(config.asset_exts.matches("fonts/a.ttf"));
    }

    #[test]
    fn project_config_rejects_unknown_keys() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), "colour = \"red\"\n").unwrap();

        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, DiffError::Serialization { .. }));
    }
}
