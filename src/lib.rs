//! # Code Push Diff
//!
//! 资源差分的热更新打包库
//!
//! ## 功能
//!
//! - 分别编译基线修订与当前修订，按内容哈希找出未变化的静态资源
//! - 从更新产物中剔除未变化资源，显著减小热更新包体积
//! - 生成随应用打包的资源清单，运行时据此从已安装的主包中加载被剔除的资源
//! - 基线哈希可缓存到磁盘，同一 CI 任务中的后续调用无需重复编译基线
//!
//! ## 使用示例
//!
//! ```no_run
//! use code_push_diff::assets::{AssetExtensions, build_index, changed_assets, strip_unchanged};
//! use std::path::Path;
//!
//! let exts = AssetExtensions::new(["png", "jpg"])?;
//! let baseline = build_index(Path::new("build/base/output"), &exts)?;
//! let current = build_index(Path::new("build/head/output"), &exts)?;
//!
//! let changed = changed_assets(&current, &baseline);
//! strip_unchanged(Path::new("build/head/output"), &current, &baseline)?;
//! println!("{} 个资源有变化", changed.len());
//! # Ok::<(), code_push_diff::DiffError>(())
//! ```

pub mod assets;
pub mod bundle;
pub mod cli;
pub mod error;
pub mod metadata;
pub mod release;
pub mod runtime;
pub mod utils;

// 重新导出常用类型
pub use assets::{AssetExtensions, HashIndex, build_index, changed_assets, strip_unchanged};
pub use bundle::{BundleArgs, BundlerConfig, PipelineContext, Platform};
pub use error::{DiffError, Result};
pub use metadata::{AssetManifest, ChangedAssetsManifest};
