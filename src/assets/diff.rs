use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use super::index::HashIndex;
use crate::error::{DiffError, Result};
use crate::utils::prune_empty_parents;

/// 当前构建中内容不存在于基线的资源路径
///
/// 按内容判断而非路径：改名但内容未变的资源视为未变化。
pub fn changed_assets(current: &HashIndex, baseline: &HashIndex) -> BTreeSet<String> {
    current
        .iter()
        .filter(|(hash, _)| !baseline.contains_hash(hash))
        .map(|(_, path)| path.to_string())
        .collect()
}

/// 与 `changed_assets` 互补：(当前路径, 基线路径)
pub fn unchanged_assets<'a>(
    current: &'a HashIndex,
    baseline: &'a HashIndex,
) -> Vec<(&'a str, &'a str)> {
    current
        .iter()
        .filter_map(|(hash, path)| baseline.get(hash).map(|base| (path, base)))
        .collect()
}

/// 从 `output_dir` 中删除内容与基线相同的资源，返回删除的相对路径
///
/// 两个索引都必须已经完整计算；借用签名保证调用时没有并发的哈希过程。
pub fn strip_unchanged(
    output_dir: &Path,
    current: &HashIndex,
    baseline: &HashIndex,
) -> Result<Vec<String>> {
    let mut removed = Vec::new();

    for (path, _) in unchanged_assets(current, baseline) {
        let target = output_dir.join(path);
        if !target.is_file() {
            continue;
        }
        fs::remove_file(&target).map_err(DiffError::io(&target))?;
        prune_empty_parents(&target, output_dir);
        log::debug!("  - {}", path);
        removed.push(path.to_string());
    }

    Ok(removed)
}
