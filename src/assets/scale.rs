use std::collections::BTreeMap;

use super::diff::unchanged_assets;
use super::index::HashIndex;
use crate::bundle::Platform;

/// 显示密度倍率，清单中以字符串形式作为键（"1"、"2"、"3"、"1.5"）
pub type Scale = String;

/// 单个资源在主包中的可用版本：scale -> 主包路径
pub type MainAssets = BTreeMap<Scale, String>;

/// 拆分 `name@2x.png` 形式的路径，返回 (去掉倍率后的资源标识, 倍率)
pub fn split_scale(relative_path: &str) -> (String, Scale) {
    let (dir, file_name) = match relative_path.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, relative_path),
    };
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };

    let parsed = stem.rsplit_once('@').and_then(|(base, suffix)| {
        let number = suffix.strip_suffix('x')?;
        let valid = !base.is_empty()
            && !number.is_empty()
            && number.parse::<f32>().is_ok_and(|n| n > 0.0);
        valid.then_some((base, number))
    });

    let Some((base, number)) = parsed else {
        return (relative_path.to_string(), "1".to_string());
    };

    let mut id = String::new();
    if let Some(dir) = dir {
        id.push_str(dir);
        id.push('/');
    }
    id.push_str(base);
    if let Some(ext) = ext {
        id.push('.');
        id.push_str(ext);
    }
    (id, number.to_string())
}

/// Android 资源目录的密度限定符对应的倍率
const ANDROID_DENSITIES: [(&str, &str); 6] = [
    ("ldpi", "0.75"),
    ("mdpi", "1"),
    ("hdpi", "1.5"),
    ("xhdpi", "2"),
    ("xxhdpi", "3"),
    ("xxxhdpi", "4"),
];

/// 拆分 Android 产物路径 `drawable-xhdpi/img_icon.png`
///
/// 打包器按密度把资源放进 `drawable-<density>/`，文件名不带倍率后缀；
/// `raw/` 中的非图片资源固定为 1 倍。其他路径返回 `None`。
pub fn split_android_density(relative_path: &str) -> Option<(String, Scale)> {
    let (dir, file_name) = relative_path.split_once('/')?;
    if file_name.is_empty() || file_name.contains('/') {
        return None;
    }
    if dir == "raw" {
        return Some((file_name.to_string(), "1".to_string()));
    }

    let density = dir.strip_prefix("drawable-")?;
    let (_, scale) = ANDROID_DENSITIES
        .iter()
        .find(|(qualifier, _)| *qualifier == density)?;
    Some((file_name.to_string(), scale.to_string()))
}

/// 资源标识与倍率，按平台的产物布局解析
pub fn asset_key(platform: Platform, relative_path: &str) -> (String, Scale) {
    match platform {
        Platform::Android => split_android_density(relative_path)
            .unwrap_or_else(|| split_scale(relative_path)),
        Platform::Ios => split_scale(relative_path),
    }
}

/// 主包内的资源位置：iOS 为包内相对路径，Android 为资源名（文件名去掉扩展名）
pub fn main_bundle_path(platform: Platform, baseline_path: &str) -> String {
    match platform {
        Platform::Ios => baseline_path.to_string(),
        Platform::Android => {
            let file_name = baseline_path.rsplit('/').next().unwrap_or(baseline_path);
            match file_name.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() => stem.to_string(),
                _ => file_name.to_string(),
            }
        }
    }
}

/// 为每个未变化资源记录其在主包中的位置，按资源标识与倍率分组
pub fn scale_map(
    platform: Platform,
    current: &HashIndex,
    baseline: &HashIndex,
) -> BTreeMap<String, MainAssets> {
    let mut assets: BTreeMap<String, MainAssets> = BTreeMap::new();

    for (current_path, baseline_path) in unchanged_assets(current, baseline) {
        let (id, scale) = asset_key(platform, current_path);
        assets
            .entry(id)
            .or_default()
            .insert(scale, main_bundle_path(platform, baseline_path));
    }

    assets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_scale_handles_suffixes() {
        assert_eq!(
            split_scale("assets/src/img/icon@2x.png"),
            ("assets/src/img/icon.png".to_string(), "2".to_string())
        );
        assert_eq!(
            split_scale("assets/logo@1.5x.webp"),
            ("assets/logo.webp".to_string(), "1.5".to_string())
        );
        assert_eq!(
            split_scale("assets/logo.png"),
            ("assets/logo.png".to_string(), "1".to_string())
        );
    }

    #[test]
    fn split_scale_ignores_non_scale_at_signs() {
        assert_eq!(
            split_scale("assets/user@home.png"),
            ("assets/user@home.png".to_string(), "1".to_string())
        );
        assert_eq!(split_scale("@2x.png"), ("@2x.png".to_string(), "1".to_string()));
    }

    #[test]
    fn android_main_bundle_path_is_resource_name() {
        assert_eq!(
            main_bundle_path(Platform::Android, "drawable-xhdpi/assets_img_icon.png"),
            "assets_img_icon"
        );
        assert_eq!(
            main_bundle_path(Platform::Ios, "assets/img/icon@2x.png"),
            "assets/img/icon@2x.png"
        );
    }

    #[test]
    fn android_density_folders_map_to_scales() {
        assert_eq!(
            split_android_density("drawable-xxhdpi/src_img_icon.png"),
            Some(("src_img_icon.png".to_string(), "3".to_string()))
        );
        assert_eq!(
            split_android_density("drawable-ldpi/src_img_icon.png"),
            Some(("src_img_icon.png".to_string(), "0.75".to_string()))
        );
        assert_eq!(
            split_android_density("raw/src_fonts_body.ttf"),
            Some(("src_fonts_body.ttf".to_string(), "1".to_string()))
        );
        assert_eq!(split_android_density("drawable-night/src_img_icon.png"), None);
        assert_eq!(split_android_density("src_img_icon.png"), None);
    }

    #[test]
    fn android_scale_map_merges_densities_into_one_asset() {
        let baseline: HashIndex = [
            ("h1", "drawable-mdpi/src_img_icon.png"),
            ("h2", "drawable-xhdpi/src_img_icon.png"),
            ("h3", "drawable-xxhdpi/src_img_icon.png"),
        ]
        .into_iter()
        .collect();

        let map = scale_map(Platform::Android, &baseline, &baseline);

        assert_eq!(map.len(), 1);
        let icon = &map["src_img_icon.png"];
        assert_eq!(icon.len(), 3);
        assert_eq!(icon.get("1").map(String::as_str), Some("src_img_icon"));
        assert_eq!(icon.get("2").map(String::as_str), Some("src_img_icon"));
        assert_eq!(icon.get("3").map(String::as_str), Some("src_img_icon"));
    }

    #[test]
    fn scale_map_groups_by_asset() {
        let baseline: HashIndex = [("h1", "assets/icon.png"), ("h2", "assets/icon@2x.png")]
            .into_iter()
            .collect();
        let current: HashIndex = [
            ("h1", "assets/icon.png"),
            ("h2", "assets/icon@2x.png"),
            ("h3", "assets/icon@3x.png"),
        ]
        .into_iter()
        .collect();

        let map = scale_map(Platform::Ios, &current, &baseline);

        assert_eq!(map.len(), 1);
        let icon = &map["assets/icon.png"];
        assert_eq!(icon.get("1").map(String::as_str), Some("assets/icon.png"));
        assert_eq!(icon.get("2").map(String::as_str), Some("assets/icon@2x.png"));
        assert!(icon.get("3").is_none());
    }
}
