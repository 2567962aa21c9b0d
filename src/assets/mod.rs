mod diff;
mod extensions;
mod index;
mod scale;

pub use diff::{changed_assets, strip_unchanged, unchanged_assets};
pub use extensions::AssetExtensions;
pub use index::{HashIndex, build_index};
pub use scale::{
    MainAssets, Scale, asset_key, main_bundle_path, scale_map, split_android_density, split_scale,
};
