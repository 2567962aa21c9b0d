mod cache;
mod manifest;

pub use cache::{BaselineCache, load_cached_baseline, read_baseline_cache, write_baseline_cache};
pub use manifest::{AssetManifest, ChangedAssetsManifest, ManifestSlot};
