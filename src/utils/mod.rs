mod fs;
mod hash;

pub use fs::{extension, list_files, prune_empty_parents, recreate_dir, sanitize_revision, to_slash};
pub use hash::{compute_file_hash, hash_str};
