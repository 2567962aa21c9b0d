use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tar::Builder;
use walkdir::WalkDir;

use crate::error::{DiffError, Result};

/// 把剔除后的产物目录打包为 tar.gz，便于上传或归档
pub fn pack_payload(output_dir: &Path, archive: &Path) -> Result<()> {
    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent).map_err(DiffError::io(parent))?;
    }
    let file = File::create(archive).map_err(DiffError::io(archive))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut tar_builder = Builder::new(encoder);

    for entry in WalkDir::new(output_dir) {
        let entry = entry.map_err(|e| DiffError::Io {
            path: output_dir.to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.path();
        let Ok(relative_path) = path.strip_prefix(output_dir) else {
            continue;
        };

        if entry.file_type().is_file() {
            tar_builder
                .append_path_with_name(path, relative_path)
                .map_err(DiffError::io(path))?;
        } else if entry.file_type().is_dir() && path != output_dir {
            tar_builder
                .append_dir(relative_path, path)
                .map_err(DiffError::io(path))?;
        }
    }

    let encoder = tar_builder.into_inner().map_err(DiffError::io(archive))?;
    encoder
        .finish()
        .map_err(DiffError::io(archive))?
        .into_inner()
        .map_err(|e| DiffError::io(archive)(e.into_error()))?;
    Ok(())
}
