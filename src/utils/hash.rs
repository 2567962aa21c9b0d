use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{DiffError, Result};

/// 计算文件的 SHA256 校验和（流式读取，不会整体载入内存）
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(DiffError::io(path))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(DiffError::io(path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// 字符串的 SHA256，用于派生锁文件名等
pub fn hash_str(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}
