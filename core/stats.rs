use crate::bundle::BundleFile;
use crate::error::{AppError, Result};
use byte_unit::{Byte, UnitType};
use log;
use serde::Serialize;
use tiktoken_rs::cl100k_base;

#[derive(Debug, Serialize)]
pub struct BundleStats {
    pub total_files: usize,
    pub total_lines: usize,
    pub total_bytes: u128,
    pub total_bytes_readable: String,
    pub estimated_tokens: usize,
    pub files_details: Vec<FileStats>,
}

#[derive(Debug, Serialize)]
pub struct FileStats {
    pub path: String,
    pub language: String,
    pub lines: usize,
    pub bytes: usize,
    pub bytes_readable: String,
    pub estimated_tokens: usize,
}

fn readable(bytes: u128) -> String {
    Byte::from_u128(bytes)
        .unwrap_or_default()
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

/// Per-file and total size metrics, with token counts from the cl100k
/// encoding. Empty files are skipped.
pub fn calculate_stats(files: &[BundleFile]) -> Result<BundleStats> {
    let bpe = cl100k_base().map_err(|e| AppError::TikToken(e.to_string()))?;
    let mut total_lines = 0;
    let mut total_bytes: u128 = 0;
    let mut total_tokens = 0;
    let mut files_details = Vec::new();

    for file in files.iter().filter(|f| !f.content.is_empty()) {
        let lines = file.content.lines().count();
        let bytes = file.content.len();
        let tokens = bpe.encode_ordinary(&file.content).len();

        total_lines += lines;
        total_bytes = total_bytes.saturating_add(bytes as u128);
        total_tokens += tokens;

        files_details.push(FileStats {
            path: file.path.clone(),
            language: file.language.clone(),
            lines,
            bytes,
            bytes_readable: readable(bytes as u128),
            estimated_tokens: tokens,
        });
    }
    files_details.sort_by(|a, b| a.path.cmp(&b.path));
    log::debug!(
        "Stats: {} file(s), {} line(s), {} token(s)",
        files_details.len(),
        total_lines,
        total_tokens
    );

    Ok(BundleStats {
        total_files: files_details.len(),
        total_lines,
        total_bytes,
        total_bytes_readable: readable(total_bytes),
        estimated_tokens: total_tokens,
        files_details,
    })
}
