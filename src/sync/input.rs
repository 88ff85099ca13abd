// Image list file parsing (images.txt)

use anyhow::{Context, Result};
use std::path::Path;

/// One image reference from the input list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// 1-based line number in the input file
    pub line_number: usize,
    pub reference: String,
}

/// Parse the image list, skipping blank lines and `#` comments
pub fn parse_image_list(contents: &str) -> Vec<ImageEntry> {
    contents
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            Some(ImageEntry {
                line_number: index + 1,
                reference: line.to_string(),
            })
        })
        .collect()
}

/// Read and parse the image list file
pub fn read_image_list(path: &Path) -> Result<Vec<ImageEntry>> {
    if !path.exists() {
        anyhow::bail!("Image list '{}' does not exist", path.display());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read image list: {}", path.display()))?;

    Ok(parse_image_list(&contents))
}
