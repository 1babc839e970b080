//! Concat list construction for FFmpeg's concat demuxer.

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use tsmerge_models::parse_fragment_index;

use crate::error::MediaResult;

/// File name of the concat list inside a working directory.
pub const CONCAT_LIST_NAME: &str = "file_list.txt";

/// Write a concat list for the fragment files found in `fragment_dir`.
///
/// Only `segment_<index>.ts` files that exist are listed, ordered by their
/// numeric index. Returns the number of entries; zero means there is nothing
/// to merge.
pub async fn write_concat_list(fragment_dir: &Path, list_path: &Path) -> MediaResult<usize> {
    let fragments = collect_fragment_files(fragment_dir).await?;

    let mut contents = String::new();
    for (_, path) in &fragments {
        let absolute = std::path::absolute(path)?;
        contents.push_str(&concat_line(&absolute));
    }

    let mut file = tokio::fs::File::create(list_path).await?;
    file.write_all(contents.as_bytes()).await?;
    file.flush().await?;

    debug!(
        entries = fragments.len(),
        list = %list_path.display(),
        "Wrote concat list"
    );

    Ok(fragments.len())
}

/// One concat list line: `file '<path>'`.
///
/// Single quotes in the path are written as `'\''`, which the demuxer reads
/// back as a literal quote.
pub fn concat_line(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{}'\n", escaped)
}

/// Fragment files in `dir`, sorted by index.
async fn collect_fragment_files(dir: &Path) -> MediaResult<Vec<(usize, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut fragments = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(parse_fragment_index) {
            fragments.push((index, entry.path()));
        }
    }

    fragments.sort_by_key(|(index, _)| *index);
    Ok(fragments)
}
