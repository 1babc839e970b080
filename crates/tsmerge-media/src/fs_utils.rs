//! Moving merged output out of a working directory.
//!
//! FFmpeg writes into the session's working directory, so a failed merge never
//! leaves a truncated file in the user's output folder. The finished file is
//! then moved into place without ever replacing an existing file: the move is
//! a hard link plus removal of the source, and where linking is impossible
//! (another filesystem, or no hard link support) the contents are copied into
//! a file created with `create_new`.

use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::{MediaError, MediaResult};

/// Move `src` to `dst` unless something already exists at `dst`.
///
/// Fails with [`MediaError::DestinationExists`] when `dst` is taken; `src` is
/// left untouched in that case so the caller can pick another name.
pub async fn move_into_place(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if !fs::try_exists(src).await? {
        return Err(MediaError::FileNotFound(src.to_path_buf()));
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::hard_link(src, dst).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(MediaError::DestinationExists(dst.to_path_buf()));
        }
        Err(e) => {
            if is_cross_device_error(&e) {
                tracing::debug!(
                    "Output is on another filesystem, copying: {} -> {}",
                    src.display(),
                    dst.display()
                );
            } else {
                tracing::debug!("Hard link failed ({}), copying instead", e);
            }
            copy_no_clobber(src, dst).await?;
        }
    }

    // The working directory is removed with the session anyway
    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!("Failed to remove {} after move: {}", src.display(), e);
    }

    Ok(())
}

/// EXDEV: 18 on Linux and macOS, ERROR_NOT_SAME_DEVICE (17) on Windows.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    if cfg!(windows) {
        e.raw_os_error() == Some(17)
    } else {
        e.raw_os_error() == Some(18)
    }
}

async fn copy_no_clobber(src: &Path, dst: &Path) -> MediaResult<()> {
    let mut target = match OpenOptions::new().write(true).create_new(true).open(dst).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(MediaError::DestinationExists(dst.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let copied = async {
        let mut source = fs::File::open(src).await?;
        tokio::io::copy(&mut source, &mut target).await?;
        target.flush().await?;
        Ok::<_, std::io::Error>(())
    }
    .await;

    if let Err(e) = copied {
        // dst was created by us, so removing it cannot drop someone else's file
        let _ = fs::remove_file(dst).await;
        return Err(e.into());
    }

    Ok(())
}
