//! Post-processing of a finished dump.
//!
//! The raw dump is gzipped into a temporary file next to it, the temporary
//! file is renamed to `<dump>.gz` once the gzip stream is complete, and only
//! then is the raw dump deleted. The configured mode and ownership are
//! applied to the final file last.

use crate::backup::compress::{CompressorBuilder, GzipConfig};
use crate::backup::dump::DumpArtifact;
use crate::backup::file_ext::append_file_ext;
use crate::backup::finish::Finish;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::target::{BackupTarget, Ownership};
use getset::{CopyGetters, Getters};
use nix::unistd::{chown, Gid, Uid};
use std::fs::{File, Permissions};
use std::io::{BufReader, BufWriter, IntoInnerError};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The retained output of a successful run.
#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters)]
pub struct CompressedArtifact {
    #[getset(get = "pub")]
    path: PathBuf,
    #[getset(get = "pub")]
    database: String,
    #[getset(get_copy = "pub")]
    mode: u32,
    #[getset(get_copy = "pub")]
    ownership: Ownership,
}

/// Compresses `dump`, removes it, and secures the compressed file.
pub fn post_process(target: &BackupTarget, dump: DumpArtifact) -> Result<CompressedArtifact> {
    let compression = target.compression();
    let path = append_file_ext(dump.path(), &compression);

    compress_file(dump.path(), &path, compression).map_err(|e| Error::CompressionFailure {
        section: target.database().clone(),
        path: dump.path().clone(),
        source: Box::new(e),
    })?;
    info!("Compressed {:?} into {:?}", dump.path(), &path);

    dump.remove()?;

    std::fs::set_permissions(&path, Permissions::from_mode(target.mode()))
        .map_err(Error::from)
        .with_msg(format!("Failed to chmod {:o} {:?}", target.mode(), &path))?;
    apply_ownership(&path, target.ownership())?;

    Ok(CompressedArtifact {
        path,
        database: target.database().clone(),
        mode: target.mode(),
        ownership: target.ownership(),
    })
}

/// Writes the gzip of `src` to `dst`. `dst` only appears once it is complete;
/// on error the temporary file is dropped and `src` is left alone.
fn compress_file(src: &Path, dst: &Path, compression: GzipConfig) -> Result<()> {
    let dir = match dst.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut reader = BufReader::new(File::open(src)?);
    let tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    let mut writer = compression.build_compressor(BufWriter::new(tmp))?;
    let written = std::io::copy(&mut reader, &mut writer)?;
    let tmp = Finish::finish(writer)?
        .into_inner()
        .map_err(IntoInnerError::into_error)?;
    tmp.as_file().sync_all()?;
    debug!("Compressed {} bytes from {:?}", written, src);

    tmp.persist(dst).map_err(|e| Error::from(e.error))?;
    Ok(())
}

/// `None` keeps the current owner/group, like passing -1 to `chown(2)`.
fn apply_ownership(path: &Path, ownership: Ownership) -> Result<()> {
    if ownership.is_unchanged() {
        return Ok(());
    }
    chown(
        path,
        ownership.uid().map(Uid::from_raw),
        ownership.gid().map(Gid::from_raw),
    )
    .map_err(Error::from)
    .with_msg(format!(
        "Failed to chown {:?} to {:?}:{:?}",
        path,
        ownership.uid(),
        ownership.gid()
    ))
}
