//! Reading and writing show files.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use super::CompiledShow;
use super::format::{FormatError, FormatVersion, decode, encode};

/// Errors from show file I/O.
#[derive(Debug, thiserror::Error)]
pub enum ShowFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid show file: {0}")]
    Format(#[from] FormatError),
}

/// Write a compiled show to `path`, replacing any existing file.
pub fn save_show<P: AsRef<Path>>(
    path: P,
    show: &CompiledShow,
    version: FormatVersion,
) -> Result<(), ShowFileError> {
    let bytes = encode(show, version);
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    log::debug!(
        "Wrote {} bytes ({} bursts, {} particles) to {}",
        bytes.len(),
        show.bursts.len(),
        show.particles.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Read and decode a show file.
pub fn load_show<P: AsRef<Path>>(path: P) -> Result<CompiledShow, ShowFileError> {
    let mut bytes = Vec::new();
    File::open(path.as_ref())?.read_to_end(&mut bytes)?;
    Ok(decode(&bytes)?)
}
