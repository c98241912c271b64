//! The one place spec §7 demands a typed, matchable error rather than a
//! silent skip or absence: export serialization failures must surface
//! structurally to the caller, with no partial files left behind.

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to build zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("failed to write archive entry: {0}")]
    Io(#[from] std::io::Error),
}
