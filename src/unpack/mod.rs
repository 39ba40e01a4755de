//! Archive unpackers
//!
//! Unpackers are matched against the archive path itself, so the predicate
//! may look at the file name or at the file content.

pub mod tar;
pub mod zip;

use std::path::Path;

use crate::capability::CapabilityRegistry;
use crate::error::Result;

pub trait Unpacker {
    fn name(&self) -> &'static str;

    /// Extract `archive` into `dest`, creating it when needed
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Every unpacker compiled in, matched by archive path
pub fn registry() -> Result<CapabilityRegistry<dyn Unpacker>> {
    let mut registry: CapabilityRegistry<dyn Unpacker> = CapabilityRegistry::new("unpacker");
    registry.register(
        "zip",
        |path| zip::is_zip(Path::new(path)),
        || Box::new(zip::ZipUnpacker),
    )?;
    registry.register(
        "tar",
        |path| tar::is_tar(Path::new(path)),
        || Box::new(tar::TarUnpacker),
    )?;
    Ok(registry)
}
