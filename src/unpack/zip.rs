use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::error::backend::unpack_failed;

use super::Unpacker;

const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// `.zip` file name, or zip local header magic at the start of the file
pub fn is_zip(path: &Path) -> bool {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    {
        return true;
    }
    let mut magic = [0u8; 4];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut magic))
        .is_ok_and(|()| &magic == ZIP_MAGIC)
}

pub struct ZipUnpacker;

impl Unpacker for ZipUnpacker {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
        info!(archive = %archive.display(), dest = %dest.display(), "unzipping");
        let fail = |reason: String| unpack_failed(archive, reason);

        let file = File::open(archive).map_err(|e| fail(e.to_string()))?;
        let mut zip = ::zip::ZipArchive::new(file).map_err(|e| fail(e.to_string()))?;
        std::fs::create_dir_all(dest).map_err(|e| fail(e.to_string()))?;

        for i in 0..zip.len() {
            let mut entry = zip
                .by_index(i)
                .map_err(|e| fail(format!("entry {i}: {e}")))?;
            let Some(relative) = entry.enclosed_name() else {
                debug!(name = %entry.name(), "skipping entry escaping the destination");
                continue;
            };
            let target = dest.join(relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&target).map_err(|e| fail(e.to_string()))?;
                continue;
            }
            // some archives list 'dir/file' before 'dir'
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
            }
            let mut out = File::create(&target).map_err(|e| fail(e.to_string()))?;
            std::io::copy(&mut entry, &mut out)
                .map_err(|e| fail(format!("{}: {}", target.display(), e)))?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode))
                    .map_err(|e| fail(e.to_string()))?;
            }
        }
        Ok(())
    }
}
