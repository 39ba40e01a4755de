use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::info;

use crate::error::Result;
use crate::error::backend::unpack_failed;

use super::Unpacker;

/// `.tar`, `.tar.gz` or `.tgz` file name
pub fn is_tar(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    name.ends_with(".tar") || is_gzipped_name(&name)
}

fn is_gzipped_name(name: &str) -> bool {
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

pub struct TarUnpacker;

impl Unpacker for TarUnpacker {
    fn name(&self) -> &'static str {
        "tar"
    }

    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
        info!(archive = %archive.display(), dest = %dest.display(), "extracting tarball");
        let fail = |e: std::io::Error| unpack_failed(archive, e);

        let file = File::open(archive).map_err(fail)?;
        let name = archive.to_string_lossy().to_lowercase();
        let reader: Box<dyn Read> = if is_gzipped_name(&name) {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        std::fs::create_dir_all(dest).map_err(fail)?;
        ::tar::Archive::new(reader).unpack(dest).map_err(fail)
    }
}
