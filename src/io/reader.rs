/// DSK file reader

use crate::error::Result;
use crate::image::DiskImage;
use log::info;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read a DSK or EDSK file from disk
pub fn read_dsk<P: AsRef<Path>>(path: P) -> Result<DiskImage> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let mut image = DiskImage::from_bytes(&bytes)?;
    image.filename = Some(path.display().to_string());
    info!(
        "Opened {} ({}, {} tracks, {} sides)",
        path.display(),
        image.format().name(),
        image.num_tracks(),
        image.num_sides()
    );
    Ok(image)
}

/// Read a DSK or EDSK image from any reader
pub fn read_dsk_from_reader<R: Read>(mut reader: R) -> Result<DiskImage> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    DiskImage::from_bytes(&bytes)
}
