/// DSK file writer

use crate::error::Result;
use crate::format::constants::*;
use crate::image::{DiskImage, TrackHeader};
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write a DSK file to disk: the disk info block followed by every track verbatim
pub fn write_dsk<P: AsRef<Path>>(image: &DiskImage, path: P) -> Result<()> {
    let mut file = File::create(path.as_ref())?;
    write_dsk_to(image, &mut file)?;
    file.flush()?;
    info!(
        "Saved {} bytes to {}",
        image.header.len() + image.image.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Write a DSK image to any writer
pub fn write_dsk_to<W: Write>(image: &DiskImage, writer: &mut W) -> Result<()> {
    writer.write_all(&image.header)?;
    writer.write_all(&image.image)?;
    Ok(())
}

/// Assemble a plain image from tracks and their payloads, given in track-major order.
///
/// Every track is padded to the size of the largest one, rounded up to 256.
pub fn build_standard_dsk(
    num_tracks: u8,
    num_sides: u8,
    tracks: &[(TrackHeader, Vec<u8>)],
) -> Result<DiskImage> {
    let track_size = calculate_track_size(tracks);

    let mut disk_info = vec![0u8; DISK_INFO_BLOCK_SIZE];
    disk_info[..STANDARD_DSK_SIGNATURE.len()].copy_from_slice(STANDARD_DSK_SIGNATURE);
    let creator_len = CREATOR_SIGNATURE.len().min(CREATOR_LEN);
    disk_info[DISK_INFO_CREATOR_OFFSET..DISK_INFO_CREATOR_OFFSET + creator_len]
        .copy_from_slice(&CREATOR_SIGNATURE[..creator_len]);
    disk_info[DISK_INFO_TRACK_COUNT_OFFSET] = num_tracks;
    disk_info[DISK_INFO_SIDE_COUNT_OFFSET] = num_sides;
    let size = (track_size.min(u16::MAX as usize) as u16).to_le_bytes();
    disk_info[DISK_INFO_TRACK_SIZE_OFFSET] = size[0];
    disk_info[DISK_INFO_TRACK_SIZE_OFFSET + 1] = size[1];

    let mut data = Vec::with_capacity(tracks.len() * track_size);
    for (header, payload) in tracks {
        let start = data.len();
        data.extend_from_slice(&header.to_bytes());
        data.extend_from_slice(payload);
        data.resize(start + track_size, header.filler_byte);
    }

    let mut image = DiskImage::from_parts(disk_info, data)?;
    image.changed = true;
    Ok(image)
}

/// Calculate a uniform track size for the plain format
fn calculate_track_size(tracks: &[(TrackHeader, Vec<u8>)]) -> usize {
    let largest = tracks
        .iter()
        .map(|(_, payload)| TRACK_INFO_BLOCK_SIZE + payload.len())
        .max()
        .unwrap_or(TRACK_INFO_BLOCK_SIZE);
    largest.div_ceil(256) * 256
}
