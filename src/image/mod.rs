/// DSK image container

/// Image builder for creating blank DSK images
pub mod builder;
/// Sector descriptors
pub mod sector;
/// Track headers and data rate
pub mod track;

pub use builder::DiskImageBuilder;
pub use sector::{SectorId, SectorInfo};
pub use track::{DataRate, RecordingMode, TrackHeader};

use crate::error::{DskError, Result};
use crate::format::constants::*;
use crate::format::{detect_format, DiskImageFormat, DiskType, FormatSpec};
use crate::io::device::FloppyDriver;
use log::{debug, error, trace, warn};
use std::cell::OnceCell;
use std::path::Path;

/// A loaded DSK or EDSK image.
///
/// The 256-byte disk info block is kept verbatim next to a buffer holding
/// every track (header and payload) back to back, so an unmodified image
/// saves byte for byte. Track headers are parsed on first use and cached;
/// sector writes only touch payload bytes and never invalidate the cache.
#[derive(Debug, Clone)]
pub struct DiskImage {
    pub(crate) format: DiskImageFormat,
    pub(crate) header: Vec<u8>,
    pub(crate) image: Vec<u8>,
    track_sizes: Vec<usize>,
    track_offsets: Vec<usize>,
    tracks: Vec<OnceCell<TrackHeader>>,
    pub(crate) changed: bool,
    pub(crate) filename: Option<String>,
}

impl DiskImage {
    /// Open a DSK or EDSK file from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        crate::io::reader::read_dsk(path)
    }

    /// Create a new blank DSK image with the given specification
    pub fn create(spec: FormatSpec) -> Result<Self> {
        DiskImageBuilder::new().spec(spec).build()
    }

    /// Create a new builder for constructing DSK images
    pub fn builder() -> DiskImageBuilder {
        DiskImageBuilder::new()
    }

    /// Parse an image from its serialized bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DISK_INFO_BLOCK_SIZE {
            return Err(DskError::parse(
                bytes.len(),
                "File too short for a disk info block",
            ));
        }
        let (header, body) = bytes.split_at(DISK_INFO_BLOCK_SIZE);
        Self::from_parts(header.to_vec(), body.to_vec())
    }

    /// Assemble an image from a disk info block and the track data after it
    pub(crate) fn from_parts(header: Vec<u8>, mut image: Vec<u8>) -> Result<Self> {
        let format = detect_format(&header)
            .ok_or_else(|| DskError::invalid_format("Unknown DSK magic"))?;

        let num_tracks = header[DISK_INFO_TRACK_COUNT_OFFSET] as usize;
        let num_sides = header[DISK_INFO_SIDE_COUNT_OFFSET] as usize;
        if num_sides == 0 || num_sides > 2 {
            return Err(DskError::parse(
                DISK_INFO_SIDE_COUNT_OFFSET,
                format!("Invalid side count {}", num_sides),
            ));
        }

        let count = num_tracks * num_sides;
        let track_sizes: Vec<usize> = match format {
            DiskImageFormat::StandardDSK => {
                let size = u16::from_le_bytes([
                    header[DISK_INFO_TRACK_SIZE_OFFSET],
                    header[DISK_INFO_TRACK_SIZE_OFFSET + 1],
                ]) as usize;
                vec![size; count]
            }
            DiskImageFormat::ExtendedDSK => {
                if count > MAX_TRACKS {
                    return Err(DskError::parse(
                        DISK_INFO_TRACK_COUNT_OFFSET,
                        format!("{} tracks exceed the size table", count),
                    ));
                }
                header[DISK_INFO_EXT_TRACK_SIZE_OFFSET..DISK_INFO_EXT_TRACK_SIZE_OFFSET + count]
                    .iter()
                    .map(|&high| (high as usize) << 8)
                    .collect()
            }
        };

        let mut track_offsets = Vec::with_capacity(count);
        let mut total = 0usize;
        for size in &track_sizes {
            track_offsets.push(total);
            total += size;
        }

        if image.len() < total {
            return Err(DskError::invalid_format(format!(
                "Declared image size {} exceeds the {} bytes available",
                total,
                image.len()
            )));
        }
        if image.len() > total {
            warn!(
                "Dropping {} trailing bytes after the declared image size",
                image.len() - total
            );
            image.truncate(total);
        }

        debug!(
            "Loaded {} image: {} tracks, {} sides, {} bytes of track data",
            format.name(),
            num_tracks,
            num_sides,
            total
        );

        Ok(Self {
            format,
            header,
            image,
            track_sizes,
            track_offsets,
            tracks: (0..count).map(|_| OnceCell::new()).collect(),
            changed: false,
            filename: None,
        })
    }

    /// Get the format type
    pub fn format(&self) -> DiskImageFormat {
        self.format
    }

    /// Get the original filename if loaded from disk
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Number of tracks per side
    pub fn num_tracks(&self) -> u8 {
        self.header[DISK_INFO_TRACK_COUNT_OFFSET]
    }

    /// Number of sides
    pub fn num_sides(&self) -> u8 {
        self.header[DISK_INFO_SIDE_COUNT_OFFSET]
    }

    /// Number of tracks over all sides
    pub fn track_count(&self) -> usize {
        self.track_sizes.len()
    }

    /// Linear track index of a physical track and side
    pub fn track_index(&self, track: u8, side: u8) -> usize {
        track as usize * self.num_sides() as usize + side as usize
    }

    /// Size of a track in the container, header included
    pub fn track_size(&self, index: usize) -> Option<usize> {
        self.track_sizes.get(index).copied()
    }

    /// Magic text of the disk info block, up to its first line break
    pub fn magic(&self) -> String {
        let magic = &self.header[..DISK_INFO_MAGIC_LEN];
        let end = magic
            .iter()
            .position(|&b| b == b'\r' || b == b'\n' || b == 0)
            .unwrap_or(magic.len());
        String::from_utf8_lossy(&magic[..end]).trim_end().to_string()
    }

    /// Creator name stored in the disk info block
    pub fn creator(&self) -> String {
        let creator = &self.header[DISK_INFO_CREATOR_OFFSET..DISK_INFO_CREATOR_OFFSET + CREATOR_LEN];
        let end = creator.iter().position(|&b| b == 0).unwrap_or(creator.len());
        String::from_utf8_lossy(&creator[..end]).trim_end().to_string()
    }

    /// Raw disk info block
    pub fn header_bytes(&self) -> &[u8] {
        &self.header
    }

    fn invalid_track(&self, index: usize) -> DskError {
        let sides = self.num_sides().max(1) as usize;
        DskError::InvalidTrack {
            side: (index % sides) as u8,
            track: (index / sides).min(u8::MAX as usize) as u8,
            max: self.num_tracks().saturating_sub(1),
        }
    }

    /// Get a track header by linear index, parsing it on first access.
    ///
    /// Unformatted tracks of extended images yield a header with no sectors.
    /// A missing Track-Info marker fails this call only; the image itself
    /// stays usable.
    pub fn track(&self, index: usize) -> Result<&TrackHeader> {
        let cell = self
            .tracks
            .get(index)
            .ok_or_else(|| self.invalid_track(index))?;
        if let Some(track) = cell.get() {
            return Ok(track);
        }
        let parsed = self.parse_track(index)?;
        Ok(cell.get_or_init(|| parsed))
    }

    fn parse_track(&self, index: usize) -> Result<TrackHeader> {
        let offset = self.track_offsets[index];
        let size = self.track_sizes[index];
        if size == 0 {
            trace!("Track index {} is unformatted", index);
            let sides = self.num_sides().max(1) as usize;
            return Ok(TrackHeader::new((index / sides) as u8, (index % sides) as u8));
        }

        let region = &self.image[offset..offset + size];
        if !track::has_track_marker(region) {
            error!(
                "Missing Track-Info marker for track index {} at offset {:#06x}",
                index, offset
            );
            return Err(DskError::InvalidTrackMagic { index, offset });
        }

        let header = TrackHeader::parse(region, DISK_INFO_BLOCK_SIZE + offset)?;
        let needed = TRACK_INFO_BLOCK_SIZE + header.data_size(self.format);
        if needed > size {
            warn!(
                "Track index {} declares {} bytes of sectors in a {} byte track",
                index,
                needed - TRACK_INFO_BLOCK_SIZE,
                size
            );
        }
        trace!(
            "Parsed track index {}: track {} side {} with {} sectors",
            index,
            header.track_number,
            header.side_number,
            header.sector_count()
        );
        Ok(header)
    }

    /// Resolve an absolute payload position into a bounds-checked range
    fn sector_range(&self, index: usize, relative: usize, size: usize) -> Result<(usize, usize)> {
        let start = self.track_offsets[index] + TRACK_INFO_BLOCK_SIZE + relative;
        let track_end = self.track_offsets[index] + self.track_sizes[index];
        if start + size > track_end {
            return Err(DskError::parse(
                DISK_INFO_BLOCK_SIZE + start,
                format!("Sector data overruns track index {}", index),
            ));
        }
        Ok((start, size))
    }

    fn locate(&self, track_id: u8, side: u8, sector_id: u8) -> Result<(usize, usize)> {
        let preferred = self.track_index(track_id, side);
        let candidates =
            std::iter::once(preferred).chain((0..self.track_count()).filter(|&i| i != preferred));

        let mut preferred_error = None;
        for index in candidates {
            if index >= self.track_count() {
                continue;
            }
            let track = match self.track(index) {
                Ok(track) => track,
                Err(e) => {
                    warn!("Skipping track index {} while locating sector: {}", index, e);
                    if index == preferred {
                        preferred_error = Some(e);
                    }
                    continue;
                }
            };
            if track.track_number != track_id || track.side_number != side {
                continue;
            }
            if let Some((relative, size)) = track.sector_position(sector_id, self.format) {
                return self.sector_range(index, relative, size);
            }
        }

        Err(preferred_error.unwrap_or(DskError::InvalidSector {
            side,
            track: track_id,
            id: sector_id,
        }))
    }

    /// Byte offset into the track buffer of a sector addressed by its
    /// header track number, side and sector id
    pub fn sector_offset(&self, track_id: u8, side: u8, sector_id: u8) -> Result<usize> {
        let (offset, _) = self.locate(track_id, side, sector_id)?;
        trace!(
            "Sector T{} S{} id {:#04x} at offset {:#x}",
            track_id,
            side,
            sector_id,
            offset
        );
        Ok(offset)
    }

    fn locate_logical(&self, logical: usize) -> Result<(usize, usize)> {
        let first_id = self.first_sector_id()?;
        let mut remaining = logical;

        for index in 0..self.track_count() {
            let track = self.track(index)?;
            let count = track.sector_count();
            if remaining < count {
                let id = u8::try_from(first_id as usize + remaining)
                    .map_err(|_| DskError::InvalidLogicalSector(logical))?;
                let (relative, size) = track.sector_position(id, self.format).ok_or(
                    DskError::InvalidSector {
                        side: track.side_number,
                        track: track.track_number,
                        id,
                    },
                )?;
                return self.sector_range(index, relative, size);
            }
            remaining -= count;
        }

        Err(DskError::InvalidLogicalSector(logical))
    }

    /// Byte offset into the track buffer of logical sector `logical`.
    ///
    /// Tracks are walked in index order accumulating sector counts; inside the
    /// owning track the sector id is the first sector id of track 0 plus the
    /// residual, wherever that sector is stored.
    pub fn sector_offset_by_logical(&self, logical: usize) -> Result<usize> {
        let (offset, _) = self.locate_logical(logical)?;
        Ok(offset)
    }

    /// Total number of logical sectors
    pub fn logical_sector_count(&self) -> Result<usize> {
        let mut total = 0;
        for index in 0..self.track_count() {
            total += self.track(index)?.sector_count();
        }
        Ok(total)
    }

    /// Borrow the payload of a logical sector
    pub fn sector_data(&self, logical: usize) -> Result<&[u8]> {
        let (offset, size) = self.locate_logical(logical)?;
        Ok(&self.image[offset..offset + size])
    }

    /// Copy a logical sector into `buffer`, whose length must equal the sector size
    pub fn read_sector(&self, logical: usize, buffer: &mut [u8]) -> Result<()> {
        let (offset, size) = self.locate_logical(logical)?;
        if buffer.len() != size {
            return Err(DskError::SizeMismatch {
                expected: size,
                actual: buffer.len(),
            });
        }
        buffer.copy_from_slice(&self.image[offset..offset + size]);
        Ok(())
    }

    /// Overwrite a logical sector with `data`, whose length must equal the sector size
    pub fn write_sector(&mut self, logical: usize, data: &[u8]) -> Result<()> {
        let (offset, size) = self.locate_logical(logical)?;
        self.store(offset, size, data)
    }

    /// Borrow a sector addressed by header track number, side and sector id
    pub fn read_sector_by_id(&self, track_id: u8, side: u8, sector_id: u8) -> Result<&[u8]> {
        let (offset, size) = self.locate(track_id, side, sector_id)?;
        Ok(&self.image[offset..offset + size])
    }

    /// Overwrite a sector addressed by header track number, side and sector id
    pub fn write_sector_by_id(
        &mut self,
        track_id: u8,
        side: u8,
        sector_id: u8,
        data: &[u8],
    ) -> Result<()> {
        let (offset, size) = self.locate(track_id, side, sector_id)?;
        self.store(offset, size, data)
    }

    /// Borrow the n-th stored sector of a track
    pub fn sector_at(&self, index: usize, position: usize) -> Result<&[u8]> {
        let track = self.track(index)?;
        let (relative, size) = track
            .sector_position_at(position, self.format)
            .ok_or(DskError::InvalidSector {
                side: track.side_number,
                track: track.track_number,
                id: position as u8,
            })?;
        let (offset, size) = self.sector_range(index, relative, size)?;
        Ok(&self.image[offset..offset + size])
    }

    /// Write bytes into the track buffer at an absolute offset
    pub(crate) fn write_raw(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let end = offset + data.len();
        if end > self.image.len() {
            return Err(DskError::parse(
                DISK_INFO_BLOCK_SIZE + offset,
                "Write beyond the end of the image",
            ));
        }
        self.image[offset..end].copy_from_slice(data);
        self.changed = true;
        Ok(())
    }

    /// Borrow bytes of the track buffer at an absolute offset
    pub(crate) fn read_raw(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.image.get(offset..offset + len).ok_or_else(|| {
            DskError::parse(DISK_INFO_BLOCK_SIZE + offset, "Read beyond the end of the image")
        })
    }

    fn store(&mut self, offset: usize, size: usize, data: &[u8]) -> Result<()> {
        if data.len() != size {
            return Err(DskError::SizeMismatch {
                expected: size,
                actual: data.len(),
            });
        }
        self.write_raw(offset, data)
    }

    /// Lowest sector id found in track 0
    pub fn first_sector_id(&self) -> Result<u8> {
        self.track(0)?
            .min_sector_id()
            .ok_or_else(|| DskError::invalid_format("Track 0 has no sectors"))
    }

    /// AMSDOS disk type implied by the first sector id
    pub fn disk_type(&self) -> Result<DiskType> {
        Ok(DiskType::from_first_sector_id(self.first_sector_id()?))
    }

    /// Formatted capacity: the sum over tracks of `sector_count * (128 << size_code)`
    pub fn capacity(&self) -> Result<usize> {
        let mut total = 0;
        for index in 0..self.track_count() {
            total += self.track(index)?.capacity();
        }
        Ok(total)
    }

    /// Serialize the image: disk info block followed by the track buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.header.len() + self.image.len());
        bytes.extend_from_slice(&self.header);
        bytes.extend_from_slice(&self.image);
        bytes
    }

    /// Save the DSK image to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        crate::io::writer::write_dsk(self, path)?;
        self.changed = false;
        Ok(())
    }

    /// Check if the image has been modified
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Mark the image as unchanged
    pub fn mark_unchanged(&mut self) {
        self.changed = false;
    }

    /// Format and write every track of this image onto a physical disk
    pub fn write_to_device(&self, driver: &mut dyn FloppyDriver) -> Result<()> {
        crate::io::device::write_image(self, driver)
    }

    /// Read a physical disk into a new plain image, discovering the sector
    /// layout of every track from the medium
    pub fn read_from_device(driver: &mut dyn FloppyDriver, tracks: u8, sides: u8) -> Result<Self> {
        crate::io::device::read_image(driver, tracks, sides)
    }
}
