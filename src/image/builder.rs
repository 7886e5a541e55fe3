/// Builder for creating blank DSK images

use crate::error::{DskError, Result};
use crate::format::constants::*;
use crate::format::{DiskImageFormat, DiskType, FormatSpec};
use crate::image::{DiskImage, SectorId, SectorInfo, TrackHeader};
use log::debug;

/// Builder for constructing formatted, empty DSK images
pub struct DiskImageBuilder {
    spec: FormatSpec,
    creator: Vec<u8>,
}

impl DiskImageBuilder {
    /// Create a new builder with default values (AMSDOS data format)
    pub fn new() -> Self {
        Self {
            spec: FormatSpec::amstrad_data(),
            creator: CREATOR_SIGNATURE.to_vec(),
        }
    }

    /// Set the DSK format
    pub fn format(mut self, format: DiskImageFormat) -> Self {
        self.spec.format = format;
        self
    }

    /// Set the format specification
    pub fn spec(mut self, spec: FormatSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Use the preset geometry of a disk type
    pub fn disk_type(mut self, disk_type: DiskType) -> Result<Self> {
        let format = self.spec.format;
        self.spec = FormatSpec::for_disk_type(disk_type)?.with_format(format);
        Ok(self)
    }

    /// Set the number of sides
    pub fn num_sides(mut self, num_sides: u8) -> Self {
        self.spec.num_sides = num_sides;
        self
    }

    /// Set the number of tracks
    pub fn num_tracks(mut self, num_tracks: u8) -> Self {
        self.spec.num_tracks = num_tracks;
        self
    }

    /// Set sectors per track
    pub fn sectors_per_track(mut self, sectors_per_track: u8) -> Self {
        self.spec.sectors_per_track = sectors_per_track;
        self
    }

    /// Set sector size
    pub fn sector_size(mut self, sector_size: u16) -> Self {
        self.spec.sector_size = sector_size;
        self
    }

    /// Set the track length in the container
    pub fn track_length(mut self, track_length: u16) -> Self {
        self.spec.track_length = track_length;
        self
    }

    /// Set the first sector id
    pub fn first_sector_id(mut self, first_sector_id: u8) -> Self {
        self.spec.first_sector_id = first_sector_id;
        self
    }

    /// Set the sector interleave
    pub fn interleave(mut self, interleave: u8) -> Self {
        self.spec.interleave = interleave;
        self
    }

    /// Set the creator string (truncated to 14 bytes)
    pub fn creator(mut self, creator: &str) -> Self {
        self.creator = creator.bytes().take(CREATOR_LEN).collect();
        self
    }

    /// Build the DSK image with the specified configuration
    pub fn build(self) -> Result<DiskImage> {
        let spec = self.spec;
        spec.validate()?;
        let size_code = spec
            .size_code()
            .ok_or_else(|| DskError::UnsupportedFormat("sector size".to_string()))?;
        let track_length = spec.effective_track_length();
        let track_count = spec.num_tracks as usize * spec.num_sides as usize;

        let mut header = vec![0u8; DISK_INFO_BLOCK_SIZE];
        let signature = spec.format.signature();
        header[..signature.len()].copy_from_slice(signature);
        let creator_len = self.creator.len().min(CREATOR_LEN);
        header[DISK_INFO_CREATOR_OFFSET..DISK_INFO_CREATOR_OFFSET + creator_len]
            .copy_from_slice(&self.creator[..creator_len]);
        header[DISK_INFO_TRACK_COUNT_OFFSET] = spec.num_tracks;
        header[DISK_INFO_SIDE_COUNT_OFFSET] = spec.num_sides;
        match spec.format {
            DiskImageFormat::StandardDSK => {
                let size = (track_length as u16).to_le_bytes();
                header[DISK_INFO_TRACK_SIZE_OFFSET..DISK_INFO_TRACK_SIZE_OFFSET + 2]
                    .copy_from_slice(&size);
            }
            DiskImageFormat::ExtendedDSK => {
                let high = (track_length >> 8) as u8;
                header[DISK_INFO_EXT_TRACK_SIZE_OFFSET..DISK_INFO_EXT_TRACK_SIZE_OFFSET + track_count]
                    .fill(high);
            }
        }

        let order = spec.sector_order();
        let mut image = vec![spec.filler_byte; track_count * track_length];

        for track_num in 0..spec.num_tracks {
            for side in 0..spec.num_sides {
                let mut track = TrackHeader::new(track_num, side);
                track.sector_size_code = size_code;
                track.gap3_length = spec.gap3_length;
                track.filler_byte = spec.filler_byte;
                track.sectors = order
                    .iter()
                    .map(|&id| {
                        let mut info = SectorInfo::new(SectorId::new(track_num, side, id, size_code));
                        if spec.format == DiskImageFormat::ExtendedDSK {
                            info.data_length = spec.sector_size;
                        }
                        info
                    })
                    .collect();

                let index = track_num as usize * spec.num_sides as usize + side as usize;
                let start = index * track_length;
                image[start..start + TRACK_INFO_BLOCK_SIZE].copy_from_slice(&track.to_bytes());
            }
        }

        debug!(
            "Built blank {} image: {} tracks, {} sides, {} x {} byte sectors from {:#04x}",
            spec.format.name(),
            spec.num_tracks,
            spec.num_sides,
            spec.sectors_per_track,
            spec.sector_size,
            spec.first_sector_id
        );

        let mut image = DiskImage::from_parts(header, image)?;
        image.changed = true;
        Ok(image)
    }
}

impl Default for DiskImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let image = DiskImageBuilder::new().build().unwrap();

        assert_eq!(image.format(), DiskImageFormat::StandardDSK);
        assert_eq!(image.num_sides(), 1);
        assert_eq!(image.num_tracks(), 40);
        assert_eq!(image.track_size(0), Some(0x1300));
        assert_eq!(image.to_bytes().len(), 256 + 40 * 0x1300);
    }

    #[test]
    fn test_builder_extended() {
        let image = DiskImageBuilder::new()
            .format(DiskImageFormat::ExtendedDSK)
            .num_sides(2)
            .num_tracks(42)
            .build()
            .unwrap();

        assert_eq!(image.format(), DiskImageFormat::ExtendedDSK);
        assert_eq!(image.track_count(), 84);
        let header = image.header_bytes();
        assert_eq!(header[DISK_INFO_EXT_TRACK_SIZE_OFFSET], 0x13);
        assert_eq!(header[DISK_INFO_EXT_TRACK_SIZE_OFFSET + 83], 0x13);
        assert_eq!(header[DISK_INFO_EXT_TRACK_SIZE_OFFSET + 84], 0);

        let track = image.track(image.track_index(41, 1)).unwrap();
        assert_eq!(track.track_number, 41);
        assert_eq!(track.side_number, 1);
        assert_eq!(track.sectors()[0].data_length, 512);
    }

    #[test]
    fn test_builder_disk_types() {
        for (disk_type, first, count) in [
            (DiskType::Data, 0xC1, 9),
            (DiskType::System, 0x41, 9),
            (DiskType::Ibm, 0x01, 8),
        ] {
            let image = DiskImageBuilder::new().disk_type(disk_type).unwrap().build().unwrap();
            assert_eq!(image.first_sector_id().unwrap(), first);
            assert_eq!(image.disk_type().unwrap(), disk_type);
            assert_eq!(image.track(0).unwrap().sector_count(), count);
        }
    }

    #[test]
    fn test_builder_interleave_layout() {
        let image = DiskImageBuilder::new().interleave(2).build().unwrap();
        let track = image.track(0).unwrap();
        let ids: Vec<u8> = track.sectors().iter().map(|s| s.sector_id()).collect();
        assert_eq!(ids, vec![0xC1, 0xC6, 0xC2, 0xC7, 0xC3, 0xC8, 0xC4, 0xC9, 0xC5]);
        assert_eq!(image.sector_offset(0, 0, 0xC2).unwrap(), 256 + 2 * 512);
        assert_eq!(
            image.sector_offset_by_logical(1).unwrap(),
            image.sector_offset(0, 0, 0xC2).unwrap()
        );
    }

    #[test]
    fn test_builder_fills_sectors() {
        let image = DiskImageBuilder::new()
            .num_tracks(1)
            .sectors_per_track(2)
            .sector_size(256)
            .build()
            .unwrap();
        assert_eq!(image.sector_data(1).unwrap(), vec![0xE5; 256].as_slice());
    }

    #[test]
    fn test_builder_rejects_bad_geometry() {
        assert!(DiskImageBuilder::new().num_sides(0).build().is_err());
        assert!(DiskImageBuilder::new().sector_size(300).build().is_err());
    }
}
