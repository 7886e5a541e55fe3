/// Disk geometry specifications and AMSDOS disk-type presets

use crate::error::{DskError, Result};
use crate::format::constants::*;
use crate::format::DiskImageFormat;
use std::fmt;
use std::str::FromStr;

/// AMSDOS disk type, derived from the lowest sector id of track 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskType {
    /// Data format, sectors 0xC1-0xC9, no reserved tracks
    Data,
    /// IBM format, sectors 0x01-0x08, one reserved track
    Ibm,
    /// System (vendor) format, sectors 0x41-0x49, two reserved tracks
    System,
    /// Anything else
    Unknown,
}

impl DiskType {
    /// Classify a disk by the first sector id of track 0
    pub fn from_first_sector_id(id: u8) -> Self {
        match id {
            0xC1 => DiskType::Data,
            0x01 => DiskType::Ibm,
            0x41 => DiskType::System,
            _ => DiskType::Unknown,
        }
    }

    /// Lowest sector id used by this disk type
    pub fn base_sector_id(&self) -> Option<u8> {
        match self {
            DiskType::Data => Some(0xC1),
            DiskType::Ibm => Some(0x01),
            DiskType::System => Some(0x41),
            DiskType::Unknown => None,
        }
    }

    /// Number of tracks before the directory
    pub fn reserved_tracks(&self) -> u8 {
        match self {
            DiskType::Ibm => 1,
            DiskType::System => 2,
            DiskType::Data | DiskType::Unknown => 0,
        }
    }

    /// Get a human-readable name for this disk type
    pub fn name(&self) -> &'static str {
        match self {
            DiskType::Data => "DATA",
            DiskType::Ibm => "IBM",
            DiskType::System => "SYSTEM",
            DiskType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DiskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DiskType {
    type Err = DskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "data" => Ok(DiskType::Data),
            "ibm" => Ok(DiskType::Ibm),
            "system" | "sys" => Ok(DiskType::System),
            other => Err(DskError::UnsupportedFormat(format!(
                "unknown disk type '{}' (expected data, system or ibm)",
                other
            ))),
        }
    }
}

/// Disk format specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    /// Container variant
    pub format: DiskImageFormat,
    /// Number of sides (1 or 2)
    pub num_sides: u8,
    /// Number of tracks per side
    pub num_tracks: u8,
    /// Sectors per track
    pub sectors_per_track: u8,
    /// Sector size in bytes
    pub sector_size: u16,
    /// Track length in the container including its 256 byte header, 0 to derive it
    pub track_length: u16,
    /// First sector ID (usually 0x01, 0x41, or 0xC1)
    pub first_sector_id: u8,
    /// GAP#3 length
    pub gap3_length: u8,
    /// Filler byte for formatting
    pub filler_byte: u8,
    /// Interleave factor (1 = no interleave)
    pub interleave: u8,
}

impl FormatSpec {
    /// Create a new format specification
    pub fn new(num_sides: u8, num_tracks: u8, sectors_per_track: u8, sector_size: u16) -> Self {
        Self {
            format: DiskImageFormat::StandardDSK,
            num_sides,
            num_tracks,
            sectors_per_track,
            sector_size,
            track_length: 0,
            first_sector_id: 0xC1,
            gap3_length: 0x52,
            filler_byte: 0xE5,
            interleave: 1,
        }
    }

    /// Amstrad CPC Data format (40 tracks, 9 sectors from 0xC1, 512 bytes)
    pub fn amstrad_data() -> Self {
        Self::new(1, 40, 9, 512)
    }

    /// Amstrad CPC System format (40 tracks, 9 sectors from 0x41, 512 bytes)
    pub fn amstrad_system() -> Self {
        Self::new(1, 40, 9, 512).with_first_sector_id(0x41)
    }

    /// Amstrad CPC IBM format (40 tracks, 8 sectors from 0x01, 512 bytes)
    pub fn amstrad_ibm() -> Self {
        Self::new(1, 40, 8, 512).with_first_sector_id(0x01)
    }

    /// Preset for a disk type
    pub fn for_disk_type(disk_type: DiskType) -> Result<Self> {
        match disk_type {
            DiskType::Data => Ok(Self::amstrad_data()),
            DiskType::System => Ok(Self::amstrad_system()),
            DiskType::Ibm => Ok(Self::amstrad_ibm()),
            DiskType::Unknown => Err(DskError::UnsupportedFormat(
                "cannot create a disk of unknown type".to_string(),
            )),
        }
    }

    /// Disk type implied by the first sector id
    pub fn disk_type(&self) -> DiskType {
        DiskType::from_first_sector_id(self.first_sector_id)
    }

    /// FDC size code of the sector size
    pub fn size_code(&self) -> Option<u8> {
        bytes_to_fdc_size(self.sector_size as usize)
    }

    /// Track length in the container, header included.
    ///
    /// Derived from the geometry when not set explicitly; extended images
    /// round up to a multiple of 256 since their size table stores size/256.
    pub fn effective_track_length(&self) -> usize {
        let minimum = TRACK_INFO_BLOCK_SIZE
            + self.sectors_per_track as usize * self.sector_size as usize;
        let length = (self.track_length as usize).max(minimum);
        match self.format {
            DiskImageFormat::StandardDSK => length,
            DiskImageFormat::ExtendedDSK => length.div_ceil(256) * 256,
        }
    }

    /// Calculate total disk capacity in bytes
    pub fn total_capacity(&self) -> usize {
        self.num_sides as usize
            * self.num_tracks as usize
            * self.sectors_per_track as usize
            * self.sector_size as usize
    }

    /// Sector ids of one track in physical order
    pub fn sector_order(&self) -> Vec<u8> {
        let count = self.sectors_per_track as usize;
        let step = (self.interleave.max(1)) as usize;
        let mut slots: Vec<Option<u8>> = vec![None; count];
        let mut position = 0;

        for i in 0..count {
            while slots[position].is_some() {
                position = (position + 1) % count;
            }
            slots[position] = Some(self.first_sector_id.wrapping_add(i as u8));
            position = (position + step) % count;
        }

        slots.into_iter().flatten().collect()
    }

    /// Check the geometry can be laid out in the chosen container
    pub fn validate(&self) -> Result<()> {
        if !(1..=2).contains(&self.num_sides) {
            return Err(DskError::UnsupportedFormat(format!(
                "{} sides (expected 1 or 2)",
                self.num_sides
            )));
        }
        if self.num_tracks == 0 {
            return Err(DskError::UnsupportedFormat("zero tracks".to_string()));
        }
        if self.format == DiskImageFormat::ExtendedDSK
            && self.num_tracks as usize * self.num_sides as usize > MAX_TRACKS
        {
            return Err(DskError::UnsupportedFormat(format!(
                "{} tracks do not fit the extended size table",
                self.num_tracks as usize * self.num_sides as usize
            )));
        }
        if self.sectors_per_track == 0 || self.sectors_per_track as usize > MAX_SECTORS_PER_TRACK
        {
            return Err(DskError::UnsupportedFormat(format!(
                "{} sectors per track (expected 1-{})",
                self.sectors_per_track, MAX_SECTORS_PER_TRACK
            )));
        }
        if self.size_code().is_none() {
            return Err(DskError::UnsupportedFormat(format!(
                "sector size {} is not a power of two between 128 and 32768",
                self.sector_size
            )));
        }
        if (self.first_sector_id as usize) + (self.sectors_per_track as usize) > 0x100 {
            return Err(DskError::UnsupportedFormat(format!(
                "sector ids overflow from first id {:#04x}",
                self.first_sector_id
            )));
        }
        let length = self.effective_track_length();
        let limit = match self.format {
            DiskImageFormat::StandardDSK => u16::MAX as usize,
            DiskImageFormat::ExtendedDSK => 255 * 256,
        };
        if length > limit {
            return Err(DskError::UnsupportedFormat(format!(
                "track length {} exceeds {}",
                length, limit
            )));
        }
        Ok(())
    }

    /// Set the container variant
    pub fn with_format(mut self, format: DiskImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the number of sides
    pub fn with_sides(mut self, num_sides: u8) -> Self {
        self.num_sides = num_sides;
        self
    }

    /// Set the number of tracks per side
    pub fn with_tracks(mut self, num_tracks: u8) -> Self {
        self.num_tracks = num_tracks;
        self
    }

    /// Set the number of sectors per track
    pub fn with_sectors_per_track(mut self, sectors_per_track: u8) -> Self {
        self.sectors_per_track = sectors_per_track;
        self
    }

    /// Set the sector size in bytes
    pub fn with_sector_size(mut self, sector_size: u16) -> Self {
        self.sector_size = sector_size;
        self
    }

    /// Set the track length in the container
    pub fn with_track_length(mut self, track_length: u16) -> Self {
        self.track_length = track_length;
        self
    }

    /// Set the interleave factor
    pub fn with_interleave(mut self, interleave: u8) -> Self {
        self.interleave = interleave;
        self
    }

    /// Set the first sector ID
    pub fn with_first_sector_id(mut self, first_sector_id: u8) -> Self {
        self.first_sector_id = first_sector_id;
        self
    }

    /// Set the GAP#3 length
    pub fn with_gap3_length(mut self, gap3_length: u8) -> Self {
        self.gap3_length = gap3_length;
        self
    }

    /// Set the filler byte
    pub fn with_filler_byte(mut self, filler_byte: u8) -> Self {
        self.filler_byte = filler_byte;
        self
    }
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self::amstrad_data()
    }
}
