/// Track headers parsed from the container

use crate::error::{DskError, Result};
use crate::format::constants::*;
use crate::format::DiskImageFormat;
use crate::image::sector::SectorInfo;

/// Recording mode for the track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingMode {
    /// Unknown recording mode
    Unknown,
    /// FM (Frequency Modulation) - single density
    FM,
    /// MFM (Modified Frequency Modulation) - double density
    MFM,
}

impl From<u8> for RecordingMode {
    fn from(value: u8) -> Self {
        match value {
            1 => RecordingMode::FM,
            2 => RecordingMode::MFM,
            _ => RecordingMode::Unknown,
        }
    }
}

impl From<RecordingMode> for u8 {
    fn from(mode: RecordingMode) -> Self {
        match mode {
            RecordingMode::Unknown => 0,
            RecordingMode::FM => 1,
            RecordingMode::MFM => 2,
        }
    }
}

/// Data rate for the track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRate {
    /// Unknown data rate
    Unknown,
    /// Single/Double Density
    SingleDouble,
    /// High Density
    High,
    /// Extended Density
    Extended,
}

impl From<u8> for DataRate {
    fn from(value: u8) -> Self {
        match value {
            1 => DataRate::SingleDouble,
            2 => DataRate::High,
            3 => DataRate::Extended,
            _ => DataRate::Unknown,
        }
    }
}

impl From<DataRate> for u8 {
    fn from(rate: DataRate) -> Self {
        match rate {
            DataRate::Unknown => 0,
            DataRate::SingleDouble => 1,
            DataRate::High => 2,
            DataRate::Extended => 3,
        }
    }
}

/// The 256-byte Track-Info block that starts every formatted track.
///
/// Sector descriptors are kept in stored order; that order is the order of
/// the sector payloads following the header, whatever the sector ids are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHeader {
    /// Physical track number
    pub track_number: u8,
    /// Physical side number (0 or 1)
    pub side_number: u8,
    /// Data rate (extension byte)
    pub data_rate: DataRate,
    /// Recording mode (extension byte)
    pub recording_mode: RecordingMode,
    /// Sector size code shared by the track
    pub sector_size_code: u8,
    /// GAP#3 length
    pub gap3_length: u8,
    /// Filler byte used for formatting
    pub filler_byte: u8,
    /// Sector descriptors in stored order
    pub sectors: Vec<SectorInfo>,
}

impl TrackHeader {
    /// Create an empty track header
    pub fn new(track_number: u8, side_number: u8) -> Self {
        Self {
            track_number,
            side_number,
            data_rate: DataRate::Unknown,
            recording_mode: RecordingMode::Unknown,
            sector_size_code: 2,
            gap3_length: 0x52,
            filler_byte: 0xE5,
            sectors: Vec::new(),
        }
    }

    /// Parse a track header from the start of a track region
    ///
    /// `offset` is only used to report errors.
    pub fn parse(bytes: &[u8], offset: usize) -> Result<Self> {
        if bytes.len() < TRACK_INFO_BLOCK_SIZE {
            return Err(DskError::parse(offset, "Track header truncated"));
        }

        let sector_count = bytes[TRACK_INFO_SECTOR_COUNT_OFFSET] as usize;
        if sector_count > MAX_SECTORS_PER_TRACK {
            return Err(DskError::parse(
                offset + TRACK_INFO_SECTOR_COUNT_OFFSET,
                format!("{} sectors in track header", sector_count),
            ));
        }

        let sectors = bytes[TRACK_INFO_SECTOR_INFO_OFFSET..]
            .chunks_exact(SECTOR_INFO_SIZE)
            .take(sector_count)
            .filter_map(|chunk| <&[u8; SECTOR_INFO_SIZE]>::try_from(chunk).ok())
            .map(SectorInfo::parse)
            .collect();

        Ok(Self {
            track_number: bytes[TRACK_INFO_TRACK_OFFSET],
            side_number: bytes[TRACK_INFO_SIDE_OFFSET],
            data_rate: DataRate::from(bytes[TRACK_INFO_DATA_RATE_OFFSET]),
            recording_mode: RecordingMode::from(bytes[TRACK_INFO_RECORDING_MODE_OFFSET]),
            sector_size_code: bytes[TRACK_INFO_SECTOR_SIZE_OFFSET],
            gap3_length: bytes[TRACK_INFO_GAP3_OFFSET],
            filler_byte: bytes[TRACK_INFO_FILLER_OFFSET],
            sectors,
        })
    }

    /// Serialize the header into its 256-byte block
    pub fn to_bytes(&self) -> [u8; TRACK_INFO_BLOCK_SIZE] {
        let mut block = [0u8; TRACK_INFO_BLOCK_SIZE];
        block[..TRACK_INFO_MARKER.len()].copy_from_slice(TRACK_INFO_MARKER);
        block[TRACK_INFO_TRACK_OFFSET] = self.track_number;
        block[TRACK_INFO_SIDE_OFFSET] = self.side_number;
        block[TRACK_INFO_DATA_RATE_OFFSET] = self.data_rate.into();
        block[TRACK_INFO_RECORDING_MODE_OFFSET] = self.recording_mode.into();
        block[TRACK_INFO_SECTOR_SIZE_OFFSET] = self.sector_size_code;
        block[TRACK_INFO_SECTOR_COUNT_OFFSET] = self.sectors.len() as u8;
        block[TRACK_INFO_GAP3_OFFSET] = self.gap3_length;
        block[TRACK_INFO_FILLER_OFFSET] = self.filler_byte;

        for (i, sector) in self.sectors.iter().take(MAX_SECTORS_PER_TRACK).enumerate() {
            let start = TRACK_INFO_SECTOR_INFO_OFFSET + i * SECTOR_INFO_SIZE;
            block[start..start + SECTOR_INFO_SIZE].copy_from_slice(&sector.to_bytes());
        }
        block
    }

    /// Number of sectors in the track
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    /// Get a reference to all sector descriptors
    pub fn sectors(&self) -> &[SectorInfo] {
        &self.sectors
    }

    /// Find a descriptor by sector id
    pub fn get_sector(&self, sector_id: u8) -> Option<&SectorInfo> {
        self.sectors.iter().find(|s| s.sector_id() == sector_id)
    }

    /// Lowest sector id in the track
    pub fn min_sector_id(&self) -> Option<u8> {
        self.sectors.iter().map(SectorInfo::sector_id).min()
    }

    /// Size of one sector as declared by the track
    pub fn sector_size(&self) -> usize {
        fdc_size_to_bytes(self.sector_size_code)
    }

    /// Formatted capacity: `sector_count * (128 << sector_size_code)`
    pub fn capacity(&self) -> usize {
        self.sector_count() * self.sector_size()
    }

    /// Position of a sector's payload relative to the end of the header.
    ///
    /// Walks the descriptors in stored order accumulating the stored size of
    /// every sector before the target. Returns `(relative_offset, size)`.
    pub fn sector_position(&self, sector_id: u8, format: DiskImageFormat) -> Option<(usize, usize)> {
        let mut offset = 0;
        for sector in &self.sectors {
            let size = sector.stored_size(format);
            if sector.sector_id() == sector_id {
                return Some((offset, size));
            }
            offset += size;
        }
        None
    }

    /// Position of the n-th stored sector's payload relative to the end of the header
    pub fn sector_position_at(&self, index: usize, format: DiskImageFormat) -> Option<(usize, usize)> {
        let sector = self.sectors.get(index)?;
        let offset = self.sectors[..index]
            .iter()
            .map(|s| s.stored_size(format))
            .sum();
        Some((offset, sector.stored_size(format)))
    }

    /// Total payload bytes following the header
    pub fn data_size(&self, format: DiskImageFormat) -> usize {
        self.sectors.iter().map(|s| s.stored_size(format)).sum()
    }
}

/// Check the Track-Info marker at the start of a track region
pub fn has_track_marker(bytes: &[u8]) -> bool {
    bytes.starts_with(TRACK_INFO_MARKER)
}
