/// Sector descriptors stored in track headers

use crate::fdc::{FdcStatus1, FdcStatus2};
use crate::format::constants::{fdc_size_to_bytes, SECTOR_INFO_SIZE};
use crate::format::DiskImageFormat;

/// Sector ID (CHRN) - addressing information for a sector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorId {
    /// C - Cylinder/Track number
    pub track: u8,
    /// H - Head/Side number
    pub side: u8,
    /// R - Sector ID/Record number
    pub sector: u8,
    /// N - Size code (0=128, 1=256, 2=512, 3=1024, 4=2048, etc.)
    pub size_code: u8,
}

impl SectorId {
    /// Create a new sector ID
    pub fn new(track: u8, side: u8, sector: u8, size_code: u8) -> Self {
        Self {
            track,
            side,
            sector,
            size_code,
        }
    }

    /// Get the advertised sector size in bytes based on size code
    pub fn size_bytes(&self) -> usize {
        fdc_size_to_bytes(self.size_code)
    }
}

/// One 8-byte sector descriptor of a track header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorInfo {
    /// Sector addressing information (CHRN)
    pub id: SectorId,
    /// FDC Status Register 1
    pub fdc_status1: FdcStatus1,
    /// FDC Status Register 2
    pub fdc_status2: FdcStatus2,
    /// Stored data length (extended format only, 0 otherwise)
    pub data_length: u16,
}

impl SectorInfo {
    /// Create a descriptor with clean status and no stored length
    pub fn new(id: SectorId) -> Self {
        Self {
            id,
            fdc_status1: FdcStatus1::default(),
            fdc_status2: FdcStatus2::default(),
            data_length: 0,
        }
    }

    /// Parse a descriptor from its 8 bytes
    pub fn parse(bytes: &[u8; SECTOR_INFO_SIZE]) -> Self {
        Self {
            id: SectorId::new(bytes[0], bytes[1], bytes[2], bytes[3]),
            fdc_status1: FdcStatus1::new(bytes[4]),
            fdc_status2: FdcStatus2::new(bytes[5]),
            data_length: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    /// Serialize the descriptor
    pub fn to_bytes(&self) -> [u8; SECTOR_INFO_SIZE] {
        let length = self.data_length.to_le_bytes();
        [
            self.id.track,
            self.id.side,
            self.id.sector,
            self.id.size_code,
            self.fdc_status1.0,
            self.fdc_status2.0,
            length[0],
            length[1],
        ]
    }

    /// Sector id (R)
    #[inline]
    pub fn sector_id(&self) -> u8 {
        self.id.sector
    }

    /// Size declared by the size code
    pub fn advertised_size(&self) -> usize {
        self.id.size_bytes()
    }

    /// Bytes the sector occupies in the container.
    ///
    /// Extended images honour a non-zero stored length; everything else
    /// occupies `128 << size_code`.
    pub fn stored_size(&self, format: DiskImageFormat) -> usize {
        match format {
            DiskImageFormat::ExtendedDSK if self.data_length > 0 => self.data_length as usize,
            _ => self.advertised_size(),
        }
    }

    /// Check if this sector has any FDC errors
    pub fn has_error(&self) -> bool {
        self.fdc_status1.has_error() || self.fdc_status2.has_error()
    }
}
