/// DSK container magic bytes, header offsets and size codes

/// Full disk info signature written into new plain images
pub const STANDARD_DSK_SIGNATURE: &[u8] = b"MV - CPCEMU Disk-File\r\nDisk-Info\r\n";

/// Full disk info signature written into new extended images
pub const EXTENDED_DSK_SIGNATURE: &[u8] = b"EXTENDED CPC DSK File\r\nDisk-Info\r\n";

/// Prefix identifying a plain image
pub const STANDARD_DSK_MAGIC: &[u8] = b"MV - CPC";

/// Prefix identifying an extended image
pub const EXTENDED_DSK_MAGIC: &[u8] = b"EXTENDED CPC DSK File";

/// Length of the magic string area in the disk info block
pub const DISK_INFO_MAGIC_LEN: usize = 34;

/// Track-Info block marker
pub const TRACK_INFO_MARKER: &[u8] = b"Track-Info\r\n";

/// Creator written into new images
pub const CREATOR_SIGNATURE: &[u8] = b"amsdsk 0.1";

/// Length of the creator field
pub const CREATOR_LEN: usize = 14;

/// Maximum number of entries in the extended track size table
pub const MAX_TRACKS: usize = 204;

/// Maximum number of sector descriptors in a track header
pub const MAX_SECTORS_PER_TRACK: usize = 29;

/// Size of disk info block
pub const DISK_INFO_BLOCK_SIZE: usize = 256;

/// Size of track info block
pub const TRACK_INFO_BLOCK_SIZE: usize = 256;

/// Size of sector info entry
pub const SECTOR_INFO_SIZE: usize = 8;

/// Offset of magic bytes in disk info block
pub const DISK_INFO_MAGIC_OFFSET: usize = 0;

/// Offset of creator in disk info block
pub const DISK_INFO_CREATOR_OFFSET: usize = 0x22;

/// Offset of track count in disk info block
pub const DISK_INFO_TRACK_COUNT_OFFSET: usize = 0x30;

/// Offset of side count in disk info block
pub const DISK_INFO_SIDE_COUNT_OFFSET: usize = 0x31;

/// Offset of track size in disk info block (plain format)
pub const DISK_INFO_TRACK_SIZE_OFFSET: usize = 0x32;

/// Offset of the track size table in disk info block (extended format)
pub const DISK_INFO_EXT_TRACK_SIZE_OFFSET: usize = 0x34;

/// Offset of the track number in a track header
pub const TRACK_INFO_TRACK_OFFSET: usize = 0x10;
/// Offset of the side number in a track header
pub const TRACK_INFO_SIDE_OFFSET: usize = 0x11;
/// Offset of the data rate in a track header
pub const TRACK_INFO_DATA_RATE_OFFSET: usize = 0x12;
/// Offset of the recording mode in a track header
pub const TRACK_INFO_RECORDING_MODE_OFFSET: usize = 0x13;
/// Offset of the sector size code in a track header
pub const TRACK_INFO_SECTOR_SIZE_OFFSET: usize = 0x14;
/// Offset of the sector count in a track header
pub const TRACK_INFO_SECTOR_COUNT_OFFSET: usize = 0x15;
/// Offset of the GAP#3 length in a track header
pub const TRACK_INFO_GAP3_OFFSET: usize = 0x16;
/// Offset of the filler byte in a track header
pub const TRACK_INFO_FILLER_OFFSET: usize = 0x17;
/// Offset of the first sector descriptor in a track header
pub const TRACK_INFO_SECTOR_INFO_OFFSET: usize = 0x18;

/// Largest FDC size code with a meaningful byte size
pub const MAX_SIZE_CODE: u8 = 8;

/// Convert FDC size code to actual byte size (`128 << code`)
#[inline]
pub fn fdc_size_to_bytes(size_code: u8) -> usize {
    128usize << size_code.min(MAX_SIZE_CODE)
}

/// Convert byte size to FDC size code
#[inline]
pub fn bytes_to_fdc_size(bytes: usize) -> Option<u8> {
    (0..=MAX_SIZE_CODE).find(|&code| fdc_size_to_bytes(code) == bytes)
}
