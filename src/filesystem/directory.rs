/// AMSDOS directory entries

use crate::filesystem::name::{AmsdosName, EXT_LEN, NAME_LEN};

/// Size of one directory entry
pub const DIR_ENTRY_SIZE: usize = 32;
/// Number of directory entries on an AMSDOS disk
pub const DIR_ENTRIES: usize = 64;
/// User byte marking a free or deleted entry
pub const USER_DELETED: u8 = 0xE5;
/// Highest user number AMSDOS can address
pub const MAX_USER: u8 = 15;
/// Size of a CP/M record
pub const RECORD_SIZE: usize = 128;
/// Block numbers held by one entry
pub const BLOCKS_PER_EXTENT: usize = 16;
/// Records described by one full entry
pub const RECORDS_PER_EXTENT: usize = 128;
/// Allocation block size
pub const BLOCK_SIZE: usize = 1024;
/// Bytes described by one full entry
pub const EXTENT_SIZE: usize = BLOCKS_PER_EXTENT * BLOCK_SIZE;

/// One 32-byte directory entry describing an extent of up to 16KB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    /// User number, 0xE5 when deleted
    pub user: u8,
    /// Base name; bit 7 of bytes may carry attributes
    pub name: [u8; NAME_LEN],
    /// Extension; bit 7 of bytes 0 and 1 are read-only and system
    pub ext: [u8; EXT_LEN],
    /// Extent number, low 5 bits
    pub extent_low: u8,
    /// Byte 13, unused by AMSDOS
    pub reserved: u8,
    /// Extent number, high bits
    pub extent_high: u8,
    /// Valid 128-byte records in this extent
    pub record_count: u8,
    /// Allocation block numbers, 0 for none
    pub blocks: [u8; BLOCKS_PER_EXTENT],
}

impl DirEntry {
    /// A free slot as written by format
    pub fn deleted() -> Self {
        Self::parse(&[USER_DELETED; DIR_ENTRY_SIZE])
    }

    /// A live entry for `extent` of a file
    pub fn new(user: u8, name: &AmsdosName, extent: usize) -> Self {
        Self {
            user,
            name: name.base,
            ext: name.ext,
            extent_low: (extent % 32) as u8,
            reserved: 0,
            extent_high: (extent / 32) as u8,
            record_count: 0,
            blocks: [0; BLOCKS_PER_EXTENT],
        }
    }

    /// Parse an entry from its 32 bytes
    pub fn parse(bytes: &[u8; DIR_ENTRY_SIZE]) -> Self {
        let mut name = [0u8; NAME_LEN];
        let mut ext = [0u8; EXT_LEN];
        let mut blocks = [0u8; BLOCKS_PER_EXTENT];
        name.copy_from_slice(&bytes[1..9]);
        ext.copy_from_slice(&bytes[9..12]);
        blocks.copy_from_slice(&bytes[16..32]);

        Self {
            user: bytes[0],
            name,
            ext,
            extent_low: bytes[12],
            reserved: bytes[13],
            extent_high: bytes[14],
            record_count: bytes[15],
            blocks,
        }
    }

    /// Serialize the entry
    pub fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut bytes = [0u8; DIR_ENTRY_SIZE];
        bytes[0] = self.user;
        bytes[1..9].copy_from_slice(&self.name);
        bytes[9..12].copy_from_slice(&self.ext);
        bytes[12] = self.extent_low;
        bytes[13] = self.reserved;
        bytes[14] = self.extent_high;
        bytes[15] = self.record_count;
        bytes[16..32].copy_from_slice(&self.blocks);
        bytes
    }

    /// True when the slot is free
    pub fn is_deleted(&self) -> bool {
        self.user == USER_DELETED
    }

    /// Name with attribute bits cleared
    pub fn amsdos_name(&self) -> AmsdosName {
        AmsdosName::from_raw(&self.name, &self.ext)
    }

    /// Check whether this live entry belongs to `name` for `user`
    pub fn matches(&self, name: &AmsdosName, user: u8) -> bool {
        !self.is_deleted() && self.user == user && self.amsdos_name() == *name
    }

    /// Position of this entry in its file's chain
    pub fn extent_number(&self) -> usize {
        self.extent_high as usize * 32 + (self.extent_low & 0x1F) as usize
    }

    /// Read-only attribute
    pub fn is_read_only(&self) -> bool {
        self.ext[0] & 0x80 != 0
    }

    /// System (hidden) attribute
    pub fn is_system(&self) -> bool {
        self.ext[1] & 0x80 != 0
    }

    /// Bytes described by the record count
    pub fn size(&self) -> usize {
        self.record_count as usize * RECORD_SIZE
    }

    /// Blocks that hold data, in order, stopping at the first hole
    pub fn data_blocks(&self) -> impl Iterator<Item = u8> + '_ {
        let needed = (self.record_count as usize).div_ceil(RECORDS_PER_EXTENT / BLOCKS_PER_EXTENT);
        self.blocks.iter().copied().take(needed).take_while(|&b| b != 0)
    }

    /// Every non-zero block number referenced
    pub fn allocated_blocks(&self) -> impl Iterator<Item = u8> + '_ {
        self.blocks.iter().copied().filter(|&b| b != 0)
    }
}

/// Size of the file starting at `start` by the directory scan AMSDOS tools
/// traditionally use.
///
/// Sums record counts of entries of the same user from `start` while the next
/// slot has a non-zero `extent_low`. A later extent numbered zero or one
/// stored out of order ends the scan early; [`crate::filesystem::Amsdos::list`]
/// reconstructs chains properly instead.
pub fn heuristic_file_size(entries: &[DirEntry], start: usize) -> usize {
    let Some(first) = entries.get(start) else {
        return 0;
    };
    let mut records = 0;
    let mut index = start;
    loop {
        if entries[index].user == first.user {
            records += entries[index].record_count as usize;
        }
        index += 1;
        if index >= entries.len() || entries[index].extent_low == 0 {
            break;
        }
    }
    records * RECORD_SIZE
}
