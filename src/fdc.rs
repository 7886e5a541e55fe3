/// Floppy Disk Controller (FDC) status registers
///
/// Every sector descriptor in a track header records the ST1 and ST2 bytes
/// the uPD765 reported when the sector was read from a real disk.

use std::fmt;

fn write_flags(f: &mut fmt::Formatter<'_>, value: u8, table: &[(u8, &str)]) -> fmt::Result {
    if value == 0 {
        return write!(f, "OK");
    }
    let names: Vec<&str> = table
        .iter()
        .filter(|(bit, _)| value & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    write!(f, "{}", names.join("|"))
}

/// FDC Status Register 1 (ST1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FdcStatus1(pub u8);

impl FdcStatus1 {
    /// End of Cylinder: sector beyond the final sector of a track
    pub const EN: u8 = 0x80;
    /// Data Error: CRC error in the ID or data field
    pub const DE: u8 = 0x20;
    /// Overrun: no DMA service in time
    pub const OR: u8 = 0x10;
    /// No Data: sector not found
    pub const ND: u8 = 0x04;
    /// Not Writable: write protected medium
    pub const NW: u8 = 0x02;
    /// Missing Address Mark
    pub const MA: u8 = 0x01;

    const NAMES: [(u8, &'static str); 6] = [
        (Self::EN, "EN"),
        (Self::DE, "DE"),
        (Self::OR, "OR"),
        (Self::ND, "ND"),
        (Self::NW, "NW"),
        (Self::MA, "MA"),
    ];

    /// Create a new FdcStatus1 from a raw byte
    #[inline]
    pub fn new(value: u8) -> Self {
        FdcStatus1(value)
    }

    /// Check whether a flag is set
    #[inline]
    pub fn contains(&self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// Check if a CRC error was reported
    #[inline]
    pub fn data_error(&self) -> bool {
        self.contains(Self::DE)
    }

    /// Check if the sector could not be found
    #[inline]
    pub fn no_data(&self) -> bool {
        self.contains(Self::ND)
    }

    /// Check if any error flag is set
    #[inline]
    pub fn has_error(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for FdcStatus1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_flags(f, self.0, &Self::NAMES)
    }
}

/// FDC Status Register 2 (ST2)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FdcStatus2(pub u8);

impl FdcStatus2 {
    /// Control Mark: deleted data address mark
    pub const CM: u8 = 0x40;
    /// Data Error in Data Field
    pub const DD: u8 = 0x20;
    /// Wrong Cylinder
    pub const WC: u8 = 0x10;
    /// Bad Cylinder
    pub const BC: u8 = 0x02;
    /// Missing Address Mark in Data Field
    pub const MD: u8 = 0x01;

    const NAMES: [(u8, &'static str); 5] = [
        (Self::CM, "CM"),
        (Self::DD, "DD"),
        (Self::WC, "WC"),
        (Self::BC, "BC"),
        (Self::MD, "MD"),
    ];

    /// Create a new FdcStatus2 from a raw byte
    #[inline]
    pub fn new(value: u8) -> Self {
        FdcStatus2(value)
    }

    /// Check whether a flag is set
    #[inline]
    pub fn contains(&self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// Check if the sector carries a deleted data mark
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.contains(Self::CM)
    }

    /// Check if any error flag is set (excluding deleted data mark)
    #[inline]
    pub fn has_error(&self) -> bool {
        (self.0 & !Self::CM) != 0
    }
}

impl fmt::Display for FdcStatus2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_flags(f, self.0, &Self::NAMES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fdc_status1_flags() {
        let st1 = FdcStatus1(FdcStatus1::EN | FdcStatus1::DE);
        assert!(st1.contains(FdcStatus1::EN));
        assert!(st1.data_error());
        assert!(!st1.no_data());
        assert!(st1.has_error());
        assert!(!FdcStatus1::default().has_error());
    }

    #[test]
    fn test_fdc_status2_deleted_data_is_not_an_error() {
        let st2 = FdcStatus2(FdcStatus2::CM);
        assert!(st2.is_deleted());
        assert!(!st2.has_error());
        assert!(FdcStatus2(FdcStatus2::CM | FdcStatus2::DD).has_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(FdcStatus1(0x80 | 0x04).to_string(), "EN|ND");
        assert_eq!(FdcStatus1(0).to_string(), "OK");
        assert_eq!(FdcStatus2(0x40 | 0x02).to_string(), "CM|BC");
        assert_eq!(FdcStatus2(0).to_string(), "OK");
    }
}
