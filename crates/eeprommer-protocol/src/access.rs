//! Access-mode bitfield carried by FILECONF.
//!
//! The programmer uses the SD library's open flags, so the bit layout below
//! is the device's, not the host's. [`AccessMode`] keeps unknown bits intact.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// How the storage handle for a session is opened.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessMode: u8 {
        /// Open for reading.
        const READ = 0x01;
        /// Open for writing.
        const WRITE = 0x02;
        /// Every write goes to the end of the file.
        const APPEND = 0x04;
        /// Make each write durable before acknowledging the next command.
        const SYNC = 0x08;
        /// Truncate an existing file to zero length.
        const TRUNC = 0x10;
        /// Place the cursor at the end of the file after opening.
        const AT_END = 0x20;
        /// Create the file if it does not exist.
        const CREAT = 0x40;
        /// With `CREAT`, fail if the file already exists.
        const EXCL = 0x80;

        /// Open for reading and writing.
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl AccessMode {
    /// Decode the FILECONF argument byte.
    pub fn from_byte(byte: u8) -> Self {
        AccessMode::from_bits_retain(byte)
    }

    /// Encode as the FILECONF argument byte.
    pub fn to_byte(self) -> u8 {
        self.bits()
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0x00 (none)");
        }
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        write!(f, "0x{:02x} ({})", self.bits(), names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_flag_values() {
        // Values the programmer passes for "store" and "load" dialogs.
        let store = AccessMode::WRITE | AccessMode::CREAT | AccessMode::TRUNC;
        assert_eq!(store.to_byte(), 0x52);
        assert_eq!(AccessMode::from_byte(0x01), AccessMode::READ);
        assert_eq!(AccessMode::from_byte(0x03), AccessMode::READ_WRITE);
    }

    #[test]
    fn test_display() {
        assert_eq!(AccessMode::from_byte(0x02).to_string(), "0x02 (WRITE)");
        assert_eq!(AccessMode::empty().to_string(), "0x00 (none)");
        assert_eq!(
            (AccessMode::READ | AccessMode::CREAT).to_string(),
            "0x41 (READ|CREAT)"
        );
    }
}
