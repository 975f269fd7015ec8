//! RFID reader abstraction
//!
//! Sector authentication, anticollision and the driver's retry policy stay
//! behind this trait. The control core only ever sees a successfully
//! authenticated 16-byte data block.

/// Size of one MIFARE data block.
pub const BLOCK_LEN: usize = 16;

/// RFID reader interface
pub trait TagReader {
    /// Error type (authentication and I/O failures)
    type Error: core::fmt::Debug;

    /// `true` once per newly presented tag.
    fn is_new_tag_present(&mut self) -> bool;

    /// Authenticate and read the data block of the presented tag.
    fn read_block(&mut self) -> Result<[u8; BLOCK_LEN], Self::Error>;

    /// Authenticate and write the data block of the presented tag.
    fn write_block(&mut self, block: &[u8; BLOCK_LEN]) -> Result<(), Self::Error>;

    /// Halt the tag and end the crypto session.
    fn halt(&mut self);

    /// Antenna off and soft power-down ahead of shutdown.
    fn power_down(&mut self);
}
