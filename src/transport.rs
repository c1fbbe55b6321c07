//! SPI command framing
//!
//! # Design
//! Every chip transaction is a single `SpiDevice` transaction: one command byte followed by the
//! data phase. The `SpiDevice` asserts chip-select for exactly the duration of the transaction and
//! holds the bus exclusively while doing so, which keeps a command and its data from interleaving
//! with any other bus traffic.
use bit_field::BitField;
use embedded_hal::spi::{Operation, SpiDevice};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::register::{is_mac_mii, ADDR_MASK};

/// The SPI instruction set of the controller.
#[derive(Copy, Clone, Debug, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    ReadControlRegister = 0x00,
    ReadBufferMemory = 0x3A,
    WriteControlRegister = 0x40,
    WriteBufferMemory = 0x7A,
    BitFieldSet = 0x80,
    BitFieldClear = 0xA0,
    SystemReset = 0xFF,
}

impl Opcode {
    /// Construct the command byte addressing the provided register.
    ///
    /// # Note
    /// Buffer memory accesses and the system reset carry a fixed argument, so the address is
    /// ignored for them.
    pub fn command(self, address: u8) -> u8 {
        match self {
            Opcode::ReadBufferMemory | Opcode::WriteBufferMemory | Opcode::SystemReset => {
                self.into()
            }
            _ => *u8::from(self).set_bits(0..=4, address & ADDR_MASK),
        }
    }
}

/// The data phase of a transaction.
pub enum Transfer<'a> {
    /// Clock dummy bytes out and store the bytes the chip returns.
    Read(&'a mut [u8]),

    /// Clock the bytes out and discard whatever the chip returns.
    Write(&'a [u8]),
}

/// Frames opcodes onto the SPI bus.
pub struct Transport<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> Transport<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Release the underlying SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }

    /// Issue a single framed transaction.
    ///
    /// # Args
    /// * `opcode` - The instruction to execute.
    /// * `address` - The register address the instruction operates on, if any.
    /// * `transfer` - The data phase following the command byte.
    pub fn transact(
        &mut self,
        opcode: Opcode,
        address: u8,
        transfer: Transfer<'_>,
    ) -> Result<(), SPI::Error> {
        let command = [opcode.command(address)];
        trace!("{:?} {:#04x}", opcode, command[0]);

        match transfer {
            Transfer::Read(buf) => self
                .spi
                .transaction(&mut [Operation::Write(&command), Operation::Read(buf)]),
            Transfer::Write(data) => self
                .spi
                .transaction(&mut [Operation::Write(&command), Operation::Write(data)]),
        }
    }

    /// Read a single control register byte.
    ///
    /// # Note
    /// MAC and MII registers shift out a dummy byte before their contents, so two bytes are
    /// clocked in and the first is dropped.
    pub fn read_op(&mut self, opcode: Opcode, address: u8) -> Result<u8, SPI::Error> {
        if is_mac_mii(address) {
            let mut data = [0u8; 2];
            self.transact(opcode, address, Transfer::Read(&mut data))?;
            Ok(data[1])
        } else {
            let mut data = [0u8; 1];
            self.transact(opcode, address, Transfer::Read(&mut data))?;
            Ok(data[0])
        }
    }

    /// Issue a single-byte write style instruction.
    pub fn write_op(&mut self, opcode: Opcode, address: u8, data: u8) -> Result<(), SPI::Error> {
        self.transact(opcode, address, Transfer::Write(&[data]))
    }

    /// Stream bytes out of buffer memory at the current read pointer.
    pub fn read_buffer(&mut self, buf: &mut [u8]) -> Result<(), SPI::Error> {
        self.transact(Opcode::ReadBufferMemory, 0, Transfer::Read(buf))
    }

    /// Stream bytes into buffer memory at the current write pointer.
    pub fn write_buffer(&mut self, data: &[u8]) -> Result<(), SPI::Error> {
        self.transact(Opcode::WriteBufferMemory, 0, Transfer::Write(data))
    }

    /// Issue the system reset instruction.
    pub fn soft_reset(&mut self) -> Result<(), SPI::Error> {
        self.transact(Opcode::SystemReset, 0, Transfer::Write(&[]))
    }
}
