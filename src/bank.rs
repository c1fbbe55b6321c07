//! Bank-switched register access
//!
//! # Design
//! The controller exposes 32 register offsets per bank and four banks, selected with the
//! `ECON1.BSEL` bits. The most recently selected bank is cached so that consecutive accesses to
//! the same bank do not pay for the two extra bit-field instructions a bank switch costs.
use embedded_hal::spi::SpiDevice;

use crate::register::{econ1, is_common, is_mac_mii, BANK_MASK, ECON1};
use crate::transport::{Opcode, Transport};

/// Register-level access to the controller.
pub struct Registers<SPI> {
    transport: Transport<SPI>,

    // The bank bits (`address & BANK_MASK`) of the currently selected bank, or `None` while the
    // selection is unknown.
    bank: Option<u8>,
}

impl<SPI: SpiDevice> Registers<SPI> {
    /// Construct register access on top of a transport.
    ///
    /// # Note
    /// The controller selects bank 0 out of reset, which is what the cache assumes.
    pub fn new(transport: Transport<SPI>) -> Self {
        Self {
            transport,
            bank: Some(0),
        }
    }

    pub fn release(self) -> SPI {
        self.transport.release()
    }

    fn switch_bank(&mut self, bank: u8) -> Result<(), SPI::Error> {
        trace!("Selecting bank {}", bank >> 5);

        // The selection is unknown until both writes have gone through.
        self.bank = None;
        self.transport.write_op(
            Opcode::BitFieldClear,
            ECON1,
            econ1::BSEL1 | econ1::BSEL0,
        )?;
        self.transport
            .write_op(Opcode::BitFieldSet, ECON1, bank >> 5)?;
        self.bank.replace(bank);
        Ok(())
    }

    /// Select the bank a register lives in, if it is not already selected.
    pub fn select_bank(&mut self, address: u8) -> Result<(), SPI::Error> {
        if is_common(address) {
            return Ok(());
        }

        let bank = address & BANK_MASK;
        if self.bank != Some(bank) {
            self.switch_bank(bank)?;
        }

        Ok(())
    }

    /// Unconditionally select bank 0.
    pub fn select_default_bank(&mut self) -> Result<(), SPI::Error> {
        self.switch_bank(0)
    }

    pub fn read(&mut self, address: u8) -> Result<u8, SPI::Error> {
        self.select_bank(address)?;
        self.transport
            .read_op(Opcode::ReadControlRegister, address)
    }

    pub fn write(&mut self, address: u8, value: u8) -> Result<(), SPI::Error> {
        self.select_bank(address)?;
        self.transport
            .write_op(Opcode::WriteControlRegister, address, value)
    }

    /// Read a 16-bit register pair, low byte first.
    pub fn read_pair(&mut self, address: u8) -> Result<u16, SPI::Error> {
        let low = self.read(address)?;
        let high = self.read(address + 1)?;
        Ok(u16::from_le_bytes([low, high]))
    }

    /// Write a 16-bit register pair, low byte first.
    ///
    /// # Note
    /// Several pointer registers latch on the write of their high byte, so the order matters.
    pub fn write_pair(&mut self, address: u8, value: u16) -> Result<(), SPI::Error> {
        let [low, high] = value.to_le_bytes();
        self.write(address, low)?;
        self.write(address + 1, high)
    }

    /// Set the bits of `mask` in a register.
    ///
    /// # Note
    /// The bit-field instructions only operate on ETH registers. MAC and MII registers are
    /// updated with a read-modify-write instead.
    pub fn set_bits(&mut self, address: u8, mask: u8) -> Result<(), SPI::Error> {
        self.select_bank(address)?;
        if is_mac_mii(address) {
            let value = self.transport.read_op(Opcode::ReadControlRegister, address)?;
            self.transport
                .write_op(Opcode::WriteControlRegister, address, value | mask)
        } else {
            self.transport.write_op(Opcode::BitFieldSet, address, mask)
        }
    }

    /// Clear the bits of `mask` in a register.
    pub fn clear_bits(&mut self, address: u8, mask: u8) -> Result<(), SPI::Error> {
        self.select_bank(address)?;
        if is_mac_mii(address) {
            let value = self.transport.read_op(Opcode::ReadControlRegister, address)?;
            self.transport
                .write_op(Opcode::WriteControlRegister, address, value & !mask)
        } else {
            self.transport.write_op(Opcode::BitFieldClear, address, mask)
        }
    }

    pub fn read_buffer(&mut self, buf: &mut [u8]) -> Result<(), SPI::Error> {
        self.transport.read_buffer(buf)
    }

    pub fn write_buffer(&mut self, data: &[u8]) -> Result<(), SPI::Error> {
        self.transport.write_buffer(data)
    }

    /// Reset the controller. The controller returns to bank 0.
    pub fn soft_reset(&mut self) -> Result<(), SPI::Error> {
        self.bank = None;
        self.transport.soft_reset()?;
        self.bank.replace(0);
        Ok(())
    }
}
