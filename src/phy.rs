//! Indirect PHY register access
//!
//! # Design
//! The PHY registers are reached through the MII management registers: the PHY register address
//! is written to `MIREGADR`, a read is started with `MICMD.MIIRD` (or a write by loading
//! `MIWRL`/`MIWRH`), and `MISTAT.BUSY` is polled until the management interface is idle. The
//! controller raises no interrupt for this path, so the poll is bounded.
use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use embedded_time::duration::{Microseconds, Milliseconds};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::bank::Registers;
use crate::register::{
    micmd, mistat, phcon1, phstat2, MICMD, MIRDL, MIREGADR, MISTAT, MIWRL,
};
use crate::Error;

/// The number of times `MISTAT.BUSY` is polled before giving up.
pub const POLL_ATTEMPTS: u32 = 10;

/// The wait preceding each poll of `MISTAT.BUSY`.
pub const POLL_INTERVAL: Microseconds<u32> = Microseconds(15);

/// Registers of the integrated PHY.
#[derive(Copy, Clone, Debug, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PhyRegister {
    Phcon1 = 0x00,
    Phstat1 = 0x01,
    Phid1 = 0x02,
    Phid2 = 0x03,
    Phcon2 = 0x10,
    Phstat2 = 0x11,
    Phie = 0x12,
    Phir = 0x13,
    Phlcon = 0x14,
}

fn wait_idle<SPI: SpiDevice, D: DelayNs>(
    registers: &mut Registers<SPI>,
    delay: &mut D,
) -> Result<(), Error<SPI::Error>> {
    for _ in 0..POLL_ATTEMPTS {
        delay.delay_us(POLL_INTERVAL.0);
        if registers.read(MISTAT).map_err(Error::Bus)? & mistat::BUSY == 0 {
            return Ok(());
        }
    }

    error!("MII management interface busy after {} polls", POLL_ATTEMPTS);
    Err(Error::Timeout)
}

/// Read a PHY register.
pub fn read<SPI: SpiDevice, D: DelayNs>(
    registers: &mut Registers<SPI>,
    delay: &mut D,
    register: PhyRegister,
) -> Result<u16, Error<SPI::Error>> {
    registers
        .write(MIREGADR, register.into())
        .map_err(Error::Bus)?;
    registers
        .write(MICMD, micmd::MIIRD)
        .map_err(Error::Bus)?;

    wait_idle(registers, delay)?;

    registers.write(MICMD, 0).map_err(Error::Bus)?;
    registers.read_pair(MIRDL).map_err(Error::Bus)
}

/// Write a PHY register. Loading the high data byte starts the write.
pub fn write<SPI: SpiDevice, D: DelayNs>(
    registers: &mut Registers<SPI>,
    delay: &mut D,
    register: PhyRegister,
    value: u16,
) -> Result<(), Error<SPI::Error>> {
    registers
        .write(MIREGADR, register.into())
        .map_err(Error::Bus)?;
    registers.write_pair(MIWRL, value).map_err(Error::Bus)?;

    wait_idle(registers, delay)
}

/// Reset the PHY and verify that it left reset within `settle`.
pub fn reset<SPI: SpiDevice, D: DelayNs>(
    registers: &mut Registers<SPI>,
    delay: &mut D,
    settle: Milliseconds<u32>,
) -> Result<(), Error<SPI::Error>> {
    let control = read(registers, delay, PhyRegister::Phcon1)?;
    write(registers, delay, PhyRegister::Phcon1, control | phcon1::PRST)?;

    delay.delay_ms(settle.0);

    if read(registers, delay, PhyRegister::Phcon1)? & phcon1::PRST != 0 {
        error!("PHY did not leave reset");
        return Err(Error::Timeout);
    }

    Ok(())
}

/// Read the current link state.
pub fn link_up<SPI: SpiDevice, D: DelayNs>(
    registers: &mut Registers<SPI>,
    delay: &mut D,
) -> Result<bool, Error<SPI::Error>> {
    Ok(read(registers, delay, PhyRegister::Phstat2)? & phstat2::LSTAT != 0)
}
