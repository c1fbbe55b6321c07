//! Transmit buffer management
//!
//! # Design
//! A single frame is staged at the start of the transmit region: one per-packet control byte
//! followed by the frame itself. After transmission the controller appends a 7-byte transmit
//! status vector behind the frame, which must also fit into the region.
use embedded_hal::spi::SpiDevice;

use crate::bank::Registers;
use crate::buffer::BufferRegion;
use crate::register::{econ1, eir, estat, ECON1, EIR, ESTAT, ETXNDL, ETXSTL, EWRPTL};
use crate::Error;

/// Length of the per-packet control byte.
pub const CONTROL_LENGTH: u32 = 1;

/// Length of the transmit status vector written after the frame.
pub const STATUS_VECTOR_LENGTH: u32 = 7;

// Use the MACON3 settings for padding, CRC and huge frames.
const CONTROL_BYTE: u8 = 0x00;

/// Software view of the transmit buffer.
pub struct Transmitter {
    region: BufferRegion,
    poll_limit: u32,
}

impl Transmitter {
    pub fn new(region: BufferRegion, poll_limit: u32) -> Self {
        Self { region, poll_limit }
    }

    /// Determine if a frame of `payload_length` bytes fits in the transmit region.
    pub fn fits(&self, payload_length: u16) -> bool {
        CONTROL_LENGTH + payload_length as u32 + STATUS_VECTOR_LENGTH <= self.region.span() as u32
    }

    /// Point the buffer write pointer `offset` bytes into the transmit region, wrapping inside the
    /// region.
    pub fn set_write_pointer<SPI: SpiDevice>(
        &self,
        registers: &mut Registers<SPI>,
        offset: u16,
    ) -> Result<(), SPI::Error> {
        let mut position = self.region.start as u32 + offset as u32;
        if position > self.region.end as u32 {
            position = self.region.start as u32 + (position - self.region.end as u32 - 1);
        }

        registers.write_pair(EWRPTL, position as u16)
    }

    /// Begin a new frame of `payload_length` bytes.
    pub fn stage<SPI: SpiDevice>(
        &mut self,
        registers: &mut Registers<SPI>,
        payload_length: u16,
    ) -> Result<(), Error<SPI::Error>> {
        if !self.fits(payload_length) {
            return Err(Error::FifoFull);
        }

        self.set_write_pointer(registers, 0).map_err(Error::Bus)?;
        registers.write_buffer(&[CONTROL_BYTE]).map_err(Error::Bus)
    }

    /// Append frame data behind whatever has been staged so far.
    pub fn append<SPI: SpiDevice>(
        &mut self,
        registers: &mut Registers<SPI>,
        data: &[u8],
    ) -> Result<(), Error<SPI::Error>> {
        registers.write_buffer(data).map_err(Error::Bus)
    }

    /// Transmit the staged frame and wait for the controller to finish with it.
    pub fn transmit<SPI: SpiDevice>(
        &mut self,
        registers: &mut Registers<SPI>,
        payload_length: u16,
    ) -> Result<(), Error<SPI::Error>> {
        if !self.fits(payload_length) {
            return Err(Error::FifoFull);
        }

        // The end pointer addresses the last byte of the frame. The control byte sits at the
        // start of the region.
        registers
            .write_pair(ETXSTL, self.region.start)
            .map_err(Error::Bus)?;
        registers
            .write_pair(ETXNDL, self.region.start + payload_length)
            .map_err(Error::Bus)?;

        // The transmit logic can stall after an error, so it is reset before every frame.
        registers
            .set_bits(ECON1, econ1::TXRST)
            .map_err(Error::Bus)?;
        registers
            .clear_bits(ECON1, econ1::TXRST)
            .map_err(Error::Bus)?;
        registers
            .clear_bits(EIR, eir::TXIF | eir::TXERIF)
            .map_err(Error::Bus)?;

        registers
            .set_bits(ECON1, econ1::TXRTS)
            .map_err(Error::Bus)?;

        let mut polls = 0;
        while registers.read(ECON1).map_err(Error::Bus)? & econ1::TXRTS != 0 {
            polls += 1;
            if polls >= self.poll_limit {
                warn!("Transmit request not cleared after {} polls", polls);
                return Err(Error::Timeout);
            }
        }

        if registers.read(ESTAT).map_err(Error::Bus)? & estat::TXABRT != 0 {
            warn!("Transmission of {} bytes aborted", payload_length);
            return Err(Error::TransmitAbort);
        }

        debug!("Transmitted {} bytes", payload_length);
        Ok(())
    }
}
