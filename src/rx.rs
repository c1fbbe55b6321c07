//! Receive buffer management
//!
//! # Design
//! The receive region is a circular buffer written by the controller. Every received frame is
//! prefixed by a 2-byte pointer to the next frame and a 4-byte receive status vector. The driver
//! keeps a cursor to the next unread frame and only ever has a single frame open: a frame is
//! opened by fetching its descriptor and closed by freeing it (or aborting the read, which leaves
//! the frame pending in hardware).
use bit_field::BitField;
use embedded_hal::spi::SpiDevice;

use crate::bank::Registers;
use crate::buffer::BufferRegion;
use crate::register::{econ2, ECON2, EPKTCNT, ERDPTL, ERXRDPTL, ERXWRPTL};
use crate::Error;

/// Length of the next packet pointer preceding each frame.
pub const NEXT_POINTER_LENGTH: usize = 2;

/// Length of the receive status vector.
pub const STATUS_VECTOR_LENGTH: usize = 4;

/// Length of the frame check sequence terminating each frame.
pub const FCS_LENGTH: u16 = 4;

const HEADER_LENGTH: usize = NEXT_POINTER_LENGTH + STATUS_VECTOR_LENGTH;

mod sm {
    use smlang::statemachine;

    statemachine! {
        transitions: {
            *Idle + Fetch = PacketOpen,
            PacketOpen + Free = Idle,
            PacketOpen + Abort = Idle,
            Idle + Abort = Idle,
        }
    }

    pub struct Context;

    impl StateMachineContext for Context {}
}

use sm::{Context, Events, StateMachine, States};

/// The receive status vector the controller prefixes to each frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StatusVector([u8; STATUS_VECTOR_LENGTH]);

impl StatusVector {
    /// The length of the received frame, including the frame check sequence.
    pub fn byte_count(&self) -> u16 {
        u16::from_le_bytes([self.0[0], self.0[1]])
    }

    /// True if the frame had a valid CRC and no symbol errors.
    pub fn received_ok(&self) -> bool {
        self.0[2].get_bit(7)
    }

    pub fn crc_error(&self) -> bool {
        self.0[2].get_bit(4)
    }
}

/// Describes the frame currently open in the receive buffer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PacketDescriptor {
    /// Where the frame's next packet pointer begins in the receive region.
    pub address: u16,

    /// The length of the frame without its frame check sequence.
    pub payload_length: u16,
}

/// Compute the value programmed into the receive read pointer when freeing everything up to
/// `next`.
///
/// # Note
/// The receive hardware may corrupt the circular buffer when an even address is programmed into
/// the read pointer, so an even or out-of-range candidate is replaced by the region end, which is
/// always odd.
pub fn free_pointer(next: u16, region: &BufferRegion) -> u16 {
    let candidate = next.wrapping_sub(1);
    if !region.contains(candidate) || candidate % 2 == 0 {
        region.end
    } else {
        candidate
    }
}

/// Compute the free space of the receive region from the hardware read and write pointers.
pub fn free_space(read: u16, write: u16, region: &BufferRegion) -> u32 {
    let span = region.span() as u32;
    let (read, write) = (read as u32, write as u32);

    if write > read {
        span - (write - read)
    } else if write == read {
        span
    } else {
        read - write - 1
    }
}

/// Software state of the receive buffer.
pub struct Receiver {
    region: BufferRegion,

    // Where the next frame to fetch begins.
    next: u16,
    state: StateMachine<Context>,
}

impl Receiver {
    pub fn new(region: BufferRegion) -> Self {
        Self {
            region,
            next: region.start,
            state: StateMachine::new(Context),
        }
    }

    /// Reset the cursor to the start of the region and close any open frame.
    pub fn reset(&mut self) {
        self.next = self.region.start;
        self.state = StateMachine::new(Context);
    }

    /// The address the next fetch will read from.
    pub fn cursor(&self) -> u16 {
        self.next
    }

    /// True if no frame is open and a new one may be fetched.
    pub fn is_ready(&self) -> bool {
        self.state.state() == &States::Idle
    }

    /// Open the next pending frame.
    ///
    /// # Returns
    /// The descriptor of the frame. If the frame failed its CRC check, it is freed immediately
    /// and [Error::Receive] is returned instead.
    pub fn fetch<SPI: SpiDevice>(
        &mut self,
        registers: &mut Registers<SPI>,
    ) -> Result<PacketDescriptor, Error<SPI::Error>> {
        if !self.is_ready() {
            return Err(Error::InvalidState);
        }

        // The packet pending interrupt flag does not reliably report pending frames, so the
        // packet counter is checked instead.
        if registers.read(EPKTCNT).map_err(Error::Bus)? == 0 {
            return Err(Error::NoPacket);
        }

        self.state
            .process_event(Events::Fetch)
            .map_err(|_| Error::InvalidState)?;

        let address = self.next;
        let mut header = [0u8; HEADER_LENGTH];
        let result = registers
            .write_pair(ERDPTL, address)
            .and_then(|_| registers.read_buffer(&mut header));

        if let Err(err) = result {
            self.state.process_event(Events::Abort).ok();
            return Err(Error::Bus(err));
        }

        self.next = u16::from_le_bytes([header[0], header[1]]);

        let mut status = [0u8; STATUS_VECTOR_LENGTH];
        status.copy_from_slice(&header[NEXT_POINTER_LENGTH..]);
        let status = StatusVector(status);

        let descriptor = PacketDescriptor {
            address,
            payload_length: status.byte_count().saturating_sub(FCS_LENGTH),
        };

        trace!(
            "Fetched {:?}, next frame at {:#06x}: {:?}",
            descriptor,
            self.next,
            status
        );

        if !status.received_ok() {
            warn!(
                "Dropping faulty frame at {:#06x} (CRC error: {})",
                address,
                status.crc_error()
            );

            // If the frame cannot be released, it stays pending and is fetched again.
            if let Err(err) = self.free(registers) {
                self.next = address;
                self.state.process_event(Events::Abort).ok();
                return Err(err);
            }

            return Err(Error::Receive);
        }

        Ok(descriptor)
    }

    /// Read the payload of the open frame into a chain of destination buffers.
    ///
    /// # Args
    /// * `descriptor` - The descriptor returned when the frame was fetched.
    /// * `segments` - Destination buffers, filled in order.
    ///
    /// # Returns
    /// The number of bytes read, which is always the payload length.
    pub fn read_payload<SPI: SpiDevice>(
        &mut self,
        registers: &mut Registers<SPI>,
        descriptor: &PacketDescriptor,
        segments: &mut [&mut [u8]],
    ) -> Result<usize, Error<SPI::Error>> {
        if self.is_ready() {
            return Err(Error::InvalidState);
        }

        let length = descriptor.payload_length as usize;
        let capacity: usize = segments.iter().map(|segment| segment.len()).sum();
        if capacity < length {
            return Err(Error::NoBuffer);
        }

        // The hardware read pointer advances, and wraps inside the receive region, with every
        // byte read. Reading the header again is cheaper than computing the payload address.
        registers
            .write_pair(ERDPTL, descriptor.address)
            .map_err(Error::Bus)?;
        let mut header = [0u8; HEADER_LENGTH];
        registers.read_buffer(&mut header).map_err(Error::Bus)?;

        let mut remaining = length;
        for segment in segments.iter_mut() {
            if remaining == 0 {
                break;
            }

            let chunk = remaining.min(segment.len());
            registers
                .read_buffer(&mut segment[..chunk])
                .map_err(Error::Bus)?;
            remaining -= chunk;
        }

        Ok(length)
    }

    /// Release the open frame's memory to the controller.
    pub fn free<SPI: SpiDevice>(
        &mut self,
        registers: &mut Registers<SPI>,
    ) -> Result<(), Error<SPI::Error>> {
        if self.is_ready() {
            return Err(Error::InvalidState);
        }

        let pointer = free_pointer(self.next, &self.region);
        registers
            .write_pair(ERXRDPTL, pointer)
            .map_err(Error::Bus)?;
        registers
            .set_bits(ECON2, econ2::PKTDEC)
            .map_err(Error::Bus)?;

        debug!("Freed receive buffer up to {:#06x}", pointer);
        self.state
            .process_event(Events::Free)
            .map_err(|_| Error::InvalidState)?;
        Ok(())
    }

    /// Abandon the open frame without releasing it. The frame at `address` is delivered again by
    /// the next fetch.
    pub fn abort<E>(&mut self, address: u16) -> Result<(), Error<E>> {
        if !self.region.contains(address) {
            return Err(Error::InvalidParameter);
        }

        self.next = address;
        self.state
            .process_event(Events::Abort)
            .map_err(|_| Error::InvalidState)?;
        Ok(())
    }

    /// Read the hardware write pointer.
    ///
    /// # Note
    /// The controller updates the write pointer and the packet counter while they are being read.
    /// The pointer is only trusted once the counter is unchanged across the read.
    pub fn write_pointer<SPI: SpiDevice>(
        &self,
        registers: &mut Registers<SPI>,
    ) -> Result<u16, SPI::Error> {
        let mut count = registers.read(EPKTCNT)?;
        loop {
            let pointer = registers.read_pair(ERXWRPTL)?;
            let settled = registers.read(EPKTCNT)?;
            if settled == count {
                return Ok(pointer);
            }

            count = settled;
        }
    }

    /// Compute the number of free bytes in the receive region.
    pub fn free_space<SPI: SpiDevice>(
        &self,
        registers: &mut Registers<SPI>,
    ) -> Result<u32, SPI::Error> {
        let read = registers.read_pair(ERXRDPTL)?;
        let write = self.write_pointer(registers)?;
        Ok(free_space(read, write, &self.region))
    }
}
