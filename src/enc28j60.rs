use core::ops::BitOr;

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use heapless::Vec;

use crate::{
    bank::Registers,
    buffer::Layout,
    config::Config,
    phy::{self, PhyRegister},
    register::{
        econ1, econ2, eie, erxfcon, estat, macon1, macon3, macon4, phcon1, phcon2, ECON1, ECON2,
        EIE, EIR, EPKTCNT, EPMCSL, EPMM0, EREVID, ERXFCON, ERXNDL, ERXRDPTL, ERXSTL, ESTAT,
        ETXNDL, ETXSTL, MABBIPG, MACON1, MACON3, MACON4, MAC_ADDRESS, MAIPGL, MAMXFLL,
    },
    rx::{free_pointer, PacketDescriptor, Receiver},
    transport::Transport,
    tx::Transmitter,
    Error, MAC_ADDRESS_LENGTH,
};

// Broadcast frames are only let through the pattern match filter if they are ARP: the mask
// selects the destination address and the EtherType (ff ff ff ff ff ff .. 08 06), and the
// checksum is the IP checksum of those bytes.
const ARP_PATTERN_MASK: u16 = 0x303F;
const ARP_PATTERN_CHECKSUM: u16 = 0xF7F9;

// LEDA shows link status and receive activity, LEDB transmit activity, stretched pulses.
const LED_CONFIG: u16 = 0x0476;

const POWER_UP_POLLS: u32 = 500;

/// Interrupt sources of the `EIE` register.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InterruptSource(u8);

impl InterruptSource {
    /// Global interrupt enable. No source raises the interrupt pin without it.
    pub const GLOBAL: Self = Self(eie::INTIE);
    pub const RX_PENDING: Self = Self(eie::PKTIE);
    pub const DMA: Self = Self(eie::DMAIE);
    pub const LINK_STATE: Self = Self(eie::LINKIE);
    pub const TX: Self = Self(eie::TXIE);
    pub const TX_ERROR: Self = Self(eie::TXERIE);
    pub const RX_ERROR: Self = Self(eie::RXERIE);

    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl BitOr for InterruptSource {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A driver for a single ENC28J60 controller.
pub struct Enc28j60<SPI, D> {
    registers: Registers<SPI>,
    delay: D,
    receiver: Receiver,
    transmitter: Transmitter,
    config: Config,
}

impl<SPI, D> Enc28j60<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    /// Construct the driver. The bus is not touched until [Enc28j60::init] is called.
    ///
    /// # Args
    /// * `spi` - The SPI device the controller is attached to, configured for mode 0 and at most
    /// 20 MHz.
    /// * `delay` - A delay provider used for reset waits and PHY polling.
    /// * `config` - The configuration to apply during initialization.
    pub fn new(spi: SPI, delay: D, config: Config) -> Self {
        let layout = config.layout();
        Self {
            registers: Registers::new(Transport::new(spi)),
            delay,
            receiver: Receiver::new(layout.receive),
            transmitter: Transmitter::new(layout.transmit, config.transmit_poll_limit),
            config,
        }
    }

    /// Release the SPI device and the delay provider.
    pub fn release(self) -> (SPI, D) {
        (self.registers.release(), self.delay)
    }

    /// The packet memory partition in use.
    pub fn layout(&self) -> Layout {
        self.config.layout()
    }

    /// Reset the controller and bring it up into a receiving state.
    pub fn init(&mut self) -> Result<(), Error<SPI::Error>> {
        info!("Resetting controller");
        self.delay.delay_ms(self.config.reset_delay.0);
        self.registers.soft_reset().map_err(Error::Bus)?;

        // The clock-ready status bit does not reliably report the end of the reset, so wait for
        // a fixed time instead of polling it.
        self.delay.delay_ms(self.config.reset_delay.0);

        self.receiver.reset();
        self.configure_buffers().map_err(Error::Bus)?;
        self.configure_filters().map_err(Error::Bus)?;
        self.configure_mac().map_err(Error::Bus)?;

        self.phy_write(PhyRegister::Phcon2, phcon2::HDLDIS)?;
        if self.config.full_duplex {
            self.phy_write(PhyRegister::Phcon1, phcon1::PDPXMD)?;
        }

        self.registers.select_default_bank().map_err(Error::Bus)?;
        self.enable_interrupts(InterruptSource::GLOBAL | InterruptSource::RX_PENDING)?;
        self.enable_receive()?;

        self.phy_write(PhyRegister::Phlcon, LED_CONFIG)?;

        if let Some(address) = self.config.mac_address {
            self.write_mac_address(&address)?;
        }

        info!("Controller ready, layout {:?}", self.config.layout());
        Ok(())
    }

    fn configure_buffers(&mut self) -> Result<(), SPI::Error> {
        let layout = self.config.layout();

        self.registers.write_pair(ERXSTL, layout.receive.start)?;
        self.registers.write_pair(ERXNDL, layout.receive.end)?;

        // The hardware writes up to, but not including, the read pointer.
        self.registers.write_pair(
            ERXRDPTL,
            free_pointer(layout.receive.start, &layout.receive),
        )?;

        self.registers.write_pair(ETXSTL, layout.transmit.start)?;
        self.registers.write_pair(ETXNDL, layout.transmit.end)
    }

    fn configure_filters(&mut self) -> Result<(), SPI::Error> {
        let mut filter = erxfcon::UCEN | erxfcon::CRCEN | erxfcon::PMEN;
        if self.config.accept_broadcast {
            filter |= erxfcon::BCEN;
        }

        self.registers.write(ERXFCON, filter)?;
        self.registers.write_pair(EPMM0, ARP_PATTERN_MASK)?;
        self.registers.write_pair(EPMCSL, ARP_PATTERN_CHECKSUM)
    }

    fn configure_mac(&mut self) -> Result<(), SPI::Error> {
        // Writing the pair also clears MACON2, which takes the MAC out of reset.
        self.registers.write_pair(
            MACON1,
            (macon1::MARXEN | macon1::TXPAUS | macon1::RXPAUS) as u16,
        )?;

        let mut mac_control = macon3::PADCFG0 | macon3::TXCRCEN | macon3::FRMLNEN;
        if self.config.full_duplex {
            mac_control |= macon3::FULDPX;
        }
        self.registers.set_bits(MACON3, mac_control)?;

        if self.config.full_duplex {
            self.registers.write_pair(MAIPGL, 0x0012)?;
            self.registers.write(MABBIPG, 0x15)?;
        } else {
            self.registers.write(MACON4, macon4::DEFER)?;
            self.registers.write_pair(MAIPGL, 0x0C12)?;
            self.registers.write(MABBIPG, 0x12)?;
        }

        self.registers
            .write_pair(MAMXFLL, self.config.max_frame_length)
    }

    /// Read the silicon revision.
    pub fn revision(&mut self) -> Result<u8, Error<SPI::Error>> {
        self.registers.read(EREVID).map_err(Error::Bus)
    }

    /// The number of received frames waiting in the receive buffer.
    pub fn pending_packets(&mut self) -> Result<u8, Error<SPI::Error>> {
        self.registers.read(EPKTCNT).map_err(Error::Bus)
    }

    /// Open the next pending frame.
    ///
    /// # Returns
    /// [Error::NoPacket] if nothing is pending. [Error::Receive] if the pending frame was
    /// corrupt, in which case it has already been dropped and the fetch may be retried.
    pub fn fetch_descriptor(&mut self) -> Result<PacketDescriptor, Error<SPI::Error>> {
        self.receiver.fetch(&mut self.registers)
    }

    /// Read the payload of the open frame.
    ///
    /// # Returns
    /// The payload length, which is the number of bytes written to the start of `buf`.
    pub fn read_payload(
        &mut self,
        descriptor: &PacketDescriptor,
        buf: &mut [u8],
    ) -> Result<usize, Error<SPI::Error>> {
        self.receiver
            .read_payload(&mut self.registers, descriptor, &mut [buf])
    }

    /// Read the payload of the open frame into a chain of buffers, filled in order.
    pub fn read_payload_chained(
        &mut self,
        descriptor: &PacketDescriptor,
        segments: &mut [&mut [u8]],
    ) -> Result<usize, Error<SPI::Error>> {
        self.receiver
            .read_payload(&mut self.registers, descriptor, segments)
    }

    /// Release the open frame's memory to the controller.
    pub fn free(&mut self) -> Result<(), Error<SPI::Error>> {
        self.receiver.free(&mut self.registers)
    }

    /// Close the open frame without releasing it. The frame stays pending and is delivered again
    /// by the next fetch.
    ///
    /// # Args
    /// * `address` - The address of the frame to deliver next, normally the open descriptor's.
    pub fn abort(&mut self, address: u16) -> Result<(), Error<SPI::Error>> {
        self.receiver.abort(address)
    }

    /// True if no frame is open and a new one may be fetched.
    pub fn is_receive_ready(&self) -> bool {
        self.receiver.is_ready()
    }

    /// The number of free bytes in the receive buffer.
    pub fn free_space(&mut self) -> Result<u32, Error<SPI::Error>> {
        self.receiver
            .free_space(&mut self.registers)
            .map_err(Error::Bus)
    }

    /// Receive a complete frame into owned storage.
    ///
    /// # Note
    /// If the frame does not fit into `N` bytes, it is left pending and [Error::NoBuffer] is
    /// returned.
    pub fn receive_into<const N: usize>(&mut self) -> Result<Vec<u8, N>, Error<SPI::Error>> {
        let descriptor = self.fetch_descriptor()?;

        let mut frame: Vec<u8, N> = Vec::new();
        if frame
            .resize_default(descriptor.payload_length as usize)
            .is_err()
        {
            debug!(
                "No room for {} byte frame, leaving it pending",
                descriptor.payload_length
            );
            self.abort(descriptor.address)?;
            return Err(Error::NoBuffer);
        }

        // The caller never sees the descriptor, so the frame is closed here on failure.
        if let Err(err) = self
            .read_payload(&descriptor, &mut frame)
            .and_then(|_| self.free())
        {
            self.abort(descriptor.address).ok();
            return Err(err);
        }

        Ok(frame)
    }

    /// Begin staging a frame of `payload_length` bytes for transmission.
    pub fn stage(&mut self, payload_length: u16) -> Result<(), Error<SPI::Error>> {
        self.transmitter.stage(&mut self.registers, payload_length)
    }

    /// Append data to the staged frame.
    pub fn append(&mut self, data: &[u8]) -> Result<(), Error<SPI::Error>> {
        self.transmitter.append(&mut self.registers, data)
    }

    /// Transmit the staged frame, blocking until the controller is done with it.
    pub fn transmit(&mut self, payload_length: u16) -> Result<(), Error<SPI::Error>> {
        self.transmitter.transmit(&mut self.registers, payload_length)
    }

    /// Stage, fill and transmit a frame assembled from a chain of segments.
    pub fn send(&mut self, segments: &[&[u8]]) -> Result<(), Error<SPI::Error>> {
        let length: usize = segments.iter().map(|segment| segment.len()).sum();
        let length = u16::try_from(length).map_err(|_| Error::FifoFull)?;

        self.stage(length)?;
        for segment in segments {
            self.append(segment)?;
        }

        self.transmit(length)
    }

    /// Read the station MAC address.
    ///
    /// # Args
    /// * `address` - Storage for the address. Must be exactly six bytes long.
    pub fn read_mac_address(&mut self, address: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        if address.len() != MAC_ADDRESS_LENGTH {
            return Err(Error::InvalidParameter);
        }

        for (byte, register) in address.iter_mut().zip(MAC_ADDRESS.iter()) {
            *byte = self.registers.read(*register).map_err(Error::Bus)?;
        }

        Ok(())
    }

    /// Program the station MAC address used by the unicast filter.
    ///
    /// # Args
    /// * `address` - The address. Must be exactly six bytes long.
    pub fn write_mac_address(&mut self, address: &[u8]) -> Result<(), Error<SPI::Error>> {
        if address.len() != MAC_ADDRESS_LENGTH {
            return Err(Error::InvalidParameter);
        }

        for (byte, register) in address.iter().zip(MAC_ADDRESS.iter()) {
            self.registers
                .write(*register, *byte)
                .map_err(Error::Bus)?;
        }

        Ok(())
    }

    pub fn phy_read(&mut self, register: PhyRegister) -> Result<u16, Error<SPI::Error>> {
        phy::read(&mut self.registers, &mut self.delay, register)
    }

    pub fn phy_write(
        &mut self,
        register: PhyRegister,
        value: u16,
    ) -> Result<(), Error<SPI::Error>> {
        phy::write(&mut self.registers, &mut self.delay, register, value)
    }

    /// Reset the PHY.
    pub fn reset_phy(&mut self) -> Result<(), Error<SPI::Error>> {
        phy::reset(
            &mut self.registers,
            &mut self.delay,
            self.config.phy_reset_delay,
        )
    }

    /// Determine if the link is up. A failed PHY read is reported as link down.
    pub fn link_status(&mut self) -> bool {
        match phy::link_up(&mut self.registers, &mut self.delay) {
            Ok(up) => up,
            Err(_err) => {
                debug!("Link status unavailable: {:?}", _err);
                false
            }
        }
    }

    pub fn enable_receive(&mut self) -> Result<(), Error<SPI::Error>> {
        self.registers
            .set_bits(ECON1, econ1::RXEN)
            .map_err(Error::Bus)
    }

    pub fn disable_receive(&mut self) -> Result<(), Error<SPI::Error>> {
        self.registers
            .clear_bits(ECON1, econ1::RXEN)
            .map_err(Error::Bus)
    }

    pub fn enable_interrupts(&mut self, sources: InterruptSource) -> Result<(), Error<SPI::Error>> {
        self.registers
            .set_bits(EIE, sources.bits())
            .map_err(Error::Bus)
    }

    pub fn disable_interrupts(
        &mut self,
        sources: InterruptSource,
    ) -> Result<(), Error<SPI::Error>> {
        self.registers
            .clear_bits(EIE, sources.bits())
            .map_err(Error::Bus)
    }

    /// Read the raw interrupt flags of the `EIR` register.
    pub fn interrupt_flags(&mut self) -> Result<u8, Error<SPI::Error>> {
        self.registers.read(EIR).map_err(Error::Bus)
    }

    /// Enter power save mode.
    ///
    /// # Note
    /// The controller is left running, with reception re-enabled, if it is busy receiving or
    /// transmitting. [Error::InvalidState] is returned in that case.
    pub fn power_down(&mut self) -> Result<(), Error<SPI::Error>> {
        self.disable_receive()?;

        let receiving = self.registers.read(ESTAT).map_err(Error::Bus)? & estat::RXBUSY != 0;
        let transmitting = self.registers.read(ECON1).map_err(Error::Bus)? & econ1::TXRTS != 0;
        if receiving || transmitting {
            debug!("Controller busy, not powering down");
            self.enable_receive()?;
            return Err(Error::InvalidState);
        }

        self.registers
            .set_bits(ECON2, econ2::VRPS)
            .map_err(Error::Bus)?;
        self.registers
            .set_bits(ECON2, econ2::PWRSV)
            .map_err(Error::Bus)?;

        info!("Entered power save");
        Ok(())
    }

    /// Leave power save mode and resume reception.
    pub fn power_up(&mut self) -> Result<(), Error<SPI::Error>> {
        self.registers
            .clear_bits(ECON2, econ2::PWRSV)
            .map_err(Error::Bus)?;

        let mut polls = 0;
        while self.registers.read(ESTAT).map_err(Error::Bus)? & estat::CLKRDY == 0 {
            polls += 1;
            if polls >= POWER_UP_POLLS {
                return Err(Error::Timeout);
            }
            self.delay.delay_ms(1);
        }

        info!("Left power save");
        self.enable_receive()
    }
}
