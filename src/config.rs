use crate::buffer::Layout;
use crate::MAC_ADDRESS_LENGTH;
use embedded_time::duration::{Extensions, Milliseconds};

/// The smallest supported receive region, in KiB.
pub const RX_BUFFER_KIB_MIN: u8 = 2;

/// The largest supported receive region, in KiB.
pub const RX_BUFFER_KIB_MAX: u8 = 6;

/// The largest frame length the MAC accepts.
pub const MAX_FRAME_LENGTH: u16 = 1518;

/// Errors raised while building a [Config].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ConfigError {
    /// The receive region size is outside of the supported range.
    ReceiveBufferSize(u8),

    /// The maximum frame length is zero or above [MAX_FRAME_LENGTH].
    FrameLength(u16),
}

/// Configuration specifying how the controller is brought up.
#[derive(Debug, Copy, Clone)]
pub struct Config {
    pub(crate) layout: Layout,
    pub(crate) max_frame_length: u16,
    pub(crate) reset_delay: Milliseconds<u32>,
    pub(crate) phy_reset_delay: Milliseconds<u32>,
    pub(crate) transmit_poll_limit: u32,
    pub(crate) mac_address: Option<[u8; MAC_ADDRESS_LENGTH]>,
    pub(crate) full_duplex: bool,
    pub(crate) accept_broadcast: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Construct the default configuration: a 6 KiB receive region, half duplex, and only ARP
    /// broadcast frames accepted.
    ///
    /// # Note
    /// Other broadcast traffic, such as broadcast DHCP offers and acknowledgements, is filtered.
    /// Use [Config::accept_broadcast] if the network stack relies on it.
    pub fn new() -> Self {
        Self {
            layout: Layout::default(),
            max_frame_length: MAX_FRAME_LENGTH,
            reset_delay: 50.milliseconds(),
            phy_reset_delay: 100.milliseconds(),
            transmit_poll_limit: 100_000,
            mac_address: None,
            full_duplex: false,
            accept_broadcast: false,
        }
    }

    /// Specify the size of the receive region. The transmit region receives the remainder of
    /// packet memory.
    ///
    /// # Args
    /// * `kib` - The receive region size in KiB, from 2 to 6.
    pub fn rx_buffer_kib(mut self, kib: u8) -> Result<Self, ConfigError> {
        if !(RX_BUFFER_KIB_MIN..=RX_BUFFER_KIB_MAX).contains(&kib) {
            return Err(ConfigError::ReceiveBufferSize(kib));
        }

        self.layout = Layout::with_receive_kib(kib);
        Ok(self)
    }

    /// Specify the longest frame the MAC will accept or transmit.
    pub fn max_frame_length(mut self, length: u16) -> Result<Self, ConfigError> {
        if length == 0 || length > MAX_FRAME_LENGTH {
            return Err(ConfigError::FrameLength(length));
        }

        self.max_frame_length = length;
        Ok(self)
    }

    /// Configure the fixed wait applied before and after the soft reset.
    ///
    /// # Note
    /// The clock-ready status bit does not reliably report reset completion on current silicon,
    /// so the driver waits for a fixed time instead.
    pub fn reset_delay(mut self, delay: Milliseconds<u32>) -> Self {
        self.reset_delay = delay;
        self
    }

    /// Configure how long the PHY is given to leave reset.
    pub fn phy_reset_delay(mut self, delay: Milliseconds<u32>) -> Self {
        self.phy_reset_delay = delay;
        self
    }

    /// Configure how many times the transmit-request bit is polled before a transmission is
    /// reported as timed out.
    pub fn transmit_poll_limit(mut self, polls: u32) -> Self {
        self.transmit_poll_limit = polls;
        self
    }

    /// Specify a MAC address to program during initialization.
    pub fn mac_address(mut self, address: [u8; MAC_ADDRESS_LENGTH]) -> Self {
        self.mac_address.replace(address);
        self
    }

    /// Operate the MAC and PHY in full duplex.
    pub fn full_duplex(mut self) -> Self {
        self.full_duplex = true;
        self
    }

    /// Accept every broadcast frame. By default only broadcast frames carrying ARP pass the
    /// receive filter.
    pub fn accept_broadcast(mut self) -> Self {
        self.accept_broadcast = true;
        self
    }

    /// The packet memory partition this configuration produces.
    pub fn layout(&self) -> Layout {
        self.layout
    }
}
