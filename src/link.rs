use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;

use crate::Enc28j60;

/// Tracks the PHY link state across polls and reports transitions.
#[derive(Debug, Default)]
pub struct LinkMonitor {
    up: bool,
}

impl LinkMonitor {
    /// Construct a monitor that assumes the link is down.
    pub const fn new() -> Self {
        Self { up: false }
    }

    /// The link state observed by the last poll.
    pub fn is_up(&self) -> bool {
        self.up
    }

    /// Sample the link state.
    ///
    /// # Returns
    /// The new link state if it changed since the last poll, `None` otherwise.
    pub fn poll<SPI: SpiDevice, D: DelayNs>(
        &mut self,
        driver: &mut Enc28j60<SPI, D>,
    ) -> Option<bool> {
        let up = driver.link_status();
        if up == self.up {
            return None;
        }

        self.up = up;
        info!("Link {}", if up { "up" } else { "down" });
        Some(up)
    }
}
