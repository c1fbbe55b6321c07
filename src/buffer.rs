//! # Packet memory layout
//! The controller's 8 KiB of packet memory is split into a circular receive region at the bottom
//! and a transmit region occupying the rest. The split is chosen once, when the driver is
//! configured, and never changes afterwards.

/// The last address of packet memory.
pub const MEMORY_END: u16 = 0x1FFF;

/// A contiguous, inclusive range of packet memory.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BufferRegion {
    pub start: u16,
    pub end: u16,
}

impl BufferRegion {
    /// The distance between the first and the last address of the region.
    pub const fn span(&self) -> u16 {
        self.end - self.start
    }

    /// The number of bytes in the region.
    pub const fn len(&self) -> u16 {
        self.span() + 1
    }

    pub const fn contains(&self, address: u16) -> bool {
        address >= self.start && address <= self.end
    }
}

/// The partition of packet memory into receive and transmit regions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Layout {
    pub receive: BufferRegion,
    pub transmit: BufferRegion,
}

impl Layout {
    /// Partition packet memory with a receive region of `kib` KiB.
    ///
    /// # Note
    /// The receive region must start at address 0, and its end is always odd.
    pub const fn with_receive_kib(kib: u8) -> Self {
        let receive_end = kib as u16 * 1024 - 1;
        Self {
            receive: BufferRegion {
                start: 0,
                end: receive_end,
            },
            transmit: BufferRegion {
                start: receive_end + 1,
                end: MEMORY_END,
            },
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::with_receive_kib(6)
    }
}
