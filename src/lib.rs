#![no_std]
//! # ENC28J60
//!
//! A driver for the Microchip ENC28J60, a 10BASE-T Ethernet controller that exposes its control
//! registers, its 8 KiB packet memory and its PHY over a single SPI bus.
//!
//! The driver is a passive state machine: it owns the bus handle and is driven by an external
//! poller. Reception follows a strict `fetch_descriptor` -> `read_payload` (or `abort`) -> `free`
//! cycle with exactly one packet open at a time, and transmission stages a single frame at a time.
//!
//! # Example
//! ```ignore
//! let mut eth = Enc28j60::new(spi, delay, Config::new());
//! eth.init()?;
//!
//! loop {
//!     match eth.receive_into::<1518>() {
//!         Ok(frame) => handle(&frame),
//!         Err(Error::NoPacket) => {}
//!         Err(other) => log::warn!("receive failed: {}", other),
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
#[macro_use]
extern crate log;

// Without the `logging` feature the log macros still type-check their arguments, but emit nothing.
#[cfg(not(feature = "logging"))]
macro_rules! trace {
    ($($arg:tt)+) => {{
        let _ = format_args!($($arg)+);
    }};
}

#[cfg(not(feature = "logging"))]
macro_rules! debug {
    ($($arg:tt)+) => {{
        let _ = format_args!($($arg)+);
    }};
}

#[cfg(not(feature = "logging"))]
macro_rules! info {
    ($($arg:tt)+) => {{
        let _ = format_args!($($arg)+);
    }};
}

#[cfg(not(feature = "logging"))]
macro_rules! warn {
    ($($arg:tt)+) => {{
        let _ = format_args!($($arg)+);
    }};
}

#[cfg(not(feature = "logging"))]
macro_rules! error {
    ($($arg:tt)+) => {{
        let _ = format_args!($($arg)+);
    }};
}

pub mod bank;
pub mod buffer;
mod config;
mod enc28j60;
mod link;
pub mod phy;
pub mod register;
pub mod rx;
pub mod transport;
pub mod tx;

pub use crate::enc28j60::{Enc28j60, InterruptSource};
pub use buffer::{BufferRegion, Layout};
pub use config::{Config, ConfigError};
pub use link::LinkMonitor;
pub use phy::PhyRegister;
pub use rx::PacketDescriptor;

/// Size of a MAC address in bytes.
pub const MAC_ADDRESS_LENGTH: usize = 6;

/// Possible errors encountered while driving the controller.
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// The SPI bus reported an error.
    Bus(E),

    /// No received packet is pending.
    NoPacket,

    /// The pending packet failed its CRC or had a symbol error. It has been dropped and its
    /// buffer space reclaimed.
    Receive,

    /// The frame does not fit into the transmit buffer.
    FifoFull,

    /// The controller aborted the transmission.
    TransmitAbort,

    /// The PHY or the controller did not complete an operation in time.
    Timeout,

    /// An argument was malformed.
    InvalidParameter,

    /// The operation is not valid in the current state, such as freeing a packet that was never
    /// fetched.
    InvalidState,

    /// The provided storage cannot hold the pending packet. The packet remains pending.
    NoBuffer,
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Bus(err) => write!(f, "SPI bus error: {:?}", err),
            Error::NoPacket => write!(f, "no packet pending"),
            Error::Receive => write!(f, "received packet had a CRC or symbol error"),
            Error::FifoFull => write!(f, "frame exceeds the transmit buffer"),
            Error::TransmitAbort => write!(f, "transmission aborted"),
            Error::Timeout => write!(f, "operation timed out"),
            Error::InvalidParameter => write!(f, "invalid parameter"),
            Error::InvalidState => write!(f, "operation invalid in the current state"),
            Error::NoBuffer => write!(f, "buffer too small for pending packet"),
        }
    }
}
