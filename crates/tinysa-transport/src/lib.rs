//! Transport implementations for tinysa.
//!
//! This crate provides the serial implementation of the
//! [`Transport`](tinysa_core::Transport) trait from `tinysa-core`, plus USB
//! port discovery:
//!
//! - [`SerialTransport`]: the analyzer's USB CDC console
//! - [`discovery`]: locate attached analyzers by USB VID/PID
//!
//! # Example
//!
//! ```no_run
//! use tinysa_transport::SerialTransport;
//! use tinysa_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> tinysa_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyACM0", 115_200).await?;
//!
//! transport.send(b"info\r\n").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod serial;

pub use discovery::{DiscoveredPort, USB_PID, USB_VID, find_first, find_ports};
pub use serial::{
    DEFAULT_BAUD_RATE, DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits,
};
