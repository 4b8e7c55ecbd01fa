//! USB serial port discovery.
//!
//! The analyzer enumerates as an STM32 virtual COM port with VID `0x0483`
//! and PID `0x5740`. Other devices built on the same USB stack (NanoVNA, for
//! one) share that pair, so a match means "probably an analyzer", not a
//! guarantee.
//!
//! # Usage
//!
//! ```no_run
//! use tinysa_transport::discovery;
//!
//! # fn example() -> tinysa_core::Result<()> {
//! for port in discovery::find_ports()? {
//!     println!("{} (serial {:?})", port.port_name, port.serial_number);
//! }
//! # Ok(())
//! # }
//! ```

use tinysa_core::error::{Error, Result};
use tokio_serial::{SerialPortInfo, SerialPortType};

/// USB vendor ID of the analyzer's virtual COM port.
pub const USB_VID: u16 = 0x0483;
/// USB product ID of the analyzer's virtual COM port.
pub const USB_PID: u16 = 0x5740;

/// A serial port that looks like an analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPort {
    /// OS path of the port (e.g. "/dev/ttyACM0", "COM4").
    pub port_name: String,
    pub vid: u16,
    pub pid: u16,
    /// USB serial number string, if the OS reports one.
    pub serial_number: Option<String>,
    pub product: Option<String>,
}

/// List every serial port whose USB VID/PID matches the analyzer.
pub fn find_ports() -> Result<Vec<DiscoveredPort>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| Error::Transport(format!("failed to enumerate serial ports: {}", e)))?;

    tracing::debug!(count = ports.len(), "Enumerated serial ports");

    let found: Vec<DiscoveredPort> = ports.into_iter().filter_map(match_port).collect();

    for port in &found {
        tracing::debug!(port = %port.port_name, "Found candidate analyzer port");
    }

    Ok(found)
}

/// Return the first matching port, or `None` when nothing is plugged in.
pub fn find_first() -> Result<Option<DiscoveredPort>> {
    Ok(find_ports()?.into_iter().next())
}

fn match_port(info: SerialPortInfo) -> Option<DiscoveredPort> {
    match info.port_type {
        SerialPortType::UsbPort(usb) if usb.vid == USB_VID && usb.pid == USB_PID => {
            Some(DiscoveredPort {
                port_name: info.port_name,
                vid: usb.vid,
                pid: usb.pid,
                serial_number: usb.serial_number,
                product: usb.product,
            })
        }
        _ => None,
    }
}
