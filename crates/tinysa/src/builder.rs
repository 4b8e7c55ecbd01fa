//! TinySaBuilder -- fluent builder for constructing [`CommandGateway`]
//! instances.
//!
//! Separates configuration from construction so that callers can set up
//! serial parameters, timeouts, and gateway switches before the port is
//! opened.
//!
//! # Example
//!
//! ```no_run
//! use tinysa::builder::TinySaBuilder;
//! use tinysa::models::ultra_zs405;
//! use std::time::Duration;
//!
//! # async fn example() -> tinysa_core::Result<()> {
//! let gateway = TinySaBuilder::new(ultra_zs405())
//!     .serial_port("/dev/ttyACM0")
//!     .response_timeout(Some(Duration::from_secs(30)))
//!     .build()
//!     .await?;
//! let version = gateway.command("version").await.into_result()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use tinysa_console::{Framer, FramerConfig};
use tinysa_core::error::{Error, Result};
use tinysa_core::transport::Transport;
use tinysa_core::DeviceProfile;
use tinysa_transport::{SerialConfig, SerialTransport};

use crate::constraints::ConstraintTable;
use crate::gateway::{CommandGateway, GatewayConfig};

/// Fluent builder for [`CommandGateway`].
///
/// Everything except the device profile has a default, so the simplest
/// usage is:
///
/// ```ignore
/// let gateway = TinySaBuilder::new(basic())
///     .serial_port("/dev/ttyACM0")
///     .build()
///     .await?;
/// ```
pub struct TinySaBuilder {
    profile: DeviceProfile,
    serial_port: Option<String>,
    serial: SerialConfig,
    table: Option<Arc<ConstraintTable>>,
    framer: FramerConfig,
    gateway: GatewayConfig,
}

impl TinySaBuilder {
    /// Create a new builder for the given device profile.
    pub fn new(profile: DeviceProfile) -> Self {
        TinySaBuilder {
            profile,
            serial_port: None,
            serial: SerialConfig::default(),
            table: None,
            framer: FramerConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyACM0` or `COM4`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate (default 115200; USB CDC ignores it).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.serial.baud_rate = baud;
        self
    }

    /// Replace the full serial line configuration.
    pub fn serial_config(mut self, config: SerialConfig) -> Self {
        self.serial = config;
        self
    }

    /// Use a custom constraint table instead of the standard catalogue.
    pub fn constraint_table(mut self, table: Arc<ConstraintTable>) -> Self {
        self.table = Some(table);
        self
    }

    /// Timeout for a single transport read (default: 1s).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.framer.read_timeout = timeout;
        self
    }

    /// Bound on a whole exchange (default: 10s). `None` waits forever.
    pub fn response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.framer.response_timeout = timeout;
        self
    }

    /// Largest accepted response frame (default: 4 MiB).
    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.framer.max_frame_len = len;
        self
    }

    pub fn verbose(mut self, on: bool) -> Self {
        self.gateway.verbose = on;
        self
    }

    /// Return [`ERROR_MARKER`](crate::gateway::ERROR_MARKER) instead of empty
    /// bytes for failures in the byte-oriented API.
    pub fn error_byte_return(mut self, on: bool) -> Self {
        self.gateway.error_byte_return = on;
        self
    }

    /// How long to wait for a last prompt after `reset` and friends
    /// (default: 500ms).
    pub fn disconnect_grace(mut self, grace: Duration) -> Self {
        self.gateway.disconnect_grace = grace;
        self
    }

    /// Build a [`CommandGateway`] with a caller-provided transport.
    ///
    /// This is the entry point for testing (pass a `MockTransport` from
    /// `tinysa-test-harness`) and for callers that manage the transport
    /// themselves.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<CommandGateway> {
        if self.framer.read_timeout.is_zero() {
            return Err(Error::InvalidParameter("read_timeout must be non-zero".into()));
        }
        if self.framer.response_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidParameter(
                "response_timeout must be non-zero".into(),
            ));
        }
        if self.framer.max_frame_len == 0 {
            return Err(Error::InvalidParameter("max_frame_len must be non-zero".into()));
        }

        let table = self
            .table
            .unwrap_or_else(|| Arc::new(ConstraintTable::standard()));
        let framer = Framer::new(transport, self.framer);
        Ok(CommandGateway::new(framer, table, self.profile, self.gateway))
    }

    /// Build a [`CommandGateway`] over a serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<CommandGateway> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;

        let transport = SerialTransport::open_with_config(port, self.serial.clone()).await?;
        self.build_with_transport(Box::new(transport)).await
    }

    /// Open the first USB port that looks like a tinySA.
    ///
    /// An explicitly set [`serial_port`](Self::serial_port) is ignored.
    pub async fn autoconnect(mut self) -> Result<CommandGateway> {
        let found = tinysa_transport::find_first()?
            .ok_or_else(|| Error::Transport("no tinySA found on any USB serial port".into()))?;
        info!(port = %found.port_name, "found tinySA");
        self.serial_port = Some(found.port_name);
        self.build().await
    }
}
