//! tinysa: validated command access to tinySA spectrum analyzers.
//!
//! The instrument exposes a line-oriented text shell over USB serial. This
//! crate puts a checked front end on it:
//!
//! - [`constraints`] and [`catalog`]: the declarative table of modeled
//!   commands and the ranges their arguments accept.
//! - [`models`]: device profiles for each hardware variant. Frequency and
//!   screen bounds are read from the active profile.
//! - [`commands`]: typed builders producing [`Invocation`]s.
//! - [`gateway`]: the [`CommandGateway`], which validates, sends, and
//!   reports an [`Outcome`].
//! - [`builder`]: [`TinySaBuilder`] to wire it all to a serial port.
//!
//! # Example
//!
//! ```no_run
//! use tinysa::{TinySaBuilder, commands, models};
//! use tinysa_core::trace;
//!
//! # async fn example() -> tinysa_core::Result<()> {
//! let gateway = TinySaBuilder::new(models::ultra_zs405())
//!     .autoconnect()
//!     .await?;
//!
//! gateway
//!     .execute(&commands::cmd_attenuate(commands::AutoValue::Auto))
//!     .await
//!     .into_result()?;
//! let raw = gateway.execute(&commands::cmd_data(commands::TraceSlot::Measured)).await.into_result()?;
//! let levels = trace::parse_values(&trace::repair_malformed_tokens(&raw, trace::DEFAULT_REPLACEMENT))?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod catalog;
pub mod commands;
pub mod constraints;
pub mod gateway;
pub mod models;

pub use builder::TinySaBuilder;
pub use commands::Invocation;
pub use constraints::{ArgValue, ArgumentSpec, Bound, CommandDescriptor, Constraint, ConstraintTable};
pub use gateway::{CommandGateway, ERROR_MARKER, GatewayConfig, Outcome, resolve_arguments};
