//! The command gateway.
//!
//! Every command on its way to the instrument passes through a
//! [`CommandGateway`]. Modeled commands are checked against the
//! [`ConstraintTable`] under the active [`DeviceProfile`] before a single
//! byte is written; rejected calls never touch the transport. Accepted
//! calls are rendered to the wire form (name, arguments in declared order
//! with defaults filled in, CRLF) and handed to the [`Framer`].
//!
//! Results come back as an [`Outcome`]. Callers that script against raw
//! bytes can use [`CommandGateway::invoke_bytes`], which collapses every
//! failure into the configured error marker.
//!
//! `reset`, `clearconfig` and `restart` make the instrument drop its USB
//! link. The gateway reports them as [`Outcome::Disconnecting`] and refuses
//! further exchanges with [`Error::ReconnectRequired`] until
//! [`CommandGateway::reconnect`] installs a new transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tinysa_console::protocol::{encode_command, encode_raw, has_embedded_line_break};
use tinysa_console::Framer;
use tinysa_core::error::{Error, Result, ValidationError};
use tinysa_core::transport::Transport;
use tinysa_core::DeviceProfile;

use crate::commands::Invocation;
use crate::constraints::{ArgValue, CommandDescriptor, ConstraintTable};

/// Bytes returned by [`Outcome::into_bytes`] for a failure when the error
/// marker is enabled.
pub const ERROR_MARKER: &[u8] = b"ERROR";

/// Gateway behaviour switches.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Narrate every accepted and rejected call at `info` level.
    pub verbose: bool,
    /// Report failures as [`ERROR_MARKER`] instead of empty bytes in the
    /// byte-oriented API.
    pub error_byte_return: bool,
    /// How long to wait for a last prompt after a disconnecting command.
    pub disconnect_grace: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            verbose: false,
            error_byte_return: false,
            disconnect_grace: Duration::from_millis(500),
        }
    }
}

/// Result of one gateway call.
#[derive(Debug)]
pub enum Outcome {
    /// The instrument answered; echo and prompt already stripped.
    Payload(Vec<u8>),
    /// The command was sent and the instrument is dropping the link. Holds
    /// whatever arrived before it went away (usually nothing).
    Disconnecting(Vec<u8>),
    /// Rejected before anything was written.
    Invalid(ValidationError),
    /// The exchange failed on the transport.
    Transport(Error),
}

impl Outcome {
    /// `true` for [`Payload`](Outcome::Payload) and
    /// [`Disconnecting`](Outcome::Disconnecting).
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Payload(_) | Outcome::Disconnecting(_))
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Outcome::Payload(p) | Outcome::Disconnecting(p) => Some(p),
            Outcome::Invalid(_) | Outcome::Transport(_) => None,
        }
    }

    /// Whether the transport must be replaced before the next call.
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self,
            Outcome::Disconnecting(_) | Outcome::Transport(Error::ReconnectRequired)
        )
    }

    /// Convert to a plain `Result`.
    pub fn into_result(self) -> Result<Vec<u8>> {
        match self {
            Outcome::Payload(p) | Outcome::Disconnecting(p) => Ok(p),
            Outcome::Invalid(e) => Err(Error::Validation(e)),
            Outcome::Transport(e) => Err(e),
        }
    }

    /// Byte form: the payload on success, `error_marker` on any failure.
    pub fn into_bytes(self, error_marker: &[u8]) -> Vec<u8> {
        match self {
            Outcome::Payload(p) | Outcome::Disconnecting(p) => p,
            Outcome::Invalid(_) | Outcome::Transport(_) => error_marker.to_vec(),
        }
    }
}

/// Check `args` against `desc` and render the wire arguments.
///
/// Arguments are positional. A present value must be accepted by at least
/// one of its constraints. An omitted argument is replaced by its default;
/// an omitted optional argument without a default ends the argument list;
/// an omitted required argument is an error.
pub fn resolve_arguments(
    desc: &CommandDescriptor,
    args: &[ArgValue],
    profile: &DeviceProfile,
) -> std::result::Result<Vec<String>, ValidationError> {
    if let Some(extra) = args.get(desc.args.len()) {
        return Err(ValidationError::UnexpectedArgument {
            command: desc.name.to_string(),
            value: extra.to_string(),
        });
    }

    let mut rendered = Vec::with_capacity(desc.args.len());
    for (index, spec) in desc.args.iter().enumerate() {
        match (args.get(index), spec.default) {
            (Some(value), _) => {
                if !spec.accepts(value, profile) {
                    return Err(ValidationError::Rejected {
                        command: desc.name.to_string(),
                        argument: spec.name.to_string(),
                        value: value.to_string(),
                        expected: spec.expected(Some(profile)),
                    });
                }
                rendered.push(value.to_string());
            }
            (None, Some(default)) => rendered.push(default.to_string()),
            (None, None) if spec.optional => break,
            (None, None) => {
                return Err(ValidationError::MissingArgument {
                    command: desc.name.to_string(),
                    argument: spec.name.to_string(),
                });
            }
        }
    }
    Ok(rendered)
}

/// Validated command access to one instrument.
///
/// The gateway owns the framer behind a `tokio::sync::Mutex`, so calls from
/// several tasks are serialized into one exchange at a time.
pub struct CommandGateway {
    framer: Mutex<Framer>,
    table: Arc<ConstraintTable>,
    profile: DeviceProfile,
    verbose: AtomicBool,
    error_byte_return: AtomicBool,
    /// Set after a disconnecting command, cleared by `reconnect`.
    link_stale: AtomicBool,
    disconnect_grace: Duration,
}

impl CommandGateway {
    /// Build a gateway around an existing framer.
    ///
    /// Most callers go through [`TinySaBuilder`](crate::TinySaBuilder).
    pub fn new(
        framer: Framer,
        table: Arc<ConstraintTable>,
        profile: DeviceProfile,
        config: GatewayConfig,
    ) -> Self {
        CommandGateway {
            framer: Mutex::new(framer),
            table,
            profile,
            verbose: AtomicBool::new(config.verbose),
            error_byte_return: AtomicBool::new(config.error_byte_return),
            link_stale: AtomicBool::new(false),
            disconnect_grace: config.disconnect_grace,
        }
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn table(&self) -> &ConstraintTable {
        &self.table
    }

    pub fn set_verbose(&self, on: bool) {
        self.verbose.store(on, Ordering::Relaxed);
    }

    pub fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    pub fn set_error_byte_return(&self, on: bool) {
        self.error_byte_return.store(on, Ordering::Relaxed);
    }

    pub fn error_byte_return(&self) -> bool {
        self.error_byte_return.load(Ordering::Relaxed)
    }

    /// The bytes [`invoke_bytes`](Self::invoke_bytes) returns on failure:
    /// [`ERROR_MARKER`] or empty, depending on the current setting.
    pub fn error_marker(&self) -> &'static [u8] {
        if self.error_byte_return() {
            ERROR_MARKER
        } else {
            b""
        }
    }

    /// `true` after a disconnecting command until [`reconnect`](Self::reconnect).
    pub fn requires_reconnect(&self) -> bool {
        self.link_stale.load(Ordering::Relaxed)
    }

    /// Validate `args` for `desc` under this gateway's profile without
    /// sending anything. Returns the rendered wire arguments.
    pub fn validate(
        &self,
        desc: &CommandDescriptor,
        args: &[ArgValue],
    ) -> std::result::Result<Vec<String>, ValidationError> {
        resolve_arguments(desc, args, &self.profile)
    }

    /// Validate and run one command.
    pub async fn invoke(&self, desc: &CommandDescriptor, args: &[ArgValue]) -> Outcome {
        self.invoke_inner(desc, args, None).await
    }

    /// Like [`invoke`](Self::invoke), giving up with
    /// [`Error::Cancelled`] once `cancel` fires.
    pub async fn invoke_with_cancel(
        &self,
        desc: &CommandDescriptor,
        args: &[ArgValue],
        cancel: &CancellationToken,
    ) -> Outcome {
        self.invoke_inner(desc, args, Some(cancel)).await
    }

    /// Look `name` up in the constraint table, then validate and run it.
    pub async fn invoke_named(&self, name: &str, args: &[ArgValue]) -> Outcome {
        let Some(desc) = self.table.get(name).copied() else {
            let err = ValidationError::UnknownCommand(name.to_string());
            self.narrate_rejection(name, &err);
            return Outcome::Invalid(err);
        };
        self.invoke(&desc, args).await
    }

    /// Run a prepared [`Invocation`].
    pub async fn execute(&self, invocation: &Invocation) -> Outcome {
        self.invoke_named(invocation.name, &invocation.args).await
    }

    /// Byte-oriented form of [`invoke`](Self::invoke): the payload, or the
    /// configured error marker on any failure.
    pub async fn invoke_bytes(&self, desc: &CommandDescriptor, args: &[ArgValue]) -> Vec<u8> {
        let marker = self.error_marker();
        self.invoke(desc, args).await.into_bytes(marker)
    }

    /// Send `raw` verbatim, bypassing the constraint table.
    ///
    /// Any trailing line ending is normalized to CRLF. Text with a line
    /// break inside it is refused with
    /// [`ValidationError::EmbeddedLineBreak`], since the second line's
    /// answer would never be read. The instrument's answer comes back
    /// uninterpreted, including its own complaints about unknown commands.
    /// A first word naming a disconnecting command is still handled as one.
    pub async fn command(&self, raw: &str) -> Outcome {
        if has_embedded_line_break(raw) {
            let err = ValidationError::EmbeddedLineBreak(raw.to_string());
            self.narrate_rejection("raw", &err);
            return Outcome::Invalid(err);
        }

        let name = raw.split_whitespace().next().unwrap_or_default();
        let disconnects = self.table.get(name).is_some_and(|d| d.disconnects);

        if self.verbose() {
            info!(command = raw.trim_end(), "passthrough");
        }
        debug!(command = raw.trim_end(), "raw command");

        self.exchange(name, encode_raw(raw), disconnects, None).await
    }

    /// Byte-oriented form of [`command`](Self::command).
    pub async fn command_bytes(&self, raw: &str) -> Vec<u8> {
        let marker = self.error_marker();
        self.command(raw).await.into_bytes(marker)
    }

    /// Close the transport. Later calls fail with
    /// [`Error::ReconnectRequired`] until [`reconnect`](Self::reconnect).
    pub async fn disconnect(&self) -> Result<()> {
        let mut framer = self.framer.lock().await;
        self.link_stale.store(true, Ordering::Relaxed);
        debug!("closing instrument link");
        framer.close().await
    }

    /// Install a fresh transport, for example after `reset`.
    ///
    /// The old transport is closed; a failure to close it is only logged.
    pub async fn reconnect(&self, transport: Box<dyn Transport>) {
        let mut framer = self.framer.lock().await;
        let mut old = framer.replace_transport(transport);
        if let Err(e) = old.close().await {
            debug!(error = %e, "closing previous transport failed");
        }
        self.link_stale.store(false, Ordering::Relaxed);
        debug!("instrument link replaced");
    }

    /// Usage lines for every modeled command, bounds resolved against this
    /// gateway's profile.
    pub fn library_help(&self) -> String {
        self.table.help(Some(&self.profile))
    }

    /// Usage line for one modeled command.
    pub fn usage(&self, name: &str) -> Option<String> {
        self.table.usage(name, Some(&self.profile))
    }

    async fn invoke_inner(
        &self,
        desc: &CommandDescriptor,
        args: &[ArgValue],
        cancel: Option<&CancellationToken>,
    ) -> Outcome {
        let rendered = match self.validate(desc, args) {
            Ok(rendered) => rendered,
            Err(err) => {
                self.narrate_rejection(desc.name, &err);
                return Outcome::Invalid(err);
            }
        };

        if self.verbose() {
            info!(
                command = desc.name,
                args = %rendered.join(" "),
                model = self.profile.model_id,
                "sending command"
            );
        }
        debug!(command = desc.name, args = ?rendered, "validated");

        let wire = encode_command(desc.name, &rendered);
        self.exchange(desc.name, wire, desc.disconnects, cancel).await
    }

    async fn exchange(
        &self,
        name: &str,
        wire: Vec<u8>,
        disconnects: bool,
        cancel: Option<&CancellationToken>,
    ) -> Outcome {
        let mut framer = self.framer.lock().await;

        if self.link_stale.load(Ordering::Relaxed) {
            debug!(command = name, "link is stale, refusing exchange");
            return Outcome::Transport(Error::ReconnectRequired);
        }

        if disconnects {
            return self.exchange_disconnecting(&mut framer, name, &wire).await;
        }

        let result = match cancel {
            Some(token) => framer.send_and_receive_with_cancel(&wire, token).await,
            None => framer.send_and_receive(&wire).await,
        };

        match result {
            Ok(payload) => {
                debug!(command = name, bytes = payload.len(), "command complete");
                Outcome::Payload(payload)
            }
            Err(e) => {
                warn!(command = name, error = %e, "exchange failed");
                Outcome::Transport(e)
            }
        }
    }

    /// Send a command after which the instrument drops the link.
    ///
    /// Once the write succeeds the link counts as gone, whatever the read
    /// brings. The read only collects a last prompt if one arrives within
    /// the grace period.
    async fn exchange_disconnecting(&self, framer: &mut Framer, name: &str, wire: &[u8]) -> Outcome {
        if let Err(e) = framer.write_request(wire).await {
            warn!(command = name, error = %e, "exchange failed");
            return Outcome::Transport(e);
        }
        self.link_stale.store(true, Ordering::Relaxed);

        let payload = match framer.read_response(Some(self.disconnect_grace)).await {
            Ok(payload) => payload,
            Err(e) => {
                debug!(command = name, error = %e, "no prompt before link dropped");
                Vec::new()
            }
        };

        if self.verbose() {
            info!(command = name, "instrument is disconnecting; reconnect required");
        }
        debug!(command = name, "link marked stale");
        Outcome::Disconnecting(payload)
    }

    fn narrate_rejection(&self, name: &str, err: &ValidationError) {
        if self.verbose() {
            info!(command = name, reason = %err, "command rejected");
        }
        debug!(command = name, reason = %err, "validation failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{self, AutoValue};
    use crate::models;
    use tinysa_console::FramerConfig;
    use tinysa_test_harness::{MockTransport, SentLog};

    fn gateway_with(mock: MockTransport, profile: DeviceProfile) -> (CommandGateway, SentLog) {
        let log = mock.sent_log();
        let config = FramerConfig {
            read_timeout: Duration::from_millis(20),
            response_timeout: Some(Duration::from_secs(2)),
            ..FramerConfig::default()
        };
        let gateway = CommandGateway::new(
            Framer::new(Box::new(mock), config),
            Arc::new(ConstraintTable::standard()),
            profile,
            GatewayConfig {
                disconnect_grace: Duration::from_millis(50),
                ..GatewayConfig::default()
            },
        );
        (gateway, log)
    }

    fn console() -> (CommandGateway, SentLog) {
        gateway_with(MockTransport::console(), models::ultra_zs405())
    }

    fn arg(s: &str) -> ArgValue {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn attenuate_half_open_range() {
        let (gw, log) = console();
        for ok in ["0", "30", "auto"] {
            let outcome = gw.invoke_named("attenuate", &[arg(ok)]).await;
            assert!(outcome.is_ok(), "attenuate {ok}: {outcome:?}");
        }
        assert_eq!(log.count(), 3);

        for bad in ["31", "AUTO", "-1"] {
            let outcome = gw.invoke_named("attenuate", &[arg(bad)]).await;
            assert!(
                matches!(outcome, Outcome::Invalid(ValidationError::Rejected { .. })),
                "attenuate {bad}: {outcome:?}"
            );
        }
        assert_eq!(log.count(), 3);
        assert_eq!(log.writes()[1], b"attenuate 30\r\n");
    }

    #[tokio::test]
    async fn level_inclusive_range() {
        let (gw, log) = console();
        assert!(gw.invoke_named("level", &[arg("-76")]).await.is_ok());
        assert!(gw.invoke_named("level", &[arg("13")]).await.is_ok());
        assert!(matches!(
            gw.invoke_named("level", &[arg("-77")]).await,
            Outcome::Invalid(_)
        ));
        assert!(matches!(
            gw.invoke_named("level", &[arg("14")]).await,
            Outcome::Invalid(_)
        ));
        assert_eq!(log.count(), 2);
    }

    #[tokio::test]
    async fn missing_required_argument_writes_nothing() {
        let (gw, log) = gateway_with(MockTransport::new(), models::basic());
        let outcome = gw.invoke_named("level", &[]).await;
        match outcome {
            Outcome::Invalid(ValidationError::MissingArgument { command, argument }) => {
                assert_eq!(command, "level");
                assert_eq!(argument, "dbm");
            }
            other => panic!("expected MissingArgument, got {other:?}"),
        }
        assert_eq!(log.count(), 0);
    }

    #[tokio::test]
    async fn extra_argument_rejected() {
        let (gw, log) = console();
        let outcome = gw.invoke_named("pause", &[arg("now")]).await;
        assert!(matches!(
            outcome,
            Outcome::Invalid(ValidationError::UnexpectedArgument { .. })
        ));
        assert_eq!(log.count(), 0);
    }

    #[tokio::test]
    async fn unknown_command_is_invalid() {
        let (gw, log) = console();
        let outcome = gw.invoke_named("sweep", &[arg("start")]).await;
        assert!(matches!(
            outcome,
            Outcome::Invalid(ValidationError::UnknownCommand(ref n)) if n == "sweep"
        ));
        assert_eq!(log.count(), 0);
    }

    #[tokio::test]
    async fn defaults_fill_omitted_arguments() {
        let (gw, log) = console();
        assert!(gw.invoke_named("attenuate", &[]).await.is_ok());
        assert!(gw.invoke_named("color", &[arg("3")]).await.is_ok());
        assert!(gw.invoke_named("color", &[]).await.is_ok());
        assert!(gw.invoke_named("save", &[]).await.is_ok());

        let writes = log.writes();
        assert_eq!(writes[0], b"attenuate auto\r\n");
        assert_eq!(writes[1], b"color 3 0xF8FCF8\r\n");
        assert_eq!(writes[2], b"color\r\n");
        assert_eq!(writes[3], b"save 1\r\n");
    }

    #[tokio::test]
    async fn freq_bound_follows_profile() {
        let two_ghz = ArgValue::Int(2_000_000_000);

        let (basic, basic_log) = gateway_with(MockTransport::console(), models::basic());
        match basic.invoke_named("freq", &[two_ghz.clone()]).await {
            Outcome::Invalid(ValidationError::Rejected { expected, .. }) => {
                assert_eq!(expected, "100000..960000000");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert_eq!(basic_log.count(), 0);

        let (ultra, ultra_log) = console();
        assert!(ultra.invoke_named("freq", &[two_ghz]).await.is_ok());
        assert_eq!(ultra_log.writes()[0], b"freq 2000000000\r\n");
    }

    #[tokio::test]
    async fn touch_bounds_follow_screen() {
        let (gw, log) = gateway_with(MockTransport::console(), models::basic());
        assert!(gw.execute(&commands::cmd_touch(320, 240)).await.is_ok());
        assert!(matches!(
            gw.execute(&commands::cmd_touch(321, 0)).await,
            Outcome::Invalid(_)
        ));
        assert!(matches!(
            gw.execute(&commands::cmd_touch(0, 241)).await,
            Outcome::Invalid(_)
        ));
        assert_eq!(log.count(), 1);
    }

    #[tokio::test]
    async fn payload_returned_clean() {
        let mut mock = MockTransport::new();
        mock.expect(
            b"version\r\n",
            b"version\r\ntinySA4_v1.4-143-g864bb27\r\nHW Version:V0.4.5.1\r\nch> ",
        );
        mock.set_chunk_size(3);
        let (gw, _log) = gateway_with(mock, models::ultra_zs405());

        let outcome = gw.execute(&commands::cmd_version()).await;
        assert_eq!(
            outcome.payload(),
            Some(&b"tinySA4_v1.4-143-g864bb27\r\nHW Version:V0.4.5.1\r"[..])
        );
    }

    #[tokio::test]
    async fn error_marker_toggle() {
        let (gw, log) = console();
        let desc = *gw.table().get("attenuate").unwrap();

        assert_eq!(gw.invoke_bytes(&desc, &[arg("31")]).await, b"");
        gw.set_error_byte_return(true);
        assert_eq!(gw.invoke_bytes(&desc, &[arg("31")]).await, ERROR_MARKER);

        // Classification does not depend on the toggle.
        let on = gw.invoke(&desc, &[arg("31")]).await;
        gw.set_error_byte_return(false);
        let off = gw.invoke(&desc, &[arg("31")]).await;
        match (on, off) {
            (Outcome::Invalid(a), Outcome::Invalid(b)) => assert_eq!(a, b),
            other => panic!("expected two Invalid outcomes, got {other:?}"),
        }
        assert_eq!(log.count(), 0);
    }

    #[tokio::test]
    async fn transport_failure_uses_marker() {
        let mut mock = MockTransport::new();
        mock.expect_disconnect(b"status\r\n");
        let (gw, _log) = gateway_with(mock, models::basic());
        gw.set_error_byte_return(true);

        assert_eq!(gw.command_bytes("status").await, ERROR_MARKER);
    }

    #[tokio::test]
    async fn transport_error_is_distinct_from_validation() {
        let mut mock = MockTransport::new();
        mock.expect_disconnect(b"status\r\n");
        let (gw, _log) = gateway_with(mock, models::basic());

        match gw.execute(&commands::cmd_status()).await {
            Outcome::Transport(Error::ConnectionLost) => {}
            other => panic!("expected ConnectionLost, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reset_requires_reconnect() {
        let mut mock = MockTransport::new();
        mock.expect_disconnect(b"reset\r\n");
        let (gw, log) = gateway_with(mock, models::basic());

        let outcome = gw.execute(&commands::cmd_reset()).await;
        assert!(matches!(outcome, Outcome::Disconnecting(_)));
        assert!(outcome.requires_reconnect());
        assert!(gw.requires_reconnect());

        let next = gw.execute(&commands::cmd_version()).await;
        assert!(matches!(next, Outcome::Transport(Error::ReconnectRequired)));
        assert_eq!(log.count(), 1);

        let mut fresh = MockTransport::new();
        fresh.expect(b"version\r\n", b"version\r\ntinySA_v1.3\r\nch> ");
        gw.reconnect(Box::new(fresh)).await;
        assert!(!gw.requires_reconnect());
        assert!(gw.execute(&commands::cmd_version()).await.is_ok());
    }

    #[tokio::test]
    async fn clearconfig_sends_password_and_disconnects() {
        let (gw, log) = console();
        let outcome = gw.execute(&commands::cmd_clearconfig()).await;
        assert!(matches!(outcome, Outcome::Disconnecting(_)));
        assert_eq!(log.writes()[0], b"clearconfig 1234\r\n");
    }

    #[tokio::test]
    async fn passthrough_reset_still_flags_link() {
        let (gw, _log) = console();
        let outcome = gw.command("reset").await;
        assert!(matches!(outcome, Outcome::Disconnecting(_)));
        assert!(gw.requires_reconnect());
    }

    #[tokio::test]
    async fn passthrough_sends_exactly_once() {
        let mut mock = MockTransport::new();
        mock.expect(
            b"nonexistent_cmd\r\n",
            b"nonexistent_cmd\r\nnonexistent_cmd?\r\nch> ",
        );
        let (gw, log) = gateway_with(mock, models::basic());

        let outcome = gw.command("nonexistent_cmd").await;
        assert_eq!(outcome.payload(), Some(&b"nonexistent_cmd?\r"[..]));
        assert_eq!(log.writes(), vec![b"nonexistent_cmd\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn passthrough_refuses_embedded_line_break() {
        let (gw, log) = console();
        let outcome = gw.command("pause\r\nresume").await;
        assert!(matches!(
            outcome,
            Outcome::Invalid(ValidationError::EmbeddedLineBreak(_))
        ));
        assert_eq!(log.count(), 0);

        assert!(gw.command("pause\r\n").await.is_ok());
        assert_eq!(log.writes(), vec![b"pause\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn text_numbers_validate_like_integers() {
        let (gw, log) = console();
        let outcome = gw
            .execute(&Invocation::new("attenuate").arg("30"))
            .await;
        assert!(outcome.is_ok(), "{outcome:?}");
        assert!(matches!(
            gw.execute(&Invocation::new("attenuate").arg("31")).await,
            Outcome::Invalid(ValidationError::Rejected { .. })
        ));
        assert_eq!(log.writes(), vec![b"attenuate 30\r\n".to_vec()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_run_one_at_a_time() {
        const REPLIES: [(&str, &str); 4] = [
            ("version", "tinySA4_v1.4-143-g864bb27"),
            ("info", "tinySA ULTRA"),
            ("status", "Resumed"),
            ("vbat", "4123 mV"),
        ];

        let mut mock = MockTransport::console();
        for (name, reply) in REPLIES {
            mock.console_reply(name, reply.as_bytes());
        }
        mock.set_chunk_size(3);
        mock.set_idle_polls(2);
        let (gw, log) = gateway_with(mock, models::ultra_zs405());
        let gw = Arc::new(gw);

        let mut tasks = Vec::new();
        for round in 0..3 {
            for (name, reply) in REPLIES {
                let gw = Arc::clone(&gw);
                tasks.push(tokio::spawn(async move {
                    let outcome = if round % 2 == 0 {
                        gw.invoke_named(name, &[]).await
                    } else {
                        gw.command(name).await
                    };
                    (name, reply, outcome.into_result())
                }));
            }
        }

        for task in tasks {
            let (name, reply, result) = task.await.unwrap();
            assert_eq!(result.unwrap(), reply.as_bytes(), "{name}");
        }

        let writes = log.writes();
        assert_eq!(writes.len(), 12);
        for write in &writes {
            assert!(
                REPLIES
                    .iter()
                    .any(|(name, _)| write == format!("{name}\r\n").as_bytes()),
                "interleaved write {:?}",
                String::from_utf8_lossy(write)
            );
        }
    }

    #[tokio::test]
    async fn verbose_does_not_change_results() {
        let (gw, _log) = console();
        let quiet_ok = gw.execute(&commands::cmd_level(-20)).await.into_result();
        let quiet_bad = gw.execute(&commands::cmd_level(20)).await.into_result();

        gw.set_verbose(true);
        assert!(gw.verbose());
        let loud_ok = gw.execute(&commands::cmd_level(-20)).await.into_result();
        let loud_bad = gw.execute(&commands::cmd_level(20)).await.into_result();

        assert_eq!(quiet_ok.unwrap(), loud_ok.unwrap());
        assert_eq!(
            quiet_bad.unwrap_err().to_string(),
            loud_bad.unwrap_err().to_string()
        );
    }

    #[tokio::test]
    async fn cancelled_invoke() {
        let mut mock = MockTransport::new();
        mock.expect(b"wait\r\n", b"wait\r\nch> ");
        mock.set_idle_polls(usize::MAX);
        let (gw, _log) = gateway_with(mock, models::basic());

        let token = CancellationToken::new();
        token.cancel();
        let desc = *gw.table().get("wait").unwrap();
        let outcome = gw.invoke_with_cancel(&desc, &[], &token).await;
        assert!(matches!(outcome, Outcome::Transport(Error::Cancelled)));
    }

    #[tokio::test]
    async fn disconnect_then_reconnect() {
        let (gw, _log) = console();
        gw.disconnect().await.unwrap();
        assert!(matches!(
            gw.command("version").await,
            Outcome::Transport(Error::ReconnectRequired)
        ));

        gw.reconnect(Box::new(MockTransport::console())).await;
        assert!(gw.command("version").await.is_ok());
    }

    #[tokio::test]
    async fn typed_builders_pass_validation() {
        let (gw, log) = console();
        let invocations = [
            commands::cmd_attenuate(AutoValue::Value(10)),
            commands::cmd_rbw(AutoValue::Auto),
            commands::cmd_scan(100_000_000, 200_000_000, Some(450), Some(3)),
            commands::cmd_color(Some((2, 0x00FF00))),
            commands::cmd_sd_read("-0.bmp"),
            commands::cmd_caloutput(Some(30)),
        ];
        for inv in &invocations {
            let outcome = gw.execute(inv).await;
            assert!(outcome.is_ok(), "{inv}: {outcome:?}");
        }
        assert_eq!(log.count(), invocations.len());
    }

    #[test]
    fn library_help_resolves_profile_bounds() {
        let (gw, _log) = gateway_with(MockTransport::new(), models::basic());
        assert_eq!(gw.usage("touch").as_deref(), Some("touch {0..320} {0..240}"));
        assert!(gw.library_help().contains("attenuate [auto|0..30]"));
    }

    #[test]
    fn into_result_maps_validation() {
        let outcome = Outcome::Invalid(ValidationError::UnknownCommand("x".into()));
        assert!(matches!(outcome.into_result(), Err(Error::Validation(_))));
        assert_eq!(Outcome::Payload(b"ok".to_vec()).into_bytes(ERROR_MARKER), b"ok");
    }
}
