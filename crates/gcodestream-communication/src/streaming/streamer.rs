//! The send loop
//!
//! [`GcodeStreamer`] owns a machine link for one session. For each source
//! line it preprocesses the payload, prints the progress annotation, writes
//! the payload plus `\n` and then blocks until the device acknowledges it.
//! Only one line is ever outstanding.

use super::progress::ProgressMeter;
use super::source::{preprocess_line, LineSource};
use crate::communication::MachineLink;
use crate::protocol::{discard_pending_input, reliable_write, wait_for_ok_ack};
use gcodestream_core::constants::{DEFAULT_RETRY_LIMIT, DRAIN_WINDOW_MS, RESPONSE_BUFFER_LEN};
use gcodestream_core::{Error, ErrorPolicy, ProtocolError, Result, SendState, SessionStats};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Banner shown when the pause policy stops for the operator
pub const PAUSE_BANNER: &str = "[ Error Response. CTRL-C to stop ]";

/// Blocks the send loop until the operator allows it to continue
pub trait OperatorGate {
    /// Wait for the operator. Returning means "carry on".
    fn wait_for_operator(&mut self) -> io::Result<()>;
}

/// Waits for a single character on stdin
///
/// End of input on stdin is taken as permission to continue.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinGate;

impl OperatorGate for StdinGate {
    fn wait_for_operator(&mut self) -> io::Result<()> {
        let mut byte = [0u8; 1];
        loop {
            match io::stdin().lock().read(&mut byte) {
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Session tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamerConfig {
    /// What to do when a line is answered with an error
    pub error_policy: ErrorPolicy,
    /// Retransmissions per line under [`ErrorPolicy::Retry`]
    pub retry_limit: u32,
    /// Mirror device output to stdout while waiting for acks
    pub echo_responses: bool,
    /// Response line buffer length
    pub response_buffer_len: usize,
    /// Quiet window for the pre-session drain
    pub drain_window: Duration,
    /// Digit grouping for progress line numbers
    pub thousands_separator: Option<char>,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::default(),
            retry_limit: DEFAULT_RETRY_LIMIT,
            echo_responses: false,
            response_buffer_len: RESPONSE_BUFFER_LEN,
            drain_window: Duration::from_millis(DRAIN_WINDOW_MS),
            thousands_separator: Some(','),
        }
    }
}

/// Streams a G-code program over a machine link, one acknowledged line at a time
pub struct GcodeStreamer<L, G = StdinGate> {
    link: L,
    gate: G,
    config: StreamerConfig,
    state: SendState,
    stats: SessionStats,
    out: Box<dyn Write>,
    diag: Box<dyn Write>,
    response_buf: Vec<u8>,
}

impl<L: MachineLink> GcodeStreamer<L, StdinGate> {
    /// Streamer that pauses on stdin, printing to stdout and stderr
    pub fn new(link: L, config: StreamerConfig) -> Self {
        Self::with_gate(link, StdinGate, config)
    }
}

impl<L: MachineLink, G: OperatorGate> GcodeStreamer<L, G> {
    /// Streamer with a custom operator gate
    pub fn with_gate(link: L, gate: G, config: StreamerConfig) -> Self {
        let response_buf = vec![0u8; config.response_buffer_len.max(2)];
        Self {
            link,
            gate,
            config,
            state: SendState::Ready,
            stats: SessionStats::default(),
            out: Box::new(io::stdout()),
            diag: Box::new(io::stderr()),
            response_buf,
        }
    }

    /// Redirect progress output and diagnostics
    pub fn with_output(mut self, out: Box<dyn Write>, diag: Box<dyn Write>) -> Self {
        self.out = out;
        self.diag = diag;
        self
    }

    /// Current send loop state
    pub fn state(&self) -> SendState {
        self.state
    }

    /// Counters so far
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Throw away device output queued before the session starts
    pub fn drain_pending_input(&mut self) -> io::Result<usize> {
        discard_pending_input(&mut self.link, self.config.drain_window, &mut *self.diag)
    }

    /// Drain stale input (best effort), then stream the whole source
    pub fn run<S: LineSource>(&mut self, source: &mut S) -> Result<SessionStats> {
        if let Err(e) = self.drain_pending_input() {
            tracing::warn!("Draining {} failed, continuing: {}", self.link.describe(), e);
        }
        self.stream(source)
    }

    /// Stream every line of `source`
    ///
    /// Returns the session counters at end of input. A failed write, a
    /// failed source read or an abort under [`ErrorPolicy::Abort`] ends the
    /// session with an error. A streamer runs a single session.
    pub fn stream<S: LineSource>(&mut self, source: &mut S) -> Result<SessionStats> {
        if self.state == SendState::Terminated {
            return Err(Error::other("streaming session already finished"));
        }

        let meter = ProgressMeter::new(source.total_bytes())
            .with_separator(self.config.thousands_separator);
        let mut line = Vec::new();
        let mut frame = Vec::new();

        tracing::info!(
            "Streaming {} bytes to {} ({} policy)",
            source.total_bytes(),
            self.link.describe(),
            self.config.error_policy
        );

        loop {
            match source.next_line(&mut line) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    tracing::debug!("Reading program failed: {}", e);
                    self.set_state(SendState::Terminated);
                    return Err(e.into());
                }
            }
            self.stats.line_count += 1;
            let line_number = self.stats.line_count;

            let payload = preprocess_line(&line);
            if payload.is_empty() {
                continue;
            }

            let annotation = meter.format_line(source.position(), line_number, payload);
            frame.clear();
            frame.extend_from_slice(payload);
            frame.push(b'\n');

            self.print(&annotation)?;
            self.transmit(&frame, line_number)?;
            self.print("\n")?;
            self.stats.lines_sent += 1;

            self.await_ack(&frame, line_number)?;
        }

        self.set_state(SendState::Terminated);
        tracing::info!("{}", self.stats);
        Ok(self.stats)
    }

    fn print(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    fn transmit(&mut self, frame: &[u8], line_number: u64) -> Result<()> {
        self.set_state(SendState::Writing);
        if let Err(e) = reliable_write(&mut self.link, frame) {
            let _ = writeln!(self.diag, "Send error!");
            tracing::debug!(
                "Writing line {} to {} failed: {}",
                line_number,
                self.link.describe(),
                e
            );
            self.set_state(SendState::Terminated);
            return Err(ProtocolError::SendFailed {
                line_number,
                reason: e.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn await_ack(&mut self, frame: &[u8], line_number: u64) -> Result<()> {
        let mut retries = 0;
        loop {
            self.set_state(SendState::AwaitingAck);
            let echo: Option<&mut dyn Write> = if self.config.echo_responses {
                Some(&mut *self.out)
            } else {
                None
            };
            let failure =
                match wait_for_ok_ack(&mut self.link, &mut self.response_buf, &mut *self.diag, echo)
                {
                    Ok(()) => {
                        self.set_state(SendState::Ready);
                        return Ok(());
                    }
                    Err(e) => e,
                };
            self.stats.error_responses += 1;

            match self.config.error_policy {
                ErrorPolicy::Continue => {
                    tracing::debug!("Line {} failed, continuing: {}", line_number, failure);
                    self.set_state(SendState::Ready);
                    return Ok(());
                }
                ErrorPolicy::Abort => {
                    tracing::debug!("Line {} failed, aborting: {}", line_number, failure);
                    self.set_state(SendState::Terminated);
                    return Err(ProtocolError::Aborted {
                        line_number,
                        reason: failure.to_string(),
                    }
                    .into());
                }
                ErrorPolicy::Retry if retries < self.config.retry_limit => {
                    retries += 1;
                    self.stats.retransmissions += 1;
                    tracing::debug!(
                        "Line {} failed, retransmitting ({}/{}): {}",
                        line_number,
                        retries,
                        self.config.retry_limit,
                        failure
                    );
                    self.transmit(frame, line_number)?;
                }
                ErrorPolicy::Retry | ErrorPolicy::Pause => {
                    self.pause(line_number);
                    return Ok(());
                }
            }
        }
    }

    fn pause(&mut self, line_number: u64) {
        self.set_state(SendState::Paused);
        let _ = writeln!(self.diag, "{}", PAUSE_BANNER);
        let _ = self.diag.flush();
        tracing::info!("Paused at line {} for the operator", line_number);
        if let Err(e) = self.gate.wait_for_operator() {
            tracing::warn!("Operator gate failed, resuming: {}", e);
        }
        self.set_state(SendState::Ready);
    }

    fn set_state(&mut self, next: SendState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!("{} -> {}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::Readiness;
    use crate::streaming::GcodeSource;
    use std::sync::{Arc, Mutex};

    /// Replays a fixed response stream and records writes
    struct ScriptedLink {
        responses: io::Cursor<Vec<u8>>,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl ScriptedLink {
        fn new(responses: &str) -> (Self, Arc<Mutex<Vec<u8>>>) {
            let written = Arc::new(Mutex::new(Vec::new()));
            let link = Self {
                responses: io::Cursor::new(responses.as_bytes().to_vec()),
                written: Arc::clone(&written),
            };
            (link, written)
        }
    }

    impl Read for ScriptedLink {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.responses.read(buf)
        }
    }

    impl Write for ScriptedLink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl MachineLink for ScriptedLink {
        fn await_read_ready(&mut self, _timeout: Duration) -> io::Result<Readiness> {
            Ok(Readiness::TimedOut)
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    struct CountingGate(Arc<Mutex<u32>>);

    impl OperatorGate for CountingGate {
        fn wait_for_operator(&mut self) -> io::Result<()> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn streamer(
        responses: &str,
        policy: ErrorPolicy,
    ) -> (GcodeStreamer<ScriptedLink, CountingGate>, Arc<Mutex<Vec<u8>>>, Arc<Mutex<u32>>) {
        let (link, written) = ScriptedLink::new(responses);
        let pauses = Arc::new(Mutex::new(0));
        let config = StreamerConfig {
            error_policy: policy,
            retry_limit: 2,
            ..StreamerConfig::default()
        };
        let streamer = GcodeStreamer::with_gate(link, CountingGate(Arc::clone(&pauses)), config)
            .with_output(Box::new(io::sink()), Box::new(io::sink()));
        (streamer, written, pauses)
    }

    #[test]
    fn test_default_config() {
        let config = StreamerConfig::default();
        assert_eq!(config.error_policy, ErrorPolicy::Pause);
        assert_eq!(config.drain_window, Duration::from_secs(1));
        assert_eq!(config.response_buffer_len, 512);
    }

    #[test]
    fn test_continue_policy_skips_failed_line() {
        let (mut streamer, written, pauses) = streamer("error:2\nok\n", ErrorPolicy::Continue);
        let mut source = GcodeSource::from_bytes("G1 X1\nG1 X2\n");
        let stats = streamer.stream(&mut source).unwrap();

        assert_eq!(stats.lines_sent, 2);
        assert_eq!(stats.error_responses, 1);
        assert_eq!(*pauses.lock().unwrap(), 0);
        assert_eq!(written.lock().unwrap().as_slice(), b"G1 X1\nG1 X2\n");
    }

    #[test]
    fn test_abort_policy_stops_session() {
        let (mut streamer, written, _) = streamer("fatal: heater\n", ErrorPolicy::Abort);
        let mut source = GcodeSource::from_bytes("M104 S200\nG28\n");
        let err = streamer.stream(&mut source).unwrap_err();

        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::Aborted { line_number: 1, .. })
        ));
        assert_eq!(streamer.state(), SendState::Terminated);
        assert_eq!(streamer.stats().error_responses, 1);
        assert_eq!(written.lock().unwrap().as_slice(), b"M104 S200\n");
    }

    #[test]
    fn test_retry_policy_retransmits_then_pauses() {
        let (mut streamer, written, pauses) =
            streamer("rs 1\nrs 1\nrs 1\nok\n", ErrorPolicy::Retry);
        let mut source = GcodeSource::from_bytes("G0 Z5\nG0 Z0\n");
        let stats = streamer.stream(&mut source).unwrap();

        // three attempts of line 1 (limit 2), pause, then line 2
        assert_eq!(stats.retransmissions, 2);
        assert_eq!(stats.error_responses, 3);
        assert_eq!(stats.lines_sent, 2);
        assert_eq!(*pauses.lock().unwrap(), 1);
        assert_eq!(
            written.lock().unwrap().as_slice(),
            b"G0 Z5\nG0 Z5\nG0 Z5\nG0 Z0\n"
        );
    }

    #[test]
    fn test_retry_recovers() {
        let (mut streamer, _, pauses) = streamer("Resend: 1\nok\n", ErrorPolicy::Retry);
        let mut source = GcodeSource::from_bytes("G28\n");
        let stats = streamer.stream(&mut source).unwrap();
        assert_eq!(stats.retransmissions, 1);
        assert_eq!(*pauses.lock().unwrap(), 0);
    }

    #[test]
    fn test_second_session_is_rejected() {
        let (mut streamer, _, _) = streamer("", ErrorPolicy::Pause);
        let mut source = GcodeSource::from_bytes("");
        assert_eq!(streamer.stream(&mut source).unwrap().line_count, 0);
        assert!(streamer.stream(&mut source).is_err());
    }
}
