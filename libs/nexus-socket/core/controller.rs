//! Lifecycle controller: the reconnection state machine
//!
//! A single spawned task owns the transport and every piece of
//! reconnection-policy state. All notification delivery and retry timing
//! happen as discrete steps of this task's loop, so no two notifications
//! for the same logical socket are ever processed concurrently and the
//! close-triggered retry decision is always fully resolved before the next
//! physical connection raises its first event.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SocketConfig;
use crate::dispatch::Dispatcher;
use crate::message::{close_code, CloseEvent, Frame, TransportEvent};
use crate::state::{BinaryType, SharedState};
use crate::transport::Transport;
use crate::NexusSocketError;

/// Commands from the handle to the controller task
#[derive(Debug)]
pub(crate) enum Command {
    /// Write a frame to the live connection
    Send(Frame),
    /// Request a graceful close with the given code/reason
    Close {
        code: Option<u16>,
        reason: Option<String>,
    },
    /// Tear the logical socket down; no further retries
    Destroy,
}

/// Coarse lifecycle notifications, consumable as a stream
///
/// A monitoring view alongside the callback surface. Retry-budget
/// exhaustion deliberately has no event: it is a silent terminal state,
/// observable only through `ready_state`.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// A connection attempt succeeded
    Connected,
    /// A reconnection attempt succeeded (follows `Connected`)
    Recovered,
    /// The physical connection closed
    Disconnected { code: u16, was_clean: bool },
    /// A retry was scheduled (attempt number, 1-based)
    Reconnecting(u32),
    /// A transport-level failure occurred
    Error(String),
}

/// Logical lifecycle phase, distinct from the physical ready state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecyclePhase {
    /// No open attempt has succeeded since the last (re)start
    Connecting,
    /// A physical connection is currently open
    Open,
    /// A close was observed and a retry is pending or in flight
    Reconnecting,
    /// No further retries will occur
    Terminal,
}

/// Why the lifecycle went terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TerminalReason {
    /// The application requested the close
    Manual,
    /// The transport reported a normal closure (code 1000)
    NormalClosure,
    /// The retry budget is spent
    Exhausted,
}

/// Outcome of evaluating one close notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseDecision {
    Terminal(TerminalReason),
    RetryAfter(Duration),
}

/// Reconnection-policy state, owned exclusively by the controller task
pub(crate) struct ReconnectPolicy {
    max_attempts: u32,
    retry_delay: Duration,
    attempts: u32,
    phase: LifecyclePhase,
    /// Set by a user close/destroy; consumed by the next close observation
    manual_close: bool,
}

impl ReconnectPolicy {
    pub(crate) fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts,
            retry_delay,
            attempts: 0,
            phase: LifecyclePhase::Connecting,
            manual_close: false,
        }
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn is_reconnecting(&self) -> bool {
        self.phase == LifecyclePhase::Reconnecting
    }

    /// Record that the next close observation is application-initiated
    pub(crate) fn note_manual_close(&mut self) {
        self.manual_close = true;
    }

    /// Evaluate a close notification, in documented precedence order:
    /// manual close, then normal closure, then budget exhaustion, then retry.
    pub(crate) fn evaluate_close(&mut self, code: u16) -> CloseDecision {
        if self.manual_close {
            self.manual_close = false;
            self.phase = LifecyclePhase::Terminal;
            CloseDecision::Terminal(TerminalReason::Manual)
        } else if code == close_code::NORMAL {
            self.phase = LifecyclePhase::Terminal;
            CloseDecision::Terminal(TerminalReason::NormalClosure)
        } else if self.attempts >= self.max_attempts {
            // Counter left at its maximum
            self.phase = LifecyclePhase::Terminal;
            CloseDecision::Terminal(TerminalReason::Exhausted)
        } else {
            self.attempts += 1;
            self.phase = LifecyclePhase::Reconnecting;
            CloseDecision::RetryAfter(self.retry_delay)
        }
    }

    /// Observe a successful open; returns whether this was a recovery
    pub(crate) fn observe_open(&mut self) -> bool {
        self.attempts = 0;
        let recovered = self.phase == LifecyclePhase::Reconnecting;
        self.phase = LifecyclePhase::Open;
        recovered
    }

    /// Destroy: back to initial counter values, no further retries
    pub(crate) fn reset(&mut self) {
        self.attempts = 0;
        self.manual_close = false;
        self.phase = LifecyclePhase::Terminal;
    }
}

/// Apply the connection's binary delivery mode to an inbound frame
fn apply_binary_type(frame: Frame, mode: BinaryType) -> Frame {
    match (frame, mode) {
        (Frame::Binary(data), BinaryType::Text) => {
            Frame::Text(String::from_utf8_lossy(&data).into_owned())
        }
        (frame, _) => frame,
    }
}

enum PumpStep {
    Event(TransportEvent),
    Cmd(Option<Command>),
}

/// Main controller task loop
pub(crate) async fn run_controller<T: Transport>(
    mut transport: T,
    config: SocketConfig,
    shared: Arc<SharedState>,
    dispatcher: Arc<Mutex<Dispatcher>>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: crossbeam_channel::Sender<LifecycleEvent>,
) {
    let url = config.endpoint().url().to_string();
    let mut policy = ReconnectPolicy::new(config.max_reconnect_attempts, config.reconnect_delay);
    // All handles dropped: stop polling the command channel
    let mut commands_done = false;

    'lifecycle: loop {
        shared.begin_connecting();

        // While the handshake is in flight there is no handle to act on;
        // commands can only record intent for when one materializes.
        let mut pending_close: Option<(Option<u16>, Option<String>)> = None;

        let open_result = {
            let open_fut = transport.open();
            tokio::pin!(open_fut);
            loop {
                let step = tokio::select! {
                    result = &mut open_fut => break result,
                    cmd = command_rx.recv(), if !commands_done => cmd,
                };
                match step {
                    Some(Command::Close { code, reason }) => {
                        policy.note_manual_close();
                        pending_close = Some((code, reason));
                    }
                    Some(Command::Destroy) => {
                        policy.note_manual_close();
                        pending_close = Some((None, None));
                    }
                    Some(Command::Send(_)) => {
                        debug!("Dropping send issued before the connection opened");
                    }
                    None => {
                        commands_done = true;
                        policy.note_manual_close();
                        pending_close = Some((None, None));
                    }
                }
            }
        };

        let close_event = match open_result {
            Ok(opened) => {
                shared.set_open(&opened.protocol, &opened.extensions);
                let recovered = policy.observe_open();
                shared.attempts.store(0, Ordering::Release);
                shared.reconnecting.store(false, Ordering::Release);
                info!("Connected to {}", url);

                {
                    let mut sinks = dispatcher.lock();
                    sinks.opened.dispatch(&opened);
                    if recovered {
                        info!("Connection recovered after reconnect");
                        sinks.recovered.dispatch(&());
                    }
                }
                let _ = event_tx.send(LifecycleEvent::Connected);
                if recovered {
                    let _ = event_tx.send(LifecycleEvent::Recovered);
                }

                // A close/destroy issued mid-handshake applies now that the
                // connection has materialized
                if let Some((code, reason)) = pending_close.take() {
                    shared.set_closing();
                    transport.close(code, reason).await;
                }

                // Pump the live connection until it closes
                loop {
                    let step = tokio::select! {
                        event = transport.next_event() => PumpStep::Event(event),
                        cmd = command_rx.recv(), if !commands_done => PumpStep::Cmd(cmd),
                    };
                    match step {
                        PumpStep::Event(TransportEvent::Message(frame)) => {
                            let frame = apply_binary_type(frame, shared.binary_type());
                            dispatcher.lock().message.dispatch(&frame);
                        }
                        PumpStep::Event(TransportEvent::Errored(error)) => {
                            warn!("Connection error: {}", error);
                            dispatcher.lock().errored.dispatch(&error);
                            let _ = event_tx.send(LifecycleEvent::Error(error.to_string()));
                            // A stream error ends the connection; the close
                            // that follows it is synthesized here
                            break CloseEvent::abnormal();
                        }
                        PumpStep::Event(TransportEvent::Closed(close)) => break close,
                        PumpStep::Event(TransportEvent::Opened(_)) => {
                            debug!("Ignoring unexpected opened event from a live connection");
                        }
                        PumpStep::Cmd(Some(Command::Send(frame))) => {
                            let len = frame.len() as u64;
                            match transport.send(frame).await {
                                Ok(()) => {
                                    shared.buffered.fetch_sub(len, Ordering::AcqRel);
                                }
                                Err(NexusSocketError::Transport(error)) => {
                                    warn!("Send failed: {}", error);
                                    dispatcher.lock().errored.dispatch(&error);
                                    let _ =
                                        event_tx.send(LifecycleEvent::Error(error.to_string()));
                                    break CloseEvent::abnormal();
                                }
                                Err(other) => {
                                    // Raced a close; the frame is dropped,
                                    // never queued for the next connection
                                    debug!("Send rejected: {}", other);
                                }
                            }
                        }
                        PumpStep::Cmd(Some(Command::Close { code, reason })) => {
                            policy.note_manual_close();
                            shared.set_closing();
                            transport.close(code, reason).await;
                        }
                        PumpStep::Cmd(Some(Command::Destroy)) => {
                            policy.note_manual_close();
                            shared.set_closing();
                            transport.close(None, None).await;
                        }
                        PumpStep::Cmd(None) => {
                            commands_done = true;
                            policy.note_manual_close();
                            shared.set_closing();
                            transport.close(None, None).await;
                        }
                    }
                }
            }
            Err(error) => {
                // Establishment failures surface only through notifications,
                // never as a value thrown at the caller
                warn!("Failed to connect to {}: {}", url, error);
                dispatcher.lock().errored.dispatch(&error);
                let _ = event_tx.send(LifecycleEvent::Error(error.to_string()));
                CloseEvent::abnormal()
            }
        };

        // Close observation: the old handle is gone before any retry decision
        transport.discard();
        shared.detach();
        info!(
            "Disconnected from {} (code: {}, clean: {})",
            url, close_event.code, close_event.was_clean
        );
        dispatcher.lock().closed.dispatch(&close_event);
        let _ = event_tx.send(LifecycleEvent::Disconnected {
            code: close_event.code,
            was_clean: close_event.was_clean,
        });

        match policy.evaluate_close(close_event.code) {
            CloseDecision::Terminal(reason) => {
                shared.attempts.store(policy.attempts(), Ordering::Release);
                shared.reconnecting.store(false, Ordering::Release);
                if reason == TerminalReason::Exhausted {
                    warn!(
                        "Retry budget exhausted after {} attempts, giving up",
                        policy.attempts()
                    );
                } else {
                    info!("Lifecycle terminal ({:?})", reason);
                }
                break 'lifecycle;
            }
            CloseDecision::RetryAfter(delay) => {
                shared.attempts.store(policy.attempts(), Ordering::Release);
                shared.reconnecting.store(true, Ordering::Release);
                info!(
                    "Reconnecting in {:?} (attempt {} of {})",
                    delay,
                    policy.attempts(),
                    config.max_reconnect_attempts
                );
                let _ = event_tx.send(LifecycleEvent::Reconnecting(policy.attempts()));

                // The single retry slot: one pending timer, cancelled only
                // by destroy (a user close merely records the manual flag)
                let retry = tokio::time::sleep(delay);
                tokio::pin!(retry);
                loop {
                    let step = tokio::select! {
                        _ = &mut retry => break,
                        cmd = command_rx.recv(), if !commands_done => cmd,
                    };
                    match step {
                        Some(Command::Destroy) | None => {
                            if step.is_none() {
                                commands_done = true;
                            }
                            policy.reset();
                            shared.attempts.store(0, Ordering::Release);
                            shared.reconnecting.store(false, Ordering::Release);
                            info!("Destroyed while waiting to reconnect; retry cancelled");
                            break 'lifecycle;
                        }
                        Some(Command::Close { .. }) => {
                            // No physical connection: the adapter close is a
                            // no-op, but the flag marks the next close manual
                            policy.note_manual_close();
                        }
                        Some(Command::Send(_)) => {
                            debug!("Dropping send issued with no connection");
                        }
                    }
                }
            }
        }
    }

    debug!("Lifecycle controller for {} exiting", url);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoint;
    use crate::error::TransportError;
    use crate::message::OpenEvent;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    // ---- policy state machine ----

    fn policy(max: u32) -> ReconnectPolicy {
        ReconnectPolicy::new(max, Duration::from_millis(100))
    }

    #[test]
    fn counter_increments_once_per_retryable_close() {
        let mut policy = policy(5);

        for expected in 1..=5 {
            let decision = policy.evaluate_close(close_code::ABNORMAL);
            assert_eq!(
                decision,
                CloseDecision::RetryAfter(Duration::from_millis(100))
            );
            assert_eq!(policy.attempts(), expected);
            assert!(policy.is_reconnecting());
        }

        assert_eq!(
            policy.evaluate_close(close_code::ABNORMAL),
            CloseDecision::Terminal(TerminalReason::Exhausted)
        );
        assert_eq!(policy.attempts(), 5, "counter left at its maximum");
    }

    #[test]
    fn normal_closure_never_schedules_a_retry() {
        // Regardless of the counter value
        let mut fresh = policy(5);
        assert_eq!(
            fresh.evaluate_close(close_code::NORMAL),
            CloseDecision::Terminal(TerminalReason::NormalClosure)
        );

        let mut mid_cycle = policy(5);
        mid_cycle.evaluate_close(close_code::ABNORMAL);
        mid_cycle.evaluate_close(close_code::ABNORMAL);
        assert_eq!(
            mid_cycle.evaluate_close(close_code::NORMAL),
            CloseDecision::Terminal(TerminalReason::NormalClosure)
        );
    }

    #[test]
    fn manual_close_takes_precedence_and_is_consumed() {
        let mut policy = policy(5);

        // Manual wins even over a non-1000 code
        policy.note_manual_close();
        assert_eq!(
            policy.evaluate_close(4002),
            CloseDecision::Terminal(TerminalReason::Manual)
        );

        // Consumed: the next close is evaluated on its own merits
        assert_eq!(
            policy.evaluate_close(close_code::ABNORMAL),
            CloseDecision::RetryAfter(Duration::from_millis(100))
        );
    }

    #[test]
    fn manual_close_wins_over_normal_closure() {
        let mut policy = policy(5);
        policy.note_manual_close();
        assert_eq!(
            policy.evaluate_close(close_code::NORMAL),
            CloseDecision::Terminal(TerminalReason::Manual)
        );
    }

    #[test]
    fn budget_boundary_matches_the_documented_scenario() {
        // maxReconnectAttempts = 2: closes 1 and 2 schedule retries with
        // counter 1 and 2; close 3 observes counter >= max and goes terminal
        let mut policy = policy(2);

        assert!(matches!(
            policy.evaluate_close(close_code::ABNORMAL),
            CloseDecision::RetryAfter(_)
        ));
        assert_eq!(policy.attempts(), 1);

        assert!(matches!(
            policy.evaluate_close(close_code::ABNORMAL),
            CloseDecision::RetryAfter(_)
        ));
        assert_eq!(policy.attempts(), 2);

        assert_eq!(
            policy.evaluate_close(close_code::ABNORMAL),
            CloseDecision::Terminal(TerminalReason::Exhausted)
        );
        assert_eq!(policy.attempts(), 2);
    }

    #[test]
    fn zero_budget_is_terminal_on_the_first_close() {
        let mut policy = policy(0);
        assert_eq!(
            policy.evaluate_close(close_code::ABNORMAL),
            CloseDecision::Terminal(TerminalReason::Exhausted)
        );
    }

    #[test]
    fn open_resets_the_counter_and_reports_recovery() {
        let mut policy = policy(5);

        assert!(!policy.observe_open(), "first connect is not a recovery");

        policy.evaluate_close(close_code::ABNORMAL);
        policy.evaluate_close(close_code::ABNORMAL);
        assert_eq!(policy.attempts(), 2);

        assert!(policy.observe_open(), "open after a retry is a recovery");
        assert_eq!(policy.attempts(), 0);
        assert!(!policy.is_reconnecting());
    }

    #[test]
    fn binary_mode_rewrites_only_binary_frames() {
        let text = apply_binary_type(Frame::Text("x".into()), BinaryType::Text);
        assert_eq!(text, Frame::Text("x".into()));

        let kept = apply_binary_type(Frame::Binary(vec![104, 105]), BinaryType::Bytes);
        assert_eq!(kept, Frame::Binary(vec![104, 105]));

        let decoded = apply_binary_type(Frame::Binary(vec![104, 105]), BinaryType::Text);
        assert_eq!(decoded, Frame::Text("hi".into()));
    }

    // ---- controller loop over a scripted transport ----

    /// Per-attempt behavior of the scripted transport
    enum Attempt {
        /// The handshake fails
        Fail,
        /// The handshake succeeds and the connection raises these events,
        /// then idles until closed or discarded
        Open(Vec<TransportEvent>),
    }

    struct ScriptedTransport {
        attempts: Vec<Attempt>,
        opens: Arc<AtomicUsize>,
        live: Option<VecDeque<TransportEvent>>,
    }

    impl ScriptedTransport {
        fn new(attempts: Vec<Attempt>) -> (Self, Arc<AtomicUsize>) {
            let opens = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    attempts,
                    opens: Arc::clone(&opens),
                    live: None,
                },
                opens,
            )
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn open(&mut self) -> std::result::Result<OpenEvent, TransportError> {
            self.discard();
            let index = self.opens.fetch_add(1, Ordering::AcqRel);
            match self.attempts.get(index) {
                Some(Attempt::Open(events)) => {
                    self.live = Some(events.clone().into());
                    Ok(OpenEvent::default())
                }
                Some(Attempt::Fail) | None => {
                    Err(TransportError::Handshake("connection refused".into()))
                }
            }
        }

        async fn next_event(&mut self) -> TransportEvent {
            match self.live.as_mut().and_then(VecDeque::pop_front) {
                Some(event) => event,
                None => std::future::pending().await,
            }
        }

        async fn send(&mut self, _frame: Frame) -> crate::Result<()> {
            Ok(())
        }

        async fn close(&mut self, code: Option<u16>, reason: Option<String>) {
            if let Some(live) = self.live.as_mut() {
                // The peer acknowledges the close handshake
                live.push_back(TransportEvent::Closed(CloseEvent {
                    code: code.unwrap_or(close_code::NO_STATUS),
                    reason: reason.unwrap_or_default(),
                    was_clean: true,
                }));
            }
        }

        fn discard(&mut self) {
            self.live = None;
        }

        fn has_connection(&self) -> bool {
            self.live.is_some()
        }
    }

    struct Harness {
        shared: Arc<SharedState>,
        command_tx: mpsc::UnboundedSender<Command>,
        event_rx: crossbeam_channel::Receiver<LifecycleEvent>,
        log: Arc<Mutex<Vec<String>>>,
        task: tokio::task::JoinHandle<()>,
    }

    fn spawn_harness(attempts: Vec<Attempt>, max: u32) -> (Harness, Arc<AtomicUsize>) {
        let (transport, opens) = ScriptedTransport::new(attempts);
        let config = SocketConfig {
            endpoint: Endpoint::new("ws://scripted.test", Vec::new()),
            max_reconnect_attempts: max,
            reconnect_delay: Duration::from_millis(100),
        };

        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        let push = |log: &Arc<Mutex<Vec<String>>>, tag: &'static str| {
            let log = Arc::clone(log);
            move || log.lock().push(tag.to_string())
        };
        {
            let record = push(&log, "opened:h");
            dispatcher.opened.set_handler(move |_| record());
            let record = push(&log, "opened:l");
            dispatcher.opened.add_listener(move |_| record());
            let record = push(&log, "recovered:h");
            dispatcher.recovered.set_handler(move |_| record());
            let record = push(&log, "recovered:l");
            dispatcher.recovered.add_listener(move |_| record());
            let record = push(&log, "closed:h");
            dispatcher.closed.set_handler(move |_| record());
            let record = push(&log, "errored:h");
            dispatcher.errored.set_handler(move |_| record());
        }

        let shared = Arc::new(SharedState::new(max));
        let dispatcher = Arc::new(Mutex::new(dispatcher));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();

        let task = tokio::spawn(run_controller(
            transport,
            config,
            Arc::clone(&shared),
            dispatcher,
            command_rx,
            event_tx,
        ));

        (
            Harness {
                shared,
                command_tx,
                event_rx,
                log,
                task,
            },
            opens,
        )
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..1000 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(start_paused = true)]
    async fn recovered_fires_once_after_a_successful_reconnect() {
        let (harness, opens) = spawn_harness(
            vec![
                Attempt::Open(vec![TransportEvent::Closed(CloseEvent::abnormal())]),
                Attempt::Open(Vec::new()),
            ],
            5,
        );

        let log = Arc::clone(&harness.log);
        wait_until(move || log.lock().iter().any(|entry| entry == "recovered:l")).await;

        assert_eq!(
            *harness.log.lock(),
            vec![
                "opened:h",
                "opened:l",
                "closed:h",
                "opened:h",
                "opened:l",
                "recovered:h",
                "recovered:l",
            ],
            "recovered dispatches through the two-tier order, after opened"
        );
        assert_eq!(opens.load(Ordering::Acquire), 2);
        assert_eq!(
            harness.shared.logical_ready_state(),
            crate::state::ReadyState::Open
        );

        drop(harness.command_tx);
        let _ = harness.task.await;
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_goes_silently_terminal() {
        let (harness, opens) = spawn_harness(vec![Attempt::Fail, Attempt::Fail, Attempt::Fail], 2);

        harness.task.await.expect("controller task");

        // Initial attempt plus two retries
        assert_eq!(opens.load(Ordering::Acquire), 3);
        let log = harness.log.lock();
        assert_eq!(log.iter().filter(|e| *e == "errored:h").count(), 3);
        assert_eq!(log.iter().filter(|e| *e == "closed:h").count(), 3);
        assert!(!log.iter().any(|e| e.starts_with("recovered")));
        drop(log);

        assert_eq!(
            harness.shared.logical_ready_state(),
            crate::state::ReadyState::Closed
        );
        assert!(harness.shared.budget_reached());
        assert_eq!(harness.shared.attempts.load(Ordering::Acquire), 2);

        // Exactly the two scheduled retries were announced
        let reconnecting: Vec<u32> = harness
            .event_rx
            .try_iter()
            .filter_map(|event| match event {
                LifecycleEvent::Reconnecting(attempt) => Some(attempt),
                _ => None,
            })
            .collect();
        assert_eq!(reconnecting, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_during_the_retry_wait_cancels_the_timer() {
        let (harness, opens) = spawn_harness(vec![Attempt::Fail], 5);

        let event_rx = harness.event_rx.clone();
        wait_until(move || {
            event_rx
                .try_iter()
                .any(|event| matches!(event, LifecycleEvent::Reconnecting(_)))
        })
        .await;

        harness.command_tx.send(Command::Destroy).expect("send");
        harness.task.await.expect("controller task");

        assert_eq!(opens.load(Ordering::Acquire), 1, "retry never fired");
        assert_eq!(
            harness.shared.logical_ready_state(),
            crate::state::ReadyState::Closed
        );
        assert!(!harness.shared.reconnecting.load(Ordering::Acquire));
        assert_eq!(harness.shared.attempts.load(Ordering::Acquire), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn server_side_normal_closure_is_terminal() {
        let (harness, opens) = spawn_harness(
            vec![Attempt::Open(vec![TransportEvent::Closed(CloseEvent {
                code: close_code::NORMAL,
                reason: "done".into(),
                was_clean: true,
            })])],
            5,
        );

        harness.task.await.expect("controller task");

        assert_eq!(opens.load(Ordering::Acquire), 1);
        assert_eq!(
            harness.shared.logical_ready_state(),
            crate::state::ReadyState::Closed
        );
        assert!(!harness.shared.budget_reached());
    }

    #[tokio::test(start_paused = true)]
    async fn stream_error_is_followed_by_a_synthesized_close() {
        let (harness, _opens) = spawn_harness(
            vec![
                Attempt::Open(vec![TransportEvent::Errored(TransportError::WebSocket(
                    "reset by peer".into(),
                ))]),
                Attempt::Open(Vec::new()),
            ],
            5,
        );

        let log = Arc::clone(&harness.log);
        wait_until(move || log.lock().iter().any(|entry| entry == "recovered:l")).await;

        let log = harness.log.lock();
        let errored = log.iter().position(|e| e == "errored:h").expect("errored");
        let closed = log.iter().position(|e| e == "closed:h").expect("closed");
        assert!(errored < closed, "errored precedes the synthesized close");

        drop(log);
        drop(harness.command_tx);
        let _ = harness.task.await;
    }
}
