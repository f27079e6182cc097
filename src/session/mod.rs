//! Session management: the per-connection task, its timer regime and the
//! caller-facing [`Session`] handle.
//!
//! Each session runs as one cooperative task multiplexing, through a single
//! `select`, four event sources: transport reads, caller submissions (gated
//! on the send window), timer deadlines and cancellation. Session state is
//! owned exclusively by the task; the handle talks to it over channels.

mod params;
mod state;

pub use params::{
    AckPolicy, SessionParameters, DEFAULT_K, DEFAULT_T0, DEFAULT_T1, DEFAULT_T2, DEFAULT_T3,
    DEFAULT_W,
};
pub use state::{seq_distance, seq_in_range, seq_next, ReceiveWindow, SendWindow, SessionRole, SessionState};

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::codec::{Apdu, ApduCodec};
use crate::error::{Error, Result};
use crate::policy::{FrameKind, FrameMeta, SecurityPolicy};
use crate::registry::TypeRegistry;
use crate::types::{Apci, Asdu, UFunction};

/// Events delivered by [`Session::receive`].
#[derive(Debug)]
pub enum SessionEvent {
    /// A decoded ASDU arrived
    Asdu(Asdu),
    /// An ASDU with no registered type handler arrived; the session continues
    Unhandled {
        /// Raw type identifier
        type_id: u8,
        /// Complete raw ASDU bytes
        body: Bytes,
    },
    /// The session reached its terminal state.
    ///
    /// `error` is `None` after a clean STOPDT exchange or a peer close that
    /// followed one.
    Terminated {
        /// The fatal condition, if the stop was not clean
        error: Option<Error>,
    },
}

enum Control {
    StartDt(oneshot::Sender<Result<()>>),
    StopDt(oneshot::Sender<Result<()>>),
}

struct Submission {
    asdu: Asdu,
    done: oneshot::Sender<Result<()>>,
}

/// Handle to a running session.
///
/// Dropping the handle does not stop the task; call [`Session::close`] or
/// [`Session::abort`].
#[derive(Debug)]
pub struct Session {
    data_tx: mpsc::Sender<Submission>,
    ctrl_tx: mpsc::Sender<Control>,
    events_rx: mpsc::Receiver<SessionEvent>,
    state_rx: watch::Receiver<SessionState>,
    cancel: CancellationToken,
}

impl Session {
    /// Spawn a session task over an established transport stream.
    ///
    /// This is the transport seam: TCP, TLS or an in-memory pipe all work,
    /// as long as the stream is a bidirectional byte channel. Client-role
    /// sessions still need [`Session::start_data_transfer`] before data
    /// flows; server-role sessions answer the peer's STARTDT.
    pub fn establish<S>(
        stream: S,
        peer: Option<SocketAddr>,
        role: SessionRole,
        params: SessionParameters,
        registry: Arc<TypeRegistry>,
        policy: Arc<dyn SecurityPolicy>,
    ) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        params.validate()?;

        let (data_tx, data_rx) = mpsc::channel(1);
        let (ctrl_tx, ctrl_rx) = mpsc::channel(4);
        let (events_tx, events_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(SessionState::Connecting);
        let cancel = CancellationToken::new();
        let t0 = params.t0;

        let task = SessionTask {
            framed: Framed::new(stream, ApduCodec::with_max_buffer(params.max_buffer)),
            peer,
            role,
            params,
            registry,
            policy,
            send_window: SendWindow::new(),
            recv_window: ReceiveWindow::new(),
            state_tx,
            events_tx,
            data_rx,
            ctrl_rx,
            cancel: cancel.clone(),
            t0_deadline: Some(Instant::now() + t0),
            u_deadline: None,
            t2_deadline: None,
            t3_deadline: None,
            pending_start: None,
            pending_stop: None,
            test_pending: false,
            stop_requested: false,
            stopdt_sent: false,
        };
        tokio::spawn(task.run());

        Ok(Self { data_tx, ctrl_tx, events_rx, state_rx, cancel })
    }

    /// Submit an ASDU for transmission.
    ///
    /// Suspends while the send window is full; completes once the frame is
    /// window-admitted and written to the transport.
    pub async fn submit(&self, asdu: Asdu) -> Result<()> {
        let (done, confirmed) = oneshot::channel();
        self.data_tx
            .send(Submission { asdu, done })
            .await
            .map_err(|_| Error::SessionClosed)?;
        confirmed.await.map_err(|_| Error::SessionClosed)?
    }

    /// Receive the next ASDU or the terminal event.
    pub async fn receive(&mut self) -> SessionEvent {
        match self.events_rx.recv().await {
            Some(event) => event,
            None => SessionEvent::Terminated { error: None },
        }
    }

    /// Run the STARTDT handshake (client role).
    pub async fn start_data_transfer(&self) -> Result<()> {
        let (done, confirmed) = oneshot::channel();
        self.ctrl_tx.send(Control::StartDt(done)).await.map_err(|_| Error::SessionClosed)?;
        confirmed.await.map_err(|_| Error::SessionClosed)?
    }

    /// Run the STOPDT handshake and terminate the session.
    ///
    /// Frames already admitted to the send window are acknowledged or timed
    /// out before the transport closes.
    pub async fn stop_data_transfer(&self) -> Result<()> {
        let (done, confirmed) = oneshot::channel();
        self.ctrl_tx.send(Control::StopDt(done)).await.map_err(|_| Error::SessionClosed)?;
        confirmed.await.map_err(|_| Error::SessionClosed)?
    }

    /// Graceful shutdown: STOPDT handshake bounded by T1, then close.
    ///
    /// A fatal condition that interrupts the shutdown (for example T1
    /// expiring while the send window drains) is returned here.
    pub async fn close(mut self) -> Result<()> {
        match self.stop_data_transfer().await {
            // a session that already terminated surfaced its error through
            // the event stream; closing it again is not a failure
            Ok(()) | Err(Error::SessionClosed) => {}
            Err(err) => return Err(err),
        }
        // wait for the task to report terminal state
        while self.state_rx.changed().await.is_ok() {
            if *self.state_rx.borrow() == SessionState::Stopped {
                break;
            }
        }
        Ok(())
    }

    /// Hard abort: close the transport immediately.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Watch channel observing lifecycle transitions.
    pub fn state_watch(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }
}

enum TimerKind {
    T0,
    T1,
    T2,
    T3,
}

struct SessionTask<S> {
    framed: Framed<S, ApduCodec>,
    peer: Option<SocketAddr>,
    role: SessionRole,
    params: SessionParameters,
    registry: Arc<TypeRegistry>,
    policy: Arc<dyn SecurityPolicy>,
    send_window: SendWindow,
    recv_window: ReceiveWindow,
    state_tx: watch::Sender<SessionState>,
    events_tx: mpsc::Sender<SessionEvent>,
    data_rx: mpsc::Receiver<Submission>,
    ctrl_rx: mpsc::Receiver<Control>,
    cancel: CancellationToken,
    /// T0 deadline bounding the CONNECTING phase
    t0_deadline: Option<Instant>,
    /// T1 deadline for a pending STARTDT/STOPDT/TESTFR confirmation
    u_deadline: Option<Instant>,
    /// T2 ack-delay deadline (delayed ack policy only)
    t2_deadline: Option<Instant>,
    /// T3 idle deadline
    t3_deadline: Option<Instant>,
    pending_start: Option<oneshot::Sender<Result<()>>>,
    pending_stop: Option<oneshot::Sender<Result<()>>>,
    test_pending: bool,
    /// Graceful stop requested; drain the send window, then STOPDT
    stop_requested: bool,
    stopdt_sent: bool,
}

impl<S> SessionTask<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn run(mut self) {
        let result = self.drive().await;
        let error = match result {
            Ok(()) => None,
            Err(err) => {
                warn!(role = ?self.role, peer = ?self.peer, error = %err, "session failed");
                Some(err)
            }
        };
        self.state_tx.send_replace(SessionState::Stopped);
        let _ = self.framed.close().await;

        // a handshake that was cut short learns the real terminal condition,
        // not a generic closed-session error
        if let Some(done) = self.pending_start.take() {
            let _ = done.send(match &error {
                Some(err) => Err(err.duplicate()),
                None => Err(Error::SessionClosed),
            });
        }
        if let Some(done) = self.pending_stop.take() {
            let _ = done.send(match &error {
                Some(err) => Err(err.duplicate()),
                None => Ok(()),
            });
        }
        self.data_rx.close();
        while let Ok(submission) = self.data_rx.try_recv() {
            let _ = submission.done.send(Err(Error::SessionClosed));
        }
        let _ = self.events_tx.send(SessionEvent::Terminated { error }).await;
        debug!(role = ?self.role, peer = ?self.peer, "session stopped");
    }

    async fn drive(&mut self) -> Result<()> {
        loop {
            // graceful stop waits for the window to drain before STOPDT
            if self.stop_requested && !self.stopdt_sent && self.send_window.is_empty() {
                self.send_u_frame(UFunction::StopDtAct).await?;
                self.arm_u_deadline();
                self.stopdt_sent = true;
            }

            let can_send_data = self.state() == SessionState::Running
                && !self.stop_requested
                && self.send_window.has_capacity(self.params.k);
            let next_timer = self.next_deadline();
            let timer_deadline =
                next_timer.as_ref().map(|(_, at)| *at).unwrap_or_else(Instant::now);

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    return Err(Error::Aborted);
                }

                Some(control) = self.ctrl_rx.recv() => {
                    if self.handle_control(control).await? {
                        return Ok(());
                    }
                }

                frame = self.framed.next() => {
                    match frame {
                        Some(Ok(apdu)) => {
                            if self.handle_frame(apdu).await? {
                                return Ok(());
                            }
                        }
                        Some(Err(err)) => return Err(err),
                        None => return Err(Error::TransportClosed),
                    }
                }

                Some(submission) = self.data_rx.recv(), if can_send_data => {
                    self.handle_submission(submission).await?;
                }

                _ = tokio::time::sleep_until(timer_deadline), if next_timer.is_some() => {
                    if let Some((kind, _)) = next_timer {
                        self.handle_timer(kind).await?;
                    }
                }
            }
        }
    }

    fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: SessionState) {
        let old = self.state();
        if old != state {
            debug!(role = ?self.role, peer = ?self.peer, ?old, new = ?state, "state change");
            self.state_tx.send_replace(state);
        }
    }

    fn now_plus(&self, duration: std::time::Duration) -> Instant {
        Instant::now() + duration
    }

    fn arm_u_deadline(&mut self) {
        self.u_deadline = Some(self.now_plus(self.params.t1));
    }

    fn clear_u_deadline_if_idle(&mut self) {
        if self.pending_start.is_none() && self.pending_stop.is_none() && !self.test_pending {
            self.u_deadline = None;
        }
    }

    fn arm_t3(&mut self) {
        self.t3_deadline = Some(self.now_plus(self.params.t3));
    }

    /// Earliest armed deadline: T1 covers both the oldest unacked I-frame
    /// and any pending U-frame confirmation.
    fn next_deadline(&self) -> Option<(TimerKind, Instant)> {
        let t1 = match (self.send_window.oldest_deadline(), self.u_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let mut next: Option<(TimerKind, Instant)> = t1.map(|at| (TimerKind::T1, at));
        if let Some(at) = self.t0_deadline {
            if next.as_ref().map_or(true, |(_, current)| at < *current) {
                next = Some((TimerKind::T0, at));
            }
        }
        if let Some(at) = self.t2_deadline {
            if next.as_ref().map_or(true, |(_, current)| at < *current) {
                next = Some((TimerKind::T2, at));
            }
        }
        if let Some(at) = self.t3_deadline {
            if next.as_ref().map_or(true, |(_, current)| at < *current) {
                next = Some((TimerKind::T3, at));
            }
        }
        next
    }

    /// Handle one control command. Returns `true` when the session should
    /// finish cleanly (stop of a session that never entered data transfer).
    async fn handle_control(&mut self, control: Control) -> Result<bool> {
        match control {
            Control::StartDt(done) => match (self.role, self.state()) {
                (SessionRole::Client, SessionState::Connecting) => {
                    self.send_u_frame(UFunction::StartDtAct).await?;
                    self.arm_u_deadline();
                    self.pending_start = Some(done);
                }
                (_, SessionState::Running) => {
                    let _ = done.send(Ok(()));
                }
                (SessionRole::Server, _) => {
                    let _ = done.send(Err(Error::protocol_static(
                        "controlled station awaits STARTDT from the peer",
                    )));
                }
                _ => {
                    let _ = done.send(Err(Error::SessionClosed));
                }
            },
            Control::StopDt(done) => {
                if self.state() != SessionState::Running {
                    // nothing to stop; close the transport cleanly
                    let _ = done.send(Ok(()));
                    return Ok(true);
                }
                self.stop_requested = true;
                self.pending_stop = Some(done);
            }
        }
        Ok(false)
    }

    async fn handle_submission(&mut self, submission: Submission) -> Result<()> {
        let Submission { asdu, done } = submission;
        let encoded = match self.registry.encode_asdu(&asdu) {
            Ok(buf) => buf.freeze(),
            Err(err) => {
                // the submitter's problem, not the session's
                let _ = done.send(Err(err));
                return Ok(());
            }
        };
        let deadline = self.now_plus(self.params.t1);
        let ns = self.send_window.admit(self.params.k, encoded.clone(), deadline)?;
        let apdu = Apdu::i_frame(ns, self.recv_window.v_r(), encoded);
        self.framed.send(apdu).await?;
        // the I-frame piggybacks the acknowledgement
        self.recv_window.mark_acknowledged();
        self.t2_deadline = None;
        let _ = done.send(Ok(()));
        Ok(())
    }

    /// Handle one inbound frame. Returns `true` when the session finished
    /// cleanly (STOPDT exchange complete).
    async fn handle_frame(&mut self, apdu: Apdu) -> Result<bool> {
        let meta = FrameMeta {
            peer: self.peer,
            kind: match apdu.apci {
                Apci::IFrame { .. } => FrameKind::I,
                Apci::SFrame { .. } => FrameKind::S,
                Apci::UFrame { .. } => FrameKind::U,
            },
            type_id: apdu.asdu.as_ref().and_then(|body| body.first().copied()),
            length: 6 + apdu.asdu.as_ref().map_or(0, Bytes::len),
        };
        if !self.policy.allow_frame(&meta) {
            return Err(Error::policy_static("frame rejected by security policy"));
        }

        // any received frame resets the idle probe
        if self.state() == SessionState::Running {
            self.arm_t3();
        }

        match apdu.apci {
            Apci::IFrame { send_seq, recv_seq } => {
                if self.state() != SessionState::Running {
                    return Err(Error::protocol_static("I-frame outside data transfer"));
                }
                self.send_window.acknowledge(recv_seq)?;
                self.recv_window.accept(send_seq)?;

                let body = apdu.asdu.as_deref().unwrap_or_default();
                match self.registry.decode_asdu(body) {
                    Ok(asdu) => {
                        let _ = self.events_tx.send(SessionEvent::Asdu(asdu)).await;
                    }
                    Err(Error::UnhandledType { type_id, body }) => {
                        debug!(role = ?self.role, type_id, "unhandled ASDU type");
                        let _ =
                            self.events_tx.send(SessionEvent::Unhandled { type_id, body }).await;
                    }
                    Err(err) => return Err(err),
                }

                self.schedule_ack().await?;
            }
            Apci::SFrame { recv_seq } => {
                self.send_window.acknowledge(recv_seq)?;
            }
            Apci::UFrame { function } => return self.handle_u_frame(function).await,
        }
        Ok(false)
    }

    async fn schedule_ack(&mut self) -> Result<()> {
        match self.params.ack_policy {
            AckPolicy::Immediate => self.send_ack().await,
            AckPolicy::Delayed => {
                if self.recv_window.at_threshold(self.params.w) {
                    self.send_ack().await
                } else {
                    if self.t2_deadline.is_none() {
                        self.t2_deadline = Some(self.now_plus(self.params.t2));
                    }
                    Ok(())
                }
            }
        }
    }

    async fn send_ack(&mut self) -> Result<()> {
        if self.recv_window.unacked_rx() > 0 {
            self.framed.send(Apdu::s_frame(self.recv_window.v_r())).await?;
            self.recv_window.mark_acknowledged();
        }
        self.t2_deadline = None;
        Ok(())
    }

    async fn handle_u_frame(&mut self, function: UFunction) -> Result<bool> {
        match function {
            UFunction::StartDtAct => {
                if self.role != SessionRole::Server {
                    return Err(Error::protocol_static("STARTDT act received by client"));
                }
                self.send_u_frame(UFunction::StartDtCon).await?;
                self.set_state(SessionState::Running);
                self.t0_deadline = None;
                self.arm_t3();
            }
            UFunction::StartDtCon => {
                let done = self
                    .pending_start
                    .take()
                    .ok_or(Error::protocol_static("unexpected STARTDT con"))?;
                self.set_state(SessionState::Running);
                self.t0_deadline = None;
                self.arm_t3();
                self.clear_u_deadline_if_idle();
                let _ = done.send(Ok(()));
            }
            UFunction::StopDtAct => {
                // drain the acknowledgement obligation, confirm, close
                self.send_ack().await?;
                self.send_u_frame(UFunction::StopDtCon).await?;
                debug!(role = ?self.role, peer = ?self.peer, "peer stopped data transfer");
                return Ok(true);
            }
            UFunction::StopDtCon => {
                let done = self
                    .pending_stop
                    .take()
                    .ok_or(Error::protocol_static("unexpected STOPDT con"))?;
                self.clear_u_deadline_if_idle();
                let _ = done.send(Ok(()));
                return Ok(true);
            }
            UFunction::TestFrAct => {
                self.send_u_frame(UFunction::TestFrCon).await?;
            }
            UFunction::TestFrCon => {
                if self.test_pending {
                    self.test_pending = false;
                    self.clear_u_deadline_if_idle();
                }
            }
        }
        Ok(false)
    }

    async fn handle_timer(&mut self, kind: TimerKind) -> Result<()> {
        match kind {
            TimerKind::T0 => {
                debug!(role = ?self.role, peer = ?self.peer, "t0 expired");
                Err(Error::T0Timeout)
            }
            TimerKind::T1 => {
                debug!(role = ?self.role, peer = ?self.peer, "t1 expired");
                Err(Error::T1Timeout)
            }
            TimerKind::T2 => self.send_ack().await,
            TimerKind::T3 => {
                self.t3_deadline = None;
                // an outstanding probe is already guarded by T1
                if !self.test_pending {
                    self.send_u_frame(UFunction::TestFrAct).await?;
                    self.test_pending = true;
                    self.arm_u_deadline();
                }
                Ok(())
            }
        }
    }

    async fn send_u_frame(&mut self, function: UFunction) -> Result<()> {
        self.framed.send(Apdu::u_frame(function)).await?;
        Ok(())
    }
}
