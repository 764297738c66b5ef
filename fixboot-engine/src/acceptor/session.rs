/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Per-connection session responder.
//!
//! Answers the administrative conversation (Logon, Heartbeat, TestRequest,
//! Logout) and hands application messages to the [`Application`]. Resend
//! requests are answered with a SequenceReset instead of a replay.

use crate::application::Application;
use crate::log::Log;
use crate::message_factory::MessageFactory;
use bytes::BytesMut;
use fixboot_core::codec::FixCodec;
use fixboot_core::error::SessionError;
use fixboot_core::message::{Message, MsgType, SOH, tags};
use fixboot_core::session_id::SessionId;
use fixboot_store::MessageStore;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

/// How often the heartbeat timers are checked.
const TIMER_RESOLUTION: Duration = Duration::from_millis(500);

/// Largest HeartBtInt, in seconds, a counterparty may request.
pub(crate) const MAX_HEART_BT_INT: u64 = 3600;

/// Stop request: `Some(force)` once the acceptor is stopping.
pub(crate) type StopSignal = watch::Receiver<Option<bool>>;

/// Configured state of one session, shared by all of its connections.
pub(crate) struct SessionContext {
    pub(crate) id: SessionId,
    pub(crate) store: Arc<dyn MessageStore>,
    pub(crate) log: Arc<dyn Log>,
    pub(crate) heartbeat_interval: u64,
    pub(crate) reset_on_logon: bool,
    pub(crate) validate_checksum: bool,
    pub(crate) logged_on: AtomicBool,
}

/// Exclusive logged-on claim on a session, released on drop.
///
/// The claim is released however the connection ends, including when its
/// task panics or is cancelled.
struct LogonClaim {
    ctx: Arc<SessionContext>,
}

impl LogonClaim {
    /// Claims `ctx`, or returns `None` when another connection holds it.
    fn acquire(ctx: &Arc<SessionContext>) -> Option<Self> {
        ctx.logged_on
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                ctx: Arc::clone(ctx),
            })
    }
}

impl Drop for LogonClaim {
    fn drop(&mut self) {
        self.ctx.logged_on.store(false, Ordering::SeqCst);
    }
}

/// Everything a connection needs from its acceptor.
pub(crate) struct Shared {
    pub(crate) application: Arc<dyn Application>,
    pub(crate) message_factory: Arc<dyn MessageFactory>,
    pub(crate) sessions: BTreeMap<SessionId, Arc<SessionContext>>,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

enum Event {
    Read(std::io::Result<usize>),
    Stop,
    Tick,
}

struct Connection {
    // Declared first so the claim is released before the socket closes.
    claim: Option<LogonClaim>,
    stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<Shared>,
    codec: FixCodec,
    buf: BytesMut,
    session: Option<Arc<SessionContext>>,
    heartbeat: Duration,
    last_received: Instant,
    last_sent: Instant,
    test_request_sent: bool,
}

/// Serves one accepted TCP connection until it closes or the acceptor stops.
pub(crate) async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    candidates: Arc<[SessionId]>,
    shared: Arc<Shared>,
    mut stop: StopSignal,
) {
    // Until the logon names a session, validate unless every candidate opts out.
    let validate = candidates
        .iter()
        .filter_map(|id| shared.sessions.get(id))
        .any(|ctx| ctx.validate_checksum);
    let codec = FixCodec::new().with_checksum_validation(validate);
    let mut conn = Connection {
        claim: None,
        stream,
        peer,
        shared,
        codec,
        buf: BytesMut::with_capacity(4096),
        session: None,
        heartbeat: Duration::ZERO,
        last_received: Instant::now(),
        last_sent: Instant::now(),
        test_request_sent: false,
    };

    if let Err(err) = conn.run(&candidates, &mut stop).await {
        match &conn.session {
            Some(ctx) => ctx.log.on_error_event(&err.to_string()),
            None => warn!(peer = %conn.peer, %err, "connection failed before logon"),
        }
    }
    conn.close().await;
}

impl Connection {
    async fn run(
        &mut self,
        candidates: &[SessionId],
        stop: &mut StopSignal,
    ) -> Result<(), SessionError> {
        loop {
            while let Some(frame) = self.codec.decode(&mut self.buf)? {
                if self.handle_frame(&frame, candidates).await? == Flow::Close {
                    return Ok(());
                }
            }

            let event = tokio::select! {
                read = self.stream.read_buf(&mut self.buf) => Event::Read(read),
                _ = stop.changed() => Event::Stop,
                () = tokio::time::sleep(TIMER_RESOLUTION) => Event::Tick,
            };

            match event {
                Event::Read(read) => {
                    if read? == 0 {
                        debug!(peer = %self.peer, "peer closed connection");
                        return Ok(());
                    }
                    self.last_received = Instant::now();
                    self.test_request_sent = false;
                }
                Event::Stop => {
                    let force = (*stop.borrow()).unwrap_or(true);
                    if !force && self.claim.is_some() {
                        self.send_logout(Some("Acceptor stopping")).await?;
                    }
                    return Ok(());
                }
                Event::Tick => {
                    if self.check_timers().await? == Flow::Close {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn handle_frame(
        &mut self,
        frame: &[u8],
        candidates: &[SessionId],
    ) -> Result<Flow, SessionError> {
        let message = match Message::parse(frame) {
            Ok(message) => message,
            Err(err) => {
                match &self.session {
                    Some(ctx) => ctx.log.on_error_event(&format!("garbled message: {err}")),
                    None => warn!(peer = %self.peer, %err, "garbled message"),
                }
                return Ok(Flow::Continue);
            }
        };

        let ctx = match &self.session {
            Some(ctx) => Arc::clone(ctx),
            None => {
                if *message.msg_type() != MsgType::Logon {
                    warn!(
                        peer = %self.peer,
                        msg_type = %message.msg_type(),
                        "first message is not a logon, disconnecting"
                    );
                    return Ok(Flow::Close);
                }
                let Some(ctx) = self.identify(&message, candidates) else {
                    warn!(peer = %self.peer, "logon for unknown session, disconnecting");
                    return Ok(Flow::Close);
                };
                if ctx.logged_on.load(Ordering::SeqCst) {
                    ctx.log
                        .on_error_event(&format!("session already logged on, refusing {}", self.peer));
                    return Ok(Flow::Close);
                }
                self.codec = FixCodec::new().with_checksum_validation(ctx.validate_checksum);
                self.session = Some(Arc::clone(&ctx));
                ctx
            }
        };

        ctx.log.on_incoming(&render(frame));

        let Some(seq) = message.get_u64(tags::MSG_SEQ_NUM) else {
            ctx.log.on_error_event("message without MsgSeqNum");
            self.send_logout(Some("MsgSeqNum missing")).await?;
            return Ok(Flow::Close);
        };

        let is_logon = *message.msg_type() == MsgType::Logon;
        let reset_requested =
            is_logon && (message.get(tags::RESET_SEQ_NUM_FLAG) == Some("Y") || ctx.reset_on_logon);
        if reset_requested {
            ctx.log.on_event("resetting sequence numbers on logon");
            if let Err(err) = ctx.store.reset().await {
                ctx.log.on_error_event(&err.to_string());
            }
        }

        let expected = ctx.store.next_target_seq();
        if seq < expected {
            let text = format!("MsgSeqNum too low, expecting {expected} but received {seq}");
            ctx.log.on_error_event(&text);
            self.send_logout(Some(&text)).await?;
            return Ok(Flow::Close);
        }
        if seq > expected {
            ctx.log.on_event(&format!(
                "MsgSeqNum too high, expecting {expected} but received {seq}"
            ));
        }
        let Some(next) = seq.checked_add(1) else {
            ctx.log.on_error_event(&format!("MsgSeqNum {seq} out of range"));
            self.send_logout(Some("MsgSeqNum out of range")).await?;
            return Ok(Flow::Close);
        };
        ctx.store.set_next_target_seq(next);

        match message.msg_type() {
            MsgType::Logon => self.on_logon(&ctx, &message, reset_requested).await,
            MsgType::App(_) => {
                if let Err(reason) = self.shared.application.from_app(&message, &ctx.id).await {
                    let mut reject = self.new_message(&ctx, MsgType::Reject);
                    reject.set_u64(tags::REF_SEQ_NUM, seq);
                    reject.set(tags::REF_MSG_TYPE, message.msg_type().as_str());
                    reject.set_u64(tags::SESSION_REJECT_REASON, u64::from(reason.code));
                    if let Some(tag) = reason.ref_tag {
                        reject.set_u64(tags::REF_TAG_ID, u64::from(tag));
                    }
                    reject.set(tags::TEXT, reason.text);
                    self.send(&ctx, reject).await?;
                }
                Ok(Flow::Continue)
            }
            admin => {
                let admin = admin.clone();
                if let Err(reason) = self.shared.application.from_admin(&message, &ctx.id).await {
                    ctx.log
                        .on_event(&format!("admin message {admin} rejected: {}", reason.text));
                }
                self.on_admin(&ctx, &admin, &message).await
            }
        }
    }

    fn identify(&self, logon: &Message, candidates: &[SessionId]) -> Option<Arc<SessionContext>> {
        let sender = logon.get(tags::SENDER_COMP_ID)?;
        let target = logon.get(tags::TARGET_COMP_ID)?;
        let local = SessionId::new(logon.begin_string(), target, sender);
        candidates
            .iter()
            .find(|id| id.matches_ignoring_qualifier(&local))
            .and_then(|id| self.shared.sessions.get(id))
            .cloned()
    }

    async fn on_logon(
        &mut self,
        ctx: &Arc<SessionContext>,
        logon: &Message,
        reset: bool,
    ) -> Result<Flow, SessionError> {
        let heartbeat = logon
            .get_u64(tags::HEART_BT_INT)
            .unwrap_or(ctx.heartbeat_interval);
        if heartbeat > MAX_HEART_BT_INT {
            let text = format!("HeartBtInt {heartbeat} out of range, at most {MAX_HEART_BT_INT}");
            ctx.log.on_error_event(&text);
            self.send_logout(Some(&text)).await?;
            return Ok(Flow::Close);
        }
        if let Err(reason) = self.shared.application.from_admin(logon, &ctx.id).await {
            ctx.log.on_event(&format!("logon rejected: {}", reason.text));
            self.send_logout(Some(&reason.text)).await?;
            return Ok(Flow::Close);
        }
        let Some(claim) = LogonClaim::acquire(ctx) else {
            ctx.log.on_error_event("session logged on from another connection");
            return Ok(Flow::Close);
        };
        self.claim = Some(claim);
        self.heartbeat = Duration::from_secs(heartbeat);
        ctx.log.on_event("Received logon");

        let mut reply = self.new_message(ctx, MsgType::Logon);
        reply.set(tags::ENCRYPT_METHOD, "0");
        reply.set_u64(tags::HEART_BT_INT, heartbeat);
        if reset {
            reply.set(tags::RESET_SEQ_NUM_FLAG, "Y");
        }
        self.send(ctx, reply).await?;
        ctx.log.on_event("Responding to logon");

        self.shared.application.on_logon(&ctx.id).await;
        Ok(Flow::Continue)
    }

    async fn on_admin(
        &mut self,
        ctx: &Arc<SessionContext>,
        msg_type: &MsgType,
        message: &Message,
    ) -> Result<Flow, SessionError> {
        match msg_type {
            MsgType::TestRequest => {
                let mut heartbeat = self.new_message(ctx, MsgType::Heartbeat);
                if let Some(id) = message.get(tags::TEST_REQ_ID) {
                    heartbeat.set(tags::TEST_REQ_ID, id);
                }
                self.send(ctx, heartbeat).await?;
            }
            MsgType::Logout => {
                ctx.log.on_event("Received logout request");
                self.send_logout(None).await?;
                ctx.log.on_event("Sent logout response");
                return Ok(Flow::Close);
            }
            MsgType::ResendRequest => {
                let new_seq = ctx.store.next_sender_seq() + 1;
                ctx.log.on_event(&format!(
                    "resend requested for {}..{}, answering with sequence reset to {new_seq}",
                    message.get(tags::BEGIN_SEQ_NO).unwrap_or("?"),
                    message.get(tags::END_SEQ_NO).unwrap_or("?"),
                ));
                let mut reset = self.new_message(ctx, MsgType::SequenceReset);
                reset.set_u64(tags::NEW_SEQ_NO, new_seq);
                self.send(ctx, reset).await?;
            }
            MsgType::SequenceReset => {
                if let Some(new_seq) = message.get_u64(tags::NEW_SEQ_NO) {
                    ctx.log
                        .on_event(&format!("sequence reset received, next expected {new_seq}"));
                    ctx.store.set_next_target_seq(new_seq);
                }
            }
            MsgType::Reject => {
                ctx.log.on_event(&format!(
                    "counterparty rejected message {}: {}",
                    message.get(tags::REF_SEQ_NUM).unwrap_or("?"),
                    message.get(tags::TEXT).unwrap_or("")
                ));
            }
            MsgType::Heartbeat | MsgType::Logon | MsgType::App(_) => {}
        }
        Ok(Flow::Continue)
    }

    async fn check_timers(&mut self) -> Result<Flow, SessionError> {
        let Some(ctx) = self.session.clone() else {
            return Ok(Flow::Continue);
        };
        if self.claim.is_none() || self.heartbeat.is_zero() {
            return Ok(Flow::Continue);
        }

        if self.last_sent.elapsed() >= self.heartbeat {
            let heartbeat = self.new_message(&ctx, MsgType::Heartbeat);
            self.send(&ctx, heartbeat).await?;
        }

        let silent = self.last_received.elapsed();
        if silent >= self.heartbeat.saturating_mul(3) {
            ctx.log.on_error_event("Timed out waiting for heartbeat");
            return Ok(Flow::Close);
        }
        if silent >= self.heartbeat.saturating_mul(2) && !self.test_request_sent {
            let mut test_request = self.new_message(&ctx, MsgType::TestRequest);
            test_request.set(tags::TEST_REQ_ID, "TEST");
            self.send(&ctx, test_request).await?;
            self.test_request_sent = true;
        }
        Ok(Flow::Continue)
    }

    fn new_message(&self, ctx: &SessionContext, msg_type: MsgType) -> Message {
        self.shared
            .message_factory
            .create(&ctx.id.begin_string, msg_type)
    }

    async fn send_logout(&mut self, text: Option<&str>) -> Result<(), SessionError> {
        let Some(ctx) = self.session.clone() else {
            return Ok(());
        };
        let mut logout = self.new_message(&ctx, MsgType::Logout);
        if let Some(text) = text {
            logout.set(tags::TEXT, text);
        }
        self.send(&ctx, logout).await
    }

    async fn send(&mut self, ctx: &SessionContext, mut message: Message) -> Result<(), SessionError> {
        if message.msg_type().is_admin() {
            self.shared.application.to_admin(&mut message, &ctx.id).await;
        } else {
            self.shared.application.to_app(&mut message, &ctx.id).await;
        }

        let seq = ctx.store.incr_next_sender_seq();
        message.stamp_header(
            &ctx.id.sender_comp_id,
            &ctx.id.target_comp_id,
            seq,
            &sending_time(),
        );
        let encoded = message.encode();
        if let Err(err) = ctx.store.store(seq, &encoded).await {
            ctx.log.on_error_event(&err.to_string());
        }
        ctx.log.on_outgoing(&render(&encoded));

        self.stream.write_all(&encoded).await?;
        self.last_sent = Instant::now();
        Ok(())
    }

    async fn close(&mut self) {
        self.session = None;
        if let Some(claim) = self.claim.take() {
            let ctx = Arc::clone(&claim.ctx);
            drop(claim);
            ctx.log.on_event("Disconnecting");
            self.shared.application.on_logout(&ctx.id).await;
        }
        if let Err(err) = self.stream.shutdown().await {
            debug!(peer = %self.peer, %err, "socket shutdown failed");
        }
    }
}

/// Renders a frame for logs with `|` in place of SOH.
fn render(frame: &[u8]) -> String {
    String::from_utf8_lossy(frame).replace(SOH as char, "|")
}

/// Current UTC time in SendingTime format.
fn sending_time() -> String {
    chrono::Utc::now().format("%Y%m%d-%H:%M:%S%.3f").to_string()
}
