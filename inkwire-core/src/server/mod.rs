//! Device transfer server
//!
//! Owns the link, the panel, the status indicator and the one frame buffer,
//! and runs the session protocol over them:
//!
//! ```text
//! Boot ─▶ SignalReady ─▶ WaitQuery ─CAN_SEND/YES─▶ Receiving ─full─▶ Refresh
//!                           ▲   ▲                       │                │
//!                           │   └──────── ERR:* ────────┘                │
//!                           └──────────── DONE | ERR_DISP:* ─────────────┘
//! ```
//!
//! Recoverable failures answer with a specific error line and return to
//! `WaitQuery`. Only a link that can no longer be read or written is fatal.

pub mod framebuffer;
pub mod session;

pub use framebuffer::{AllocationError, FrameAllocator, Framebuffer, HeapAllocator};
pub use session::{Session, SessionError};

use embedded_hal::delay::DelayNs;
use inkwire_hal::{Indicator, Link};
use inkwire_protocol::{LinePoll, LineReader, Reply, Request, FRAME_SIZE};

use crate::config::ServerConfig;
use crate::poll::Backoff;
use crate::state::{Event, ServerState};
use crate::traits::{PanelDriver, PanelError};

/// Unclassified failure; the server stops serving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// The link could not be read
    LinkRead,
    /// A reply could not be written
    LinkWrite,
}

impl Fault {
    /// Short reason sent in `FATAL:<reason>`
    pub fn reason(&self) -> &'static str {
        match self {
            Fault::LinkRead => "link read failed",
            Fault::LinkWrite => "link write failed",
        }
    }
}

/// Everything the server drives, owned by the server for its lifetime
pub struct Hardware<L, P, I, D> {
    /// Serial link to the host
    pub link: L,
    /// E-paper panel
    pub panel: P,
    /// Status light
    pub indicator: I,
    /// Blocking delay for backoff and blink timing
    pub delay: D,
}

/// Outcome of one server step, for the caller to log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServerEvent {
    /// Boot finished; `framebuffer` is false if allocation failed
    Booted { framebuffer: bool },
    /// Nothing to read
    Idle,
    /// A line with no meaning in the current state was dropped
    Ignored,
    /// Session started
    Granted,
    /// `CAN_SEND` refused because a session is active
    Rejected,
    /// `CAN_SEND` answered with `ERR_MEM`
    OutOfMemory,
    /// Chunk stored; `received` bytes of the frame are in
    ChunkAccepted { received: usize },
    /// Session ended with an error reply
    Aborted(SessionError),
    /// Frame shown, `DONE` sent
    Displayed,
    /// Refresh failed, `ERR_DISP` sent
    DisplayFailed(PanelError),
}

/// The device side of the frame transfer
pub struct DeviceServer<L, P, I, D, A = HeapAllocator> {
    hw: Hardware<L, P, I, D>,
    config: ServerConfig,
    allocator: A,
    state: ServerState,
    framebuffer: Option<Framebuffer>,
    session: Session,
    reader: LineReader,
    backoff: Backoff,
}

impl<L, P, I, D> DeviceServer<L, P, I, D, HeapAllocator>
where
    L: Link,
    P: PanelDriver,
    I: Indicator,
    D: DelayNs,
{
    /// Create a server allocating its frame buffer from the heap
    pub fn new(hw: Hardware<L, P, I, D>, config: ServerConfig) -> Self {
        Self::with_allocator(hw, config, HeapAllocator)
    }
}

impl<L, P, I, D, A> DeviceServer<L, P, I, D, A>
where
    L: Link,
    P: PanelDriver,
    I: Indicator,
    D: DelayNs,
    A: FrameAllocator,
{
    /// Create a server with a custom frame buffer allocator
    pub fn with_allocator(hw: Hardware<L, P, I, D>, config: ServerConfig, allocator: A) -> Self {
        Self {
            hw,
            config,
            allocator,
            state: ServerState::Boot,
            framebuffer: None,
            session: Session::new(FRAME_SIZE),
            reader: LineReader::new(),
            backoff: Backoff::new(config.poll_backoff_ms),
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Whether a session is active
    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    /// Contents of the frame buffer, if allocated
    pub fn framebuffer(&self) -> Option<&[u8]> {
        self.framebuffer.as_ref().map(Framebuffer::as_bytes)
    }

    pub fn hardware(&self) -> &Hardware<L, P, I, D> {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut Hardware<L, P, I, D> {
        &mut self.hw
    }

    /// Stop the server and hand the hardware back
    pub fn into_hardware(self) -> Hardware<L, P, I, D> {
        self.hw
    }

    /// Allocate the frame buffer and signal readiness
    ///
    /// An allocation failure is reported with `ERR_MEM` but does not stop
    /// the server; allocation is retried on the next `CAN_SEND`.
    pub fn boot(&mut self) -> Result<ServerEvent, Fault> {
        let framebuffer = self.ensure_framebuffer();
        if !framebuffer {
            self.reply(&Reply::MemErr)?;
        }
        self.apply(Event::Booted);

        self.signal_ready();
        self.apply(Event::ReadySignalled);

        if self.config.announce_ready {
            self.reply(&Reply::Ready)?;
        }
        Ok(ServerEvent::Booted { framebuffer })
    }

    /// Run one unit of work for the current state
    ///
    /// Never blocks longer than one poll backoff, except during a panel
    /// refresh. Boots first if [`boot`](Self::boot) has not been called.
    pub fn step(&mut self) -> Result<ServerEvent, Fault> {
        match self.state {
            ServerState::Boot | ServerState::SignalReady => self.boot(),
            ServerState::WaitQuery => self.wait_query(),
            ServerState::Receiving => self.receive(),
            ServerState::Refresh => self.refresh(),
            ServerState::Fatal(fault) => Err(fault),
        }
    }

    /// Report `fault` to the host and blink forever
    pub fn halt(&mut self, fault: Fault) -> ! {
        self.apply(Event::FaultDetected(fault));
        // Best effort: the link may be the thing that failed
        let _ = self
            .hw
            .link
            .send_line(Reply::fatal(fault.reason()).encode().as_bytes());

        loop {
            self.hw.indicator.toggle();
            self.hw.delay.delay_ms(self.config.fatal_blink_ms);
        }
    }

    fn wait_query(&mut self) -> Result<ServerEvent, Fault> {
        let line = match self.poll()? {
            LinePoll::Line(line) => line,
            LinePoll::TooLong => return Ok(ServerEvent::Ignored),
            LinePoll::Empty => {
                self.backoff.wait(&mut self.hw.delay);
                return Ok(ServerEvent::Idle);
            }
        };

        match Request::parse(&line) {
            Request::CanSend => self.grant(),
            Request::Chunk(_) => Ok(ServerEvent::Ignored),
        }
    }

    fn grant(&mut self) -> Result<ServerEvent, Fault> {
        if !self.ensure_framebuffer() {
            self.reply(&Reply::MemErr)?;
            return Ok(ServerEvent::OutOfMemory);
        }

        self.reply(&Reply::Yes)?;
        self.session = Session::new(FRAME_SIZE);
        self.backoff.reset();
        self.hw.indicator.set(true);
        self.apply(Event::Granted);
        Ok(ServerEvent::Granted)
    }

    fn receive(&mut self) -> Result<ServerEvent, Fault> {
        let line = match self.poll()? {
            LinePoll::Line(line) => line,
            LinePoll::TooLong => return self.abort(SessionError::LineTooLong),
            LinePoll::Empty => {
                self.backoff.wait(&mut self.hw.delay);
                if self.backoff.expired(self.config.session_idle_timeout_ms) {
                    return self.abort(SessionError::IdleTimeout);
                }
                return Ok(ServerEvent::Idle);
            }
        };
        self.backoff.reset();

        let chunk = match Request::parse(&line) {
            Request::CanSend => {
                self.reply(&Reply::Busy)?;
                return Ok(ServerEvent::Rejected);
            }
            Request::Chunk(chunk) => chunk,
        };

        // Without a buffer every chunk overflows
        let buffer: &mut [u8] = match self.framebuffer.as_mut() {
            Some(framebuffer) => framebuffer.as_mut_bytes(),
            None => &mut [],
        };

        match self.session.accept(chunk, buffer) {
            Ok(_) => {
                self.reply(&Reply::Ok)?;
                if self.session.is_complete() {
                    self.apply(Event::FrameComplete);
                }
                Ok(ServerEvent::ChunkAccepted {
                    received: self.session.cursor(),
                })
            }
            Err(error) => self.abort(error),
        }
    }

    fn refresh(&mut self) -> Result<ServerEvent, Fault> {
        let frame = self.framebuffer.as_ref().map_or(&[][..], Framebuffer::as_bytes);
        let result = if self.session.is_complete() && frame.len() == FRAME_SIZE {
            self.hw.panel.refresh(frame)
        } else {
            Err(PanelError::FrameSize)
        };
        self.hw.indicator.set(false);

        let event = match result {
            Ok(()) => {
                self.reply(&Reply::Done)?;
                ServerEvent::Displayed
            }
            Err(error) => {
                self.reply(&Reply::display_error(error.reason()))?;
                ServerEvent::DisplayFailed(error)
            }
        };
        self.apply(Event::RefreshFinished);
        Ok(event)
    }

    fn abort(&mut self, error: SessionError) -> Result<ServerEvent, Fault> {
        self.reply(&error.reply())?;
        self.hw.indicator.set(false);
        self.apply(Event::SessionAborted);
        Ok(ServerEvent::Aborted(error))
    }

    fn signal_ready(&mut self) {
        for _ in 0..self.config.ready_blinks {
            self.hw.indicator.toggle();
            self.hw.delay.delay_ms(self.config.ready_blink_ms);
        }
        self.hw.indicator.set(false);
        self.hw.delay.delay_ms(self.config.ready_settle_ms);
    }

    /// Allocate the frame buffer if it is missing; true if one exists
    fn ensure_framebuffer(&mut self) -> bool {
        if self.framebuffer.is_none() {
            self.framebuffer = Framebuffer::allocate(&mut self.allocator).ok();
        }
        self.framebuffer.is_some()
    }

    fn poll(&mut self) -> Result<LinePoll, Fault> {
        match self.reader.poll_line(&mut self.hw.link) {
            Ok(poll) => Ok(poll),
            Err(_) => Err(self.fail(Fault::LinkRead)),
        }
    }

    fn reply(&mut self, reply: &Reply) -> Result<(), Fault> {
        match self.hw.link.send_line(reply.encode().as_bytes()) {
            Ok(()) => Ok(()),
            Err(_) => Err(self.fail(Fault::LinkWrite)),
        }
    }

    fn fail(&mut self, fault: Fault) -> Fault {
        self.apply(Event::FaultDetected(fault));
        fault
    }

    fn apply(&mut self, event: Event) {
        if event.ends_session() {
            self.session = Session::new(FRAME_SIZE);
            self.backoff.reset();
        }
        self.state = self.state.transition(event);
    }
}
