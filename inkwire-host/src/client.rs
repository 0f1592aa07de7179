//! Host transfer client
//!
//! One call to [`send_frame`] is one transfer attempt:
//!
//! 1. discard whatever the device sent before we arrived
//! 2. `CAN_SEND` until `YES`, backing off on `BUSY` or silence
//! 3. every chunk line, each waiting for its `OK`
//! 4. wait for `DONE`
//!
//! A chunk is never re-sent on its own. Any failure ends the attempt and the
//! caller starts over from the handshake.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use inkwire_hal::Link;
use inkwire_protocol::messages::CAN_SEND;
use inkwire_protocol::timing;
use inkwire_protocol::{hex, FrameError, LinePoll, LineReader, Reply, CHUNK_HEX_LEN, FRAME_SIZE};
use log::{debug, info, warn};
use serde::Deserialize;

use crate::error::{Phase, TransferError};

/// Timing of one transfer attempt
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Wait for `YES`/`BUSY` after each `CAN_SEND` (ms)
    pub handshake_timeout_ms: u64,
    /// `CAN_SEND` attempts before giving up
    pub handshake_attempts: u32,
    /// Pause between handshake attempts (ms)
    pub handshake_backoff_ms: u64,
    /// Wait for each chunk's `OK` (ms)
    pub chunk_timeout_ms: u64,
    /// Wait for `DONE` after the last chunk (ms); `None` waits forever
    pub completion_timeout_ms: Option<u64>,
    /// Sleep between polls of an empty link (ms)
    pub poll_interval_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: timing::HANDSHAKE_TIMEOUT_MS,
            handshake_attempts: timing::HANDSHAKE_ATTEMPTS,
            handshake_backoff_ms: timing::HANDSHAKE_BACKOFF_MS,
            chunk_timeout_ms: timing::CHUNK_ACK_TIMEOUT_MS,
            completion_timeout_ms: None,
            poll_interval_ms: 1,
        }
    }
}

impl TransferConfig {
    fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    fn handshake_backoff(&self) -> Duration {
        Duration::from_millis(self.handshake_backoff_ms)
    }

    fn chunk_timeout(&self) -> Duration {
        Duration::from_millis(self.chunk_timeout_ms)
    }

    fn completion_timeout(&self) -> Option<Duration> {
        self.completion_timeout_ms.map(Duration::from_millis)
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Hex characters acknowledged so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub acked: usize,
    pub total: usize,
}

impl Progress {
    /// Acknowledged share in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.acked as f64 / self.total as f64
    }

    pub fn is_complete(&self) -> bool {
        self.acked == self.total
    }
}

/// Summary of a successful transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// `CAN_SEND` lines sent before `YES`
    pub handshake_attempts: u32,
    /// Chunk lines acknowledged
    pub chunks: usize,
    /// Frame bytes delivered
    pub bytes: usize,
    /// Time from handshake to `DONE`
    pub elapsed: Duration,
}

/// Push one frame over `link` and wait until the panel shows it
///
/// `on_progress` is called once per acknowledged chunk. The link is dropped
/// (closed) before this returns, whatever the outcome.
pub fn send_frame<L, F>(
    link: L,
    frame: &[u8],
    config: &TransferConfig,
    on_progress: F,
) -> Result<TransferReport, TransferError>
where
    L: Link<Error = io::Error>,
    F: FnMut(Progress),
{
    let mut attempt = Attempt {
        link,
        reader: LineReader::new(),
        config,
    };
    let result = attempt.run(frame, on_progress);
    attempt.close();
    result
}

struct Attempt<'a, L> {
    link: L,
    reader: LineReader,
    config: &'a TransferConfig,
}

impl<L> Attempt<'_, L>
where
    L: Link<Error = io::Error>,
{
    fn run<F: FnMut(Progress)>(
        &mut self,
        frame: &[u8],
        mut on_progress: F,
    ) -> Result<TransferReport, TransferError> {
        if frame.len() != FRAME_SIZE {
            return Err(FrameError::SizeMismatch {
                expected: FRAME_SIZE,
                actual: frame.len(),
            }
            .into());
        }
        let payload = hex::encode(frame);

        let stale = self.reader.discard_input(&mut self.link)?;
        if stale > 0 {
            debug!("discarded {stale} stale bytes before handshake");
        }

        let started = Instant::now();
        let handshake_attempts = self.handshake()?;
        info!("transfer granted after {handshake_attempts} handshake attempt(s)");

        let total = payload.len();
        let mut acked = 0;
        let mut chunks = 0;
        for (index, chunk) in payload.as_bytes().chunks(CHUNK_HEX_LEN).enumerate() {
            self.link.send_line(chunk)?;
            self.await_ack(index)?;

            acked += chunk.len();
            chunks += 1;
            debug!("chunk {index} acknowledged ({acked}/{total})");
            on_progress(Progress { acked, total });
        }

        info!("{chunks} chunks acknowledged, waiting for panel refresh");
        self.await_done()?;

        Ok(TransferReport {
            handshake_attempts,
            chunks,
            bytes: frame.len(),
            elapsed: started.elapsed(),
        })
    }

    /// Returns the attempt number that was granted
    fn handshake(&mut self) -> Result<u32, TransferError> {
        let attempts = self.config.handshake_attempts.max(1);
        let mut last_busy = false;

        for attempt in 1..=attempts {
            self.link.send_line(CAN_SEND.as_bytes())?;
            let deadline = Instant::now() + self.config.handshake_timeout();

            last_busy = loop {
                match self.next_reply(Some(deadline))? {
                    Some(Reply::Yes) => return Ok(attempt),
                    Some(Reply::Busy) => {
                        warn!("device busy (attempt {attempt}/{attempts})");
                        break true;
                    }
                    Some(reply) if reply.is_error() => {
                        return Err(TransferError::DeviceRejected {
                            reply: reply.to_string(),
                        });
                    }
                    Some(reply) => debug!("ignoring {reply} during handshake"),
                    None => {
                        warn!("no handshake reply (attempt {attempt}/{attempts})");
                        break false;
                    }
                }
            };

            if attempt < attempts {
                thread::sleep(self.config.handshake_backoff());
            }
        }

        if last_busy {
            Err(TransferError::BusyRetryExhausted { attempts })
        } else {
            Err(TransferError::Timeout {
                phase: Phase::Handshake,
            })
        }
    }

    fn await_ack(&mut self, index: usize) -> Result<(), TransferError> {
        let phase = Phase::Chunk { index };
        let deadline = Instant::now() + self.config.chunk_timeout();

        match self.next_reply(Some(deadline))? {
            Some(Reply::Ok) => Ok(()),
            Some(reply) if reply.is_error() => Err(TransferError::DeviceRejected {
                reply: reply.to_string(),
            }),
            Some(reply) => Err(TransferError::Protocol {
                phase,
                line: reply.to_string(),
            }),
            None => Err(TransferError::Timeout { phase }),
        }
    }

    fn await_done(&mut self) -> Result<(), TransferError> {
        let deadline = self.config.completion_timeout().map(|t| Instant::now() + t);

        loop {
            match self.next_reply(deadline)? {
                Some(Reply::Done) => return Ok(()),
                Some(reply) if reply.is_error() => {
                    return Err(TransferError::DeviceRejected {
                        reply: reply.to_string(),
                    });
                }
                Some(reply) => debug!("ignoring {reply} while waiting for refresh"),
                None => {
                    return Err(TransferError::Timeout {
                        phase: Phase::Completion,
                    });
                }
            }
        }
    }

    /// Next recognizable reply, or `None` once `deadline` passes
    ///
    /// The deadline holds even while the device keeps sending lines that
    /// are skipped.
    fn next_reply(&mut self, deadline: Option<Instant>) -> Result<Option<Reply>, TransferError> {
        loop {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(None);
            }
            match self.reader.poll_line(&mut self.link)? {
                LinePoll::Line(line) => {
                    let text = String::from_utf8_lossy(&line);
                    match Reply::parse(&text) {
                        Ok(reply) => return Ok(Some(reply)),
                        Err(_) => debug!("ignoring unrecognized line {text:?}"),
                    }
                }
                LinePoll::TooLong => debug!("ignoring overlong line"),
                LinePoll::Empty => thread::sleep(self.config.poll_interval()),
            }
        }
    }

    fn close(self) {
        debug!("closing link");
        drop(self.link);
    }
}
