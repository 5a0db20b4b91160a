//! Binary packet reconstruction.
//!
//! A BINARY_EVENT or BINARY_ACK arrives as a payload skeleton whose binary
//! values were replaced by placeholder markers, followed by one raw frame per
//! attachment. The reconstructor holds the skeleton and fills placeholder `k`
//! with the `k`-th attachment to arrive.
//!
//! One reconstructor serves one connection and is reused sequentially. It is
//! not meant for concurrent `begin`/`absorb` calls.

use crate::core::packet::Packet;
use crate::error::{ProtocolError, Result};
use bytes::Bytes;
use tracing::{debug, trace, warn};

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Accumulating {
        packet: Packet,
        expected: usize,
        received: usize,
    },
}

/// Outcome of absorbing one attachment.
#[derive(Debug, PartialEq)]
pub enum Absorbed {
    /// More attachments are still needed.
    Pending { remaining: usize },
    /// Every placeholder has been filled; the reconstructor is idle again.
    Complete(Packet),
}

#[derive(Debug)]
pub struct Reconstructor {
    state: State,
    max_attachments: usize,
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconstructor {
    pub fn new() -> Self {
        Self::with_limit(usize::MAX)
    }

    /// Reject binary packets declaring more than `max_attachments` attachments.
    pub fn with_limit(max_attachments: usize) -> Self {
        Self {
            state: State::Idle,
            max_attachments,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Attachments still expected before the packet in progress completes.
    pub fn pending(&self) -> usize {
        match &self.state {
            State::Idle => 0,
            State::Accumulating {
                expected, received, ..
            } => expected - received,
        }
    }

    /// The packet under construction, if any.
    pub fn in_progress(&self) -> Option<&Packet> {
        match &self.state {
            State::Idle => None,
            State::Accumulating { packet, .. } => Some(packet),
        }
    }

    /// Start reconstructing `packet`.
    ///
    /// Fails if a reconstruction is already in progress, if the packet is not a
    /// BINARY_EVENT/BINARY_ACK, or if its placeholders are not exactly
    /// `0..attachment_count`. A packet declaring no attachments is returned
    /// complete straight away and the reconstructor stays idle.
    pub fn begin(&mut self, packet: Packet) -> Result<Option<Packet>> {
        if !self.is_idle() || !packet.kind.is_binary() {
            let err = ProtocolError::UnexpectedBinary {
                packet: packet.to_string(),
                in_progress: self.describe(),
            };
            warn!(error = %err, "Rejected binary packet");
            return Err(err);
        }

        let declared = packet.attachment_count;
        if declared > self.max_attachments {
            let err = ProtocolError::TooManyAttachments {
                declared,
                limit: self.max_attachments,
            };
            warn!(error = %err, packet = %packet, "Rejected binary packet");
            return Err(err);
        }

        let mut indices = packet
            .payload
            .as_ref()
            .map(|p| p.placeholder_indices())
            .unwrap_or_default();
        indices.sort_unstable();
        if indices.len() != declared || indices.iter().enumerate().any(|(i, n)| i != *n) {
            let err = ProtocolError::PlaceholderMismatch {
                declared,
                found: indices.len(),
            };
            warn!(error = %err, packet = %packet, "Rejected binary packet");
            return Err(err);
        }

        if declared == 0 {
            trace!(packet = %packet, "Binary packet declares no attachments");
            return Ok(Some(packet));
        }

        debug!(kind = packet.kind.name(), id = ?packet.id, declared, "Binary reconstruction started");
        self.state = State::Accumulating {
            packet,
            expected: declared,
            received: 0,
        };
        Ok(None)
    }

    /// Fail unless a reconstruction is waiting for attachments.
    ///
    /// Checked once per attachment frame, so a frame carrying no buffers is
    /// still rejected when nothing is in progress.
    pub fn expect_attachment(&self, frame: &Packet) -> Result<()> {
        if self.is_idle() {
            return Err(Self::unexpected_attachment(frame.to_string()));
        }
        Ok(())
    }

    /// Fill the next placeholder, in index order, with `data`.
    ///
    /// On the last attachment the finished packet is handed back and the
    /// reconstructor returns to idle.
    pub fn absorb(&mut self, data: Bytes) -> Result<Absorbed> {
        let State::Accumulating {
            packet,
            expected,
            received,
        } = &mut self.state
        else {
            return Err(Self::unexpected_attachment(
                Packet::attachment(data).to_string(),
            ));
        };

        let len = data.len();
        if let Some(payload) = packet.payload.as_mut() {
            // Placeholders were validated at begin, so the slot exists
            payload.fill_placeholder(*received, data);
        }
        *received += 1;
        trace!(index = *received - 1, len, "Absorbed binary attachment");

        if *received < *expected {
            return Ok(Absorbed::Pending {
                remaining: *expected - *received,
            });
        }

        match std::mem::take(&mut self.state) {
            State::Accumulating { mut packet, .. } => {
                packet.attachments.clear();
                packet.attachment_count = 0;
                debug!(kind = packet.kind.name(), id = ?packet.id, "Binary reconstruction complete");
                Ok(Absorbed::Complete(packet))
            }
            State::Idle => Err(ProtocolError::Custom(
                "reconstructor went idle mid-absorb".to_string(),
            )),
        }
    }

    /// Drop any reconstruction in progress.
    pub fn reset(&mut self) {
        if let State::Accumulating { packet, received, .. } = &self.state {
            debug!(packet = %packet, received, "Discarding partial binary reconstruction");
        }
        self.state = State::Idle;
    }

    fn unexpected_attachment(packet: String) -> ProtocolError {
        let err = ProtocolError::UnexpectedAttachment { packet };
        warn!(error = %err, "Rejected binary attachment");
        err
    }

    fn describe(&self) -> String {
        self.in_progress()
            .map(Packet::to_string)
            .unwrap_or_else(|| "idle".to_string())
    }
}
