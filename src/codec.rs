//! STX-LEN-payload-ETX framing over a [SerialLink].
//!
//! `LEN` counts the whole frame including STX, LEN itself and the
//! trailing ETX, so the payload is `LEN - 3` bytes. A frame is accepted
//! atomically or discarded; a partial or corrupt frame never reaches
//! the caller.

use crate::link::SerialLink;
use crate::protocol::{BUFFER_LEN, ETX, FRAME_OVERHEAD, HEADER_LEN, STX, SYNC_RETRIES};

/// Framing failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum CodecError<E> {
    /// Transport failure
    Link(E),
    /// Payload exceeds what a single frame can carry
    PayloadTooLong,
}

/// Build a frame around `payload` in `out`.
///
/// Returns the frame length, or `None` when the payload cannot fit a
/// single frame.
pub fn encode_frame(payload: &[u8], out: &mut [u8]) -> Option<usize> {
    let frame_len = payload.len() + FRAME_OVERHEAD;
    if frame_len >= BUFFER_LEN || frame_len > out.len() {
        return None;
    }
    out[0] = STX;
    out[1] = frame_len as u8;
    out[2..2 + payload.len()].copy_from_slice(payload);
    out[frame_len - 1] = ETX;
    Some(frame_len)
}

/// Framed serial port to the host
pub struct HostPort<L> {
    link: L,
    scratch: [u8; BUFFER_LEN],
}

impl<L: SerialLink> HostPort<L> {
    pub fn new(link: L) -> Self {
        HostPort {
            link,
            scratch: [0; BUFFER_LEN],
        }
    }

    pub fn free(self) -> L {
        self.link
    }

    /// Frame `payload` and queue it for transmission
    pub fn send_frame(&mut self, payload: &[u8]) -> Result<(), CodecError<L::Error>> {
        let mut frame = [0u8; BUFFER_LEN];
        let frame_len = encode_frame(payload, &mut frame).ok_or(CodecError::PayloadTooLong)?;
        self.link.write(&frame[..frame_len]).map_err(CodecError::Link)
    }

    /// Try to extract one frame's payload from the link.
    ///
    /// Scans a bounded number of bytes for an STX, validates the length
    /// byte, then reads the body and checks the trailing ETX. Returns
    /// the payload length when a whole valid frame arrived, `None`
    /// otherwise; `payload` is only written for an accepted frame.
    pub fn poll_frame(&mut self, payload: &mut [u8]) -> Result<Option<usize>, L::Error> {
        let mut frame_len = 0usize;

        for _ in 0..SYNC_RETRIES {
            if self.link.available()? <= HEADER_LEN {
                return Ok(None);
            }
            let mut byte = [0u8; 1];
            if self.link.read(&mut byte)? != 1 || byte[0] != STX {
                continue;
            }
            if self.link.read(&mut byte)? != 1 {
                return Ok(None);
            }
            let len = byte[0] as usize;
            if len > 0 && len < BUFFER_LEN {
                frame_len = len;
                break;
            }
        }

        if frame_len < FRAME_OVERHEAD {
            return Ok(None);
        }

        // Body is everything after STX and LEN, ETX included
        let body_len = frame_len - HEADER_LEN;
        let body = &mut self.scratch[..body_len];
        if self.link.read(body)? != body_len || body[body_len - 1] != ETX {
            return Ok(None);
        }

        let payload_len = body_len - 1;
        if payload.len() < payload_len {
            return Ok(None);
        }
        payload[..payload_len].copy_from_slice(&body[..payload_len]);
        Ok(Some(payload_len))
    }
}
