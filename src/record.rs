//! TCP_INFO_v0 record decoding
//!
//! The kernel answers the TCP info control request with a fixed-layout binary
//! structure. This module pins down that layout byte-for-byte and decodes it
//! into a typed record.

use serde::Serialize;
use thiserror::Error;

/// Buffer size did not match the v0 control structure layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("TCP info buffer is {actual} bytes, expected {expected}")]
pub struct MalformedRecord {
    pub expected: usize,
    pub actual: usize,
}

/// Point-in-time TCP statistics for one socket, decoded from the v0 control
/// structure.
///
/// Field order mirrors the structure exactly. The layout is frozen: newer
/// platform revisions that add fields get their own record type rather than
/// changes here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TcpInfoV0 {
    /// TCP connection state (platform numeric encoding, passed through).
    pub state: u32,
    /// Negotiated maximum segment size in bytes.
    pub mss: u32,
    /// Milliseconds the connection has been established.
    pub connection_time_ms: u64,
    /// Whether TCP timestamps were negotiated.
    pub timestamps_enabled: bool,
    /// Smoothed round-trip time in microseconds.
    pub rtt_us: u32,
    /// Minimum observed round-trip time in microseconds.
    pub min_rtt_us: u32,
    /// Bytes sent but not yet acknowledged.
    pub bytes_in_flight: u32,
    /// Congestion window in bytes.
    pub cwnd: u32,
    /// Send window in bytes.
    pub snd_wnd: u32,
    /// Receive window in bytes.
    pub rcv_wnd: u32,
    /// Receive buffer size in bytes.
    pub rcv_buf: u32,
    /// Cumulative bytes sent.
    pub bytes_out: u64,
    /// Cumulative bytes received.
    pub bytes_in: u64,
    /// Bytes received out of order.
    pub bytes_reordered: u32,
    /// Bytes retransmitted.
    pub bytes_retrans: u32,
    /// Fast retransmit episodes.
    pub fast_retrans: u32,
    /// Duplicate ACKs received.
    pub dup_acks_in: u32,
    /// Retransmission timeout episodes.
    pub timeout_episodes: u32,
    /// SYN retransmissions during connection setup.
    pub syn_retrans: u8,
}

impl TcpInfoV0 {
    /// Size in bytes of the v0 control structure: scalars at their natural
    /// C alignment, little-endian, padded to an 8-byte boundary.
    pub const WIRE_SIZE: usize = 88;

    /// Decodes a raw control-response buffer.
    ///
    /// Only the length is validated; field values are passed through as the
    /// platform reported them, however implausible.
    pub fn decode(buf: &[u8]) -> Result<Self, MalformedRecord> {
        if buf.len() != Self::WIRE_SIZE {
            return Err(MalformedRecord {
                expected: Self::WIRE_SIZE,
                actual: buf.len(),
            });
        }
        Ok(Self {
            state: u32_at(buf, 0),
            mss: u32_at(buf, 4),
            connection_time_ms: u64_at(buf, 8),
            timestamps_enabled: buf[16] != 0,
            // 3 pad bytes after the flag restore u32 alignment
            rtt_us: u32_at(buf, 20),
            min_rtt_us: u32_at(buf, 24),
            bytes_in_flight: u32_at(buf, 28),
            cwnd: u32_at(buf, 32),
            snd_wnd: u32_at(buf, 36),
            rcv_wnd: u32_at(buf, 40),
            rcv_buf: u32_at(buf, 44),
            bytes_out: u64_at(buf, 48),
            bytes_in: u64_at(buf, 56),
            bytes_reordered: u32_at(buf, 64),
            bytes_retrans: u32_at(buf, 68),
            fast_retrans: u32_at(buf, 72),
            dup_acks_in: u32_at(buf, 76),
            timeout_episodes: u32_at(buf, 80),
            syn_retrans: buf[84],
            // 3 trailing pad bytes bring the structure to 88
        })
    }
}

fn u32_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

fn u64_at(buf: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
        buf[offset + 4],
        buf[offset + 5],
        buf[offset + 6],
        buf[offset + 7],
    ])
}
