//! One-shot TCP statistics snapshot
//!
//! Composes socket resolution, the control request, and record decoding into
//! a single "get stats for this stream" call. Benign dead ends (unrecognized
//! stream shape, stack declined) come back as values so callers can branch
//! on "nothing available" without error plumbing.

use std::io;

use thiserror::Error;

use crate::query::ControlChannel;
use crate::record::{MalformedRecord, TcpInfoV0};
use crate::resolve;
use crate::stream::RawStream;

/// Outcome of a snapshot attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpStats {
    /// The decoded statistics record.
    Stats(TcpInfoV0),
    /// No socket could be resolved from the stream's wrapper graph.
    NoSocket,
    /// The stack declined to report statistics for the socket.
    Unavailable,
}

/// Hard failures; benign outcomes are [`TcpStats`] variants instead.
#[derive(Debug, Error)]
pub enum StatsError {
    /// The control response did not match the v0 layout. Never coerced.
    #[error(transparent)]
    Malformed(#[from] MalformedRecord),
    /// The control request itself failed at the I/O level. Not retried.
    #[error("TCP info control request failed")]
    ControlChannel(#[source] io::Error),
}

/// Takes one TCP statistics snapshot for the socket backing `stream`.
///
/// Read-only: the stream and socket are borrowed, never mutated or closed.
/// Not safe to call concurrently for the same underlying socket.
pub fn tcp_stats(stream: &dyn RawStream) -> Result<TcpStats, StatsError> {
    match resolve::resolve(stream) {
        None => Ok(TcpStats::NoSocket),
        Some(socket) => stats_via(&socket),
    }
}

/// Queries and decodes through an explicit control channel.
///
/// Production code reaches this via [`tcp_stats`] with the resolved socket;
/// tests substitute their own channel.
pub fn stats_via<C: ControlChannel>(channel: &C) -> Result<TcpStats, StatsError> {
    match channel.tcp_info().map_err(StatsError::ControlChannel)? {
        None => Ok(TcpStats::Unavailable),
        Some(buf) => Ok(TcpStats::Stats(TcpInfoV0::decode(&buf)?)),
    }
}
