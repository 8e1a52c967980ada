//! Socket resolution from an opaque response stream
//!
//! Walks the stream wrapper graph the HTTP layer produced and locates the
//! transport socket backing it. The set of recognized wrapper shapes is
//! closed and version-specific, so the contract is graceful degradation:
//! anything unrecognized resolves to `None`, never a failure.

use std::marker::PhantomData;
use std::sync::OnceLock;

#[cfg(unix)]
use std::os::unix::io::AsRawFd;
#[cfg(windows)]
use std::os::windows::io::AsRawSocket;

use crate::stream::{BodyStream, ConnectionStream, DelegatingStream, RawStream};

/// Platform raw socket handle.
#[cfg(unix)]
pub type RawSocketHandle = std::os::unix::io::RawFd;
/// Platform raw socket handle.
#[cfg(windows)]
pub type RawSocketHandle = std::os::windows::io::RawSocket;

/// Borrowed reference to the socket backing a live connection.
///
/// The handle is never owned here: the stream graph that produced it keeps
/// the connection alive, and holders of a `SocketRef` must not close it or
/// outlive the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketRef<'a> {
    raw: RawSocketHandle,
    _owner: PhantomData<&'a ()>,
}

impl<'a> SocketRef<'a> {
    #[cfg(unix)]
    pub fn new<S: AsRawFd>(socket: &'a S) -> Self {
        Self {
            raw: socket.as_raw_fd(),
            _owner: PhantomData,
        }
    }

    #[cfg(windows)]
    pub fn new<S: AsRawSocket>(socket: &'a S) -> Self {
        Self {
            raw: socket.as_raw_socket(),
            _owner: PhantomData,
        }
    }

    pub fn raw(&self) -> RawSocketHandle {
        self.raw
    }
}

/// Outcome of probing one wrapper shape against one stream.
enum Probe<'a> {
    /// Matched a forwarding wrapper; continue with its inner stream.
    Inner(&'a dyn RawStream),
    /// Matched a socket-bearing shape.
    Socket(SocketRef<'a>),
    /// Shape did not match (or its socket association is currently absent).
    NoMatch,
}

type ShapeProbe = for<'a> fn(&'a dyn RawStream) -> Probe<'a>;

/// Known stacks nest at most two wrappers deep; the cap keeps an unexpected
/// graph from walking forever.
const MAX_UNWRAP_DEPTH: usize = 4;

static SHAPES: OnceLock<Vec<ShapeProbe>> = OnceLock::new();

/// Recognized wrapper shapes, probed in order. Built once, never mutated.
fn shapes() -> &'static [ShapeProbe] {
    SHAPES.get_or_init(|| {
        vec![
            probe_delegating,
            probe_connection_stream,
            probe_body_stream,
        ]
    })
}

fn probe_delegating(stream: &dyn RawStream) -> Probe<'_> {
    match stream.as_any().downcast_ref::<DelegatingStream>() {
        Some(wrapper) => Probe::Inner(wrapper.inner()),
        None => Probe::NoMatch,
    }
}

fn probe_connection_stream(stream: &dyn RawStream) -> Probe<'_> {
    match stream.as_any().downcast_ref::<ConnectionStream>() {
        Some(connection) => Probe::Socket(SocketRef::new(connection)),
        None => Probe::NoMatch,
    }
}

fn probe_body_stream(stream: &dyn RawStream) -> Probe<'_> {
    // A matching body stream whose connection is not attached yet (or no
    // longer) resolves to nothing rather than failing.
    match stream
        .as_any()
        .downcast_ref::<BodyStream>()
        .and_then(BodyStream::connection)
    {
        Some(connection) => Probe::Socket(SocketRef::new(connection)),
        None => Probe::NoMatch,
    }
}

/// Locates the socket backing `stream` by probing the recognized wrapper
/// shapes, unwrapping forwarding layers as they match.
///
/// `None` means the stream's implementation shape was not recognized, which
/// is a benign outcome: this runtime, or a buffering decorator somewhere in
/// the graph, hid the transport.
pub fn resolve(stream: &dyn RawStream) -> Option<SocketRef<'_>> {
    let mut current = stream;
    for _ in 0..MAX_UNWRAP_DEPTH {
        let mut hit = Probe::NoMatch;
        for probe in shapes() {
            match probe(current) {
                Probe::NoMatch => continue,
                matched => {
                    hit = matched;
                    break;
                }
            }
        }
        match hit {
            Probe::Inner(next) => current = next,
            Probe::Socket(socket) => return Some(socket),
            Probe::NoMatch => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    /// Stand-in for a stream implementation the resolver has never heard of.
    struct OpaqueStream;

    impl AsyncRead for OpaqueStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl RawStream for OpaqueStream {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn unrecognized_leaf_resolves_to_none() {
        let chain = DelegatingStream::new(Box::new(OpaqueStream));
        assert!(resolve(&chain).is_none());
    }

    #[test]
    fn bare_unrecognized_stream_resolves_to_none() {
        assert!(resolve(&OpaqueStream).is_none());
    }

    #[test]
    fn detached_body_stream_resolves_to_none() {
        let body = BodyStream::detached();
        assert!(resolve(&body).is_none());
        let wrapped = DelegatingStream::new(Box::new(BodyStream::detached()));
        assert!(resolve(&wrapped).is_none());
    }

    #[test]
    fn over_deep_chain_resolves_to_none() {
        let mut chain: Box<dyn RawStream> = Box::new(BodyStream::detached());
        for _ in 0..MAX_UNWRAP_DEPTH + 1 {
            chain = Box::new(DelegatingStream::new(chain));
        }
        assert!(resolve(chain.as_ref()).is_none());
    }
}
