//! Response stream wrapper shapes
//!
//! The HTTP glue hands its body back as a graph of thin stream wrappers over
//! the transport socket. Each shape here is recognized by the resolver, which
//! probes `as_any` downcasts instead of any public stream interface.

use std::any::Any;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tokio::net::TcpStream;

#[cfg(unix)]
use std::os::unix::io::{AsRawFd, RawFd};
#[cfg(windows)]
use std::os::windows::io::{AsRawSocket, RawSocket};

/// An opaque readable byte stream produced by the HTTP layer.
///
/// `as_any` exposes the concrete wrapper type for shape probing; it is the
/// only introspection the resolver gets.
pub trait RawStream: AsyncRead + Send + Unpin {
    fn as_any(&self) -> &dyn Any;
}

impl std::fmt::Debug for dyn RawStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RawStream")
    }
}

/// An established connection: the transport socket plus any body bytes that
/// were pulled in while the response header was parsed.
///
/// Owns the socket for the lifetime of the transfer. Not itself a stream;
/// body streams read through it.
pub struct HttpConnection {
    stream: TcpStream,
    leftover: Vec<u8>,
    pos: usize,
}

impl HttpConnection {
    pub fn new(stream: TcpStream, leftover: Vec<u8>) -> Self {
        Self {
            stream,
            leftover,
            pos: 0,
        }
    }

    /// Reads body bytes, draining the header-parse leftover first.
    fn poll_body(&mut self, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        if self.pos < self.leftover.len() {
            let n = buf.remaining().min(self.leftover.len() - self.pos);
            buf.put_slice(&self.leftover[self.pos..self.pos + n]);
            self.pos += n;
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

#[cfg(unix)]
impl AsRawFd for HttpConnection {
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

#[cfg(windows)]
impl AsRawSocket for HttpConnection {
    fn as_raw_socket(&self) -> RawSocket {
        self.stream.as_raw_socket()
    }
}

/// Body stream backed by an [`HttpConnection`] that holds the socket.
///
/// The connection association is optional: it is absent before the connection
/// is attached and after the body has been detached from it.
pub struct BodyStream {
    connection: Option<Box<HttpConnection>>,
}

impl BodyStream {
    pub fn new(connection: HttpConnection) -> Self {
        Self {
            connection: Some(Box::new(connection)),
        }
    }

    /// A body stream with no connection attached. Reads report EOF.
    pub fn detached() -> Self {
        Self { connection: None }
    }

    pub fn connection(&self) -> Option<&HttpConnection> {
        self.connection.as_deref()
    }
}

impl AsyncRead for BodyStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut().connection.as_deref_mut() {
            Some(connection) => connection.poll_body(cx, buf),
            None => Poll::Ready(Ok(())),
        }
    }
}

impl RawStream for BodyStream {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Stream that owns its transport socket directly, with no intermediate
/// connection object.
pub struct ConnectionStream {
    stream: TcpStream,
}

impl ConnectionStream {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl AsyncRead for ConnectionStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_read(cx, buf)
    }
}

#[cfg(unix)]
impl AsRawFd for ConnectionStream {
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

#[cfg(windows)]
impl AsRawSocket for ConnectionStream {
    fn as_raw_socket(&self) -> RawSocket {
        self.stream.as_raw_socket()
    }
}

impl RawStream for ConnectionStream {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Transparent forwarding wrapper around exactly one inner stream.
pub struct DelegatingStream {
    inner: Box<dyn RawStream>,
}

impl DelegatingStream {
    pub fn new(inner: Box<dyn RawStream>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &dyn RawStream {
        self.inner.as_ref()
    }
}

impl AsyncRead for DelegatingStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl RawStream for DelegatingStream {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
