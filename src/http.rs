//! Minimal HTTP/1.1 download glue
//!
//! Issues a plain GET and hands the body back as the transport wrapper graph
//! the resolver understands. Off-the-shelf HTTP clients bury their sockets
//! behind private types, so the demo keeps its own thin client; anything
//! beyond "connect, send GET, split off the header" is out of scope.

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::stream::{BodyStream, DelegatingStream, HttpConnection, RawStream};

const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Fetches `url` and returns the response body stream with the transfer
/// still in flight.
///
/// The returned graph gives the resolver direct access to the transport;
/// re-wrapping it in a buffering decorator degrades resolution to
/// `NoSocket`.
pub async fn fetch(url: &str) -> Result<Box<dyn RawStream>> {
    let (host, port, path) = split_url(url)?;

    let mut stream = TcpStream::connect((host.as_str(), port))
        .await
        .with_context(|| format!("failed to connect to {host}:{port}"))?;
    debug!("connected to {}:{}", host, port);

    let request = format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         User-Agent: tcpeek/0.1\r\n\
         Accept: */*\r\n\
         Connection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await?;

    let (status, leftover) = read_header(&mut stream).await?;
    if !(200..300).contains(&status) {
        bail!("HTTP status {status} for {url}");
    }
    info!("HTTP {} from {}:{}", status, host, port);

    let connection = HttpConnection::new(stream, leftover);
    Ok(Box::new(DelegatingStream::new(Box::new(BodyStream::new(
        connection,
    )))))
}

fn split_url(url: &str) -> Result<(String, u16, String)> {
    let rest = url
        .strip_prefix("http://")
        .context("only http:// URLs are supported")?;
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (
            host,
            port.parse::<u16>()
                .with_context(|| format!("invalid port in {url}"))?,
        ),
        None => (authority, 80),
    };
    if host.is_empty() {
        bail!("missing host in {url}");
    }
    Ok((host.to_string(), port, path.to_string()))
}

/// Reads until the end of the response header; returns the status code and
/// any body bytes that arrived with the final header chunk.
async fn read_header(stream: &mut TcpStream) -> Result<(u16, Vec<u8>)> {
    let mut header = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];
    loop {
        if let Some(end) = find_header_end(&header) {
            let text = std::str::from_utf8(&header[..end])
                .context("response header is not valid UTF-8")?;
            let status = parse_status(text)?;
            let leftover = header[end + 4..].to_vec();
            return Ok((status, leftover));
        }
        if header.len() > MAX_HEADER_BYTES {
            bail!("response header exceeds {MAX_HEADER_BYTES} bytes");
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            bail!("connection closed before the response header completed");
        }
        header.extend_from_slice(&chunk[..n]);
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

fn parse_status(header: &str) -> Result<u16> {
    let line = header.lines().next().unwrap_or_default();
    let code = line
        .split_whitespace()
        .nth(1)
        .with_context(|| format!("malformed status line: {line:?}"))?;
    code.parse::<u16>()
        .with_context(|| format!("malformed status code in {line:?}"))
}
