//! tcpeek - kernel TCP statistics for the socket behind an HTTP response
//!
//! Given the readable byte stream of an in-flight HTTP download, tcpeek
//! locates the transport socket buried in the stream's wrapper graph, issues
//! the platform's out-of-band TCP info control request on it, and decodes
//! the answer into a flat, serializable record.
//!
//! # Library Usage
//!
//! ```ignore
//! use tcpeek::{tcp_stats, TcpStats};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let stream = tcpeek::http::fetch("http://mirror.example.org/big.iso").await?;
//!     match tcp_stats(stream.as_ref())? {
//!         TcpStats::Stats(info) => println!("rtt: {} us", info.rtt_us),
//!         TcpStats::NoSocket => println!("stream shape not recognized"),
//!         TcpStats::Unavailable => println!("stack declined to report"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`record`] - TCP_INFO_v0 wire record and codec
//! - [`query`] - out-of-band control request on a socket handle
//! - [`resolve`] - socket resolution from the stream wrapper graph
//! - [`snapshot`] - the composed "get stats for this stream" operation
//! - [`stream`] - recognized stream wrapper shapes
//! - [`http`] - minimal GET glue producing a resolvable stream

pub mod http;
pub mod query;
pub mod record;
pub mod resolve;
pub mod snapshot;
pub mod stream;

pub use query::{ControlChannel, SIO_TCP_INFO};
pub use record::{MalformedRecord, TcpInfoV0};
pub use resolve::{resolve, RawSocketHandle, SocketRef};
pub use snapshot::{stats_via, tcp_stats, StatsError, TcpStats};
pub use stream::{BodyStream, ConnectionStream, DelegatingStream, HttpConnection, RawStream};
