//! Out-of-band TCP info control request
//!
//! One synchronous control exchange with the OS network stack, identified by
//! a fixed operation code. The stack either answers with the raw v0 record
//! bytes, declines (closed connection, unsupported socket, missing
//! privilege), or the request itself fails at the I/O level.

use std::io;

use crate::resolve::{RawSocketHandle, SocketRef};

/// Control code selecting the "get TCP info" operation. Opaque and fixed by
/// the platform; never reinterpreted or overridden.
pub const SIO_TCP_INFO: u32 = 0xD800_0027;

/// Capability to issue the TCP info control request.
///
/// `Ok(None)` is the benign "stack declined to report" outcome; `Err` is a
/// hard I/O fault issuing the request. Implementations are not safe to
/// invoke concurrently for the same underlying socket; callers wanting
/// multiple snapshots must serialize them.
pub trait ControlChannel {
    fn tcp_info(&self) -> io::Result<Option<Vec<u8>>>;
}

impl ControlChannel for SocketRef<'_> {
    fn tcp_info(&self) -> io::Result<Option<Vec<u8>>> {
        sys::tcp_info(self.raw())
    }
}

#[cfg(windows)]
mod sys {
    use std::ffi::c_void;
    use std::io;
    use std::mem;
    use std::ptr;

    use windows_sys::Win32::Networking::WinSock::WSAIoctl;

    use super::{RawSocketHandle, SIO_TCP_INFO};
    use crate::record::TcpInfoV0;

    pub fn tcp_info(socket: RawSocketHandle) -> io::Result<Option<Vec<u8>>> {
        // The input payload selects the record version; four zero bytes
        // request v0.
        let version: u32 = 0;
        let mut out = vec![0u8; TcpInfoV0::WIRE_SIZE];
        let mut returned: u32 = 0;

        let rc = unsafe {
            WSAIoctl(
                socket as usize,
                SIO_TCP_INFO,
                &version as *const u32 as *const c_void,
                mem::size_of::<u32>() as u32,
                out.as_mut_ptr() as *mut c_void,
                out.len() as u32,
                &mut returned,
                ptr::null_mut(),
                None,
            )
        };

        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        if returned == 0 {
            return Ok(None);
        }
        out.truncate(returned as usize);
        Ok(Some(out))
    }
}

#[cfg(not(windows))]
mod sys {
    use std::io;

    use super::RawSocketHandle;

    // The TCP info control code is a Windows Sockets extension. Other stacks
    // cannot service it, which is the benign "unavailable" outcome rather
    // than an error.
    pub fn tcp_info(_socket: RawSocketHandle) -> io::Result<Option<Vec<u8>>> {
        Ok(None)
    }
}
