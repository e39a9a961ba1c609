//! Stand-ins for watchable I/O objects.
//!
//! `FileMock` and `SocketMock` only know their descriptor, which is drawn
//! from the shared [`fd`](../fd/index.html) allocator. They are always
//! [`Handle::Synthetic`], so a `TestSelector` never hands them to the
//! selector it wraps.

use std::io::{
    self,
    ErrorKind,
    Read,
    Write,
};
use std::net::{
    TcpListener,
    TcpStream,
    UdpSocket,
};
use std::os::unix::io::{
    AsRawFd,
    RawFd,
};
use std::os::unix::net::{
    UnixDatagram,
    UnixListener,
    UnixStream,
};

use crate::fd;
use crate::handle::{
    AsHandle,
    Handle,
};

/// A file-like object with a synthetic descriptor.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct FileMock {
    fd: RawFd,
}

impl FileMock {
    pub fn new() -> FileMock {
        FileMock { fd: fd::next() }
    }

    /// Creates a mock with descriptor `start`; later mocks continue from
    /// `start + 1`.
    pub fn with_fd(start: RawFd) -> FileMock {
        FileMock { fd: fd::next_from(start) }
    }

    pub fn fileno(&self) -> RawFd {
        self.fd
    }
}

impl Default for FileMock {
    fn default() -> FileMock {
        FileMock::new()
    }
}

impl AsRawFd for FileMock {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl AsHandle for FileMock {
    fn as_handle(&self) -> Handle {
        Handle::Synthetic(self.fd)
    }
}

/// Marker for socket-shaped descriptors.
///
/// Code that only accepts sockets can bound on `Socket` and still be handed a
/// `SocketMock`.
pub trait Socket: AsRawFd {}

impl Socket for TcpListener {}
impl Socket for TcpStream {}
impl Socket for UdpSocket {}
impl Socket for UnixDatagram {}
impl Socket for UnixListener {}
impl Socket for UnixStream {}

/// A socket-like object with a synthetic descriptor.
///
/// Reading or writing behaves like an idle non-blocking socket.
#[derive(Debug, Default, PartialEq, Eq, Hash)]
pub struct SocketMock {
    file: FileMock,
}

impl SocketMock {
    pub fn new() -> SocketMock {
        SocketMock { file: FileMock::new() }
    }

    pub fn with_fd(start: RawFd) -> SocketMock {
        SocketMock { file: FileMock::with_fd(start) }
    }

    pub fn fileno(&self) -> RawFd {
        self.file.fileno()
    }
}

impl AsRawFd for SocketMock {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsHandle for SocketMock {
    fn as_handle(&self) -> Handle {
        self.file.as_handle()
    }
}

impl Socket for SocketMock {}

impl Read for SocketMock {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::from(ErrorKind::WouldBlock))
    }
}

impl Write for SocketMock {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(ErrorKind::WouldBlock))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
