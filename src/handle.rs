use std::fmt;
use std::fs::File;
use std::io::{
    Stdin,
    Stdout,
    Stderr,
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
use std::process::{
    ChildStderr,
    ChildStdin,
    ChildStdout,
};

/// Something a selector can watch.
///
/// `Synthetic` handles are created by this crate and carry a made-up
/// descriptor, so only the test selector itself may track them. `Os` handles
/// name a real descriptor that a wrapped selector can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Synthetic(RawFd),
    Os(RawFd),
}

impl Handle {
    pub fn fd(&self) -> RawFd {
        match *self {
            Handle::Synthetic(fd) | Handle::Os(fd) => fd,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        match *self {
            Handle::Synthetic(_) => true,
            Handle::Os(_) => false,
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Handle::Synthetic(fd) => write!(f, "synthetic fd {}", fd),
            Handle::Os(fd) => write!(f, "fd {}", fd),
        }
    }
}

/// Conversion into a [`Handle`].
pub trait AsHandle {
    fn as_handle(&self) -> Handle;
}

impl AsHandle for Handle {
    fn as_handle(&self) -> Handle {
        *self
    }
}

impl AsHandle for RawFd {
    fn as_handle(&self) -> Handle {
        Handle::Os(*self)
    }
}

impl<'a, H: AsHandle + ?Sized> AsHandle for &'a H {
    fn as_handle(&self) -> Handle {
        (**self).as_handle()
    }
}

macro_rules! os_handle {
    ($($t:ty),* $(,)*) => {
        $(
            impl AsHandle for $t {
                fn as_handle(&self) -> Handle {
                    Handle::Os(self.as_raw_fd())
                }
            }
        )*
    };
}

os_handle! {
    File,
    Stdin,
    Stdout,
    Stderr,
    TcpListener,
    TcpStream,
    UdpSocket,
    UnixDatagram,
    UnixListener,
    UnixStream,
    ChildStdin,
    ChildStdout,
    ChildStderr,
}
