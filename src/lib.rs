//! A readiness selector for tests.
//!
//! [`TestSelector`] keeps the registrations an event loop makes without
//! needing real descriptors or real readiness. Synthetic handles such as
//! [`FileMock`] and [`SocketMock`] are tracked locally; OS-backed handles are
//! also passed on to a wrapped selector when there is one.
//!
//! ```
//! use rivet_mock::{fd, EventSet, FileMock, Select, TestSelector};
//!
//! fd::reset();
//! let mut selector = TestSelector::new();
//! let mock = FileMock::new();
//!
//! let key = selector.register(&mock, EventSet::readable(), "data")?;
//! assert_eq!(selector.get_map().get_fd(0), Some(&key));
//!
//! selector.set_ready(&mock, EventSet::readable())?;
//! assert_eq!(selector.select(None)?.len(), 1);
//! # Ok::<(), rivet_mock::Error>(())
//! ```

#[macro_use] extern crate bitflags;

mod error;
mod event;
mod handle;
mod mock;
mod selector;

pub mod fd;

pub use error::{
    Error,
    Result,
};
pub use event::EventSet;
pub use handle::{
    AsHandle,
    Handle,
};
pub use mock::{
    FileMock,
    Socket,
    SocketMock,
};
pub use selector::{
    Fired,
    Iter,
    Select,
    SelectorKey,
    SelectorMap,
    TestSelector,
};
