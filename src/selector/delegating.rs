use std::os::unix::io::RawFd;
use std::time::Duration;

use tracing::{
    debug,
    trace,
};

use crate::error::{
    Error,
    Result,
};
use crate::event::EventSet;
use crate::handle::{
    AsHandle,
    Handle,
};
use super::{
    Fired,
    Select,
    SelectorKey,
    SelectorMap,
};

/// A selector for tests.
///
/// On its own a `TestSelector` only keeps track of registrations and never
/// reports a handle ready unless told to with [`set_ready`]. It can wrap
/// another selector `S`, in which case registrations and modifications of
/// OS-backed handles are also passed to `S`, and `select`/`close` go straight
/// to it. Synthetic handles are never passed on.
///
/// `unregister` is always local: the wrapped selector is not told.
///
/// [`set_ready`]: #method.set_ready
#[derive(Debug)]
pub struct TestSelector<T, S = Box<dyn Select<T>>> {
    selector: Option<S>,
    map: SelectorMap<T>,
    ready: Vec<(Handle, EventSet)>,
}

impl<T> TestSelector<T> {
    /// Creates a selector that wraps nothing.
    pub fn new() -> TestSelector<T> {
        TestSelector {
            selector: None,
            map: SelectorMap::new(),
            ready: Vec::new(),
        }
    }
}

impl<T> Default for TestSelector<T> {
    fn default() -> TestSelector<T> {
        TestSelector::new()
    }
}

impl<T, S> TestSelector<T, S>
    where S: Select<T>
{
    /// Creates a selector that forwards to `selector`.
    pub fn with_selector(selector: S) -> TestSelector<T, S> {
        TestSelector {
            selector: Some(selector),
            map: SelectorMap::new(),
            ready: Vec::new(),
        }
    }

    /// The wrapped selector, if any.
    pub fn selector(&self) -> Option<&S> {
        self.selector.as_ref()
    }

    pub fn selector_mut(&mut self) -> Option<&mut S> {
        self.selector.as_mut()
    }

    /// Queues `events` as ready for `source`.
    ///
    /// Queued events are reported by the next `select`, restricted to what
    /// `source` is registered for at that point. Events queued more than once
    /// for one descriptor are reported together. Unregistering `source` drops
    /// whatever is still queued for it.
    ///
    /// A selector that wraps another one reports only what the wrapped
    /// selector reports, so it refuses with `Error::Wrapping`.
    pub fn set_ready(&mut self, source: &dyn AsHandle, events: EventSet) -> Result<()> {
        let handle = source.as_handle();
        if self.selector.is_some() {
            return Err(Error::Wrapping(handle));
        }
        if !self.map.contains_fd(handle.fd()) {
            return Err(Error::NotRegistered(handle));
        }
        trace!(fd = handle.fd(), %events, "queued readiness");
        self.ready.push((handle, events));
        Ok(())
    }

    // The wrapped selector, when `handle` is one it should hear about.
    fn delegate_for(&mut self, handle: Handle) -> Option<&mut S> {
        if handle.is_synthetic() {
            None
        } else {
            self.selector.as_mut()
        }
    }

    fn forget_ready(&mut self, fd: RawFd) {
        self.ready.retain(|&(handle, _)| handle.fd() != fd);
    }

    // One entry per descriptor, in the order each was first queued.
    fn drain_ready(&mut self) -> Vec<Fired<T>>
        where T: Clone
    {
        let mut merged: Vec<(RawFd, EventSet)> = Vec::new();
        for (handle, events) in self.ready.drain(..) {
            let fd = handle.fd();
            match merged.iter_mut().find(|entry| entry.0 == fd) {
                Some(entry) => entry.1.insert(events),
                None => merged.push((fd, events)),
            }
        }

        let map = &self.map;
        merged.into_iter()
            .filter_map(|(fd, events)| {
                let key = map.get_fd(fd)?;
                let evset = events & key.events();
                if evset.is_empty() {
                    None
                } else {
                    Some(Fired::new(key.clone(), evset))
                }
            })
            .collect()
    }
}

impl<T, S> Select<T> for TestSelector<T, S>
    where T: Clone,
          S: Select<T>
{
    fn register(
        &mut self,
        source: &dyn AsHandle,
        events: EventSet,
        data: T,
    ) -> Result<SelectorKey<T>> {
        let handle = source.as_handle();
        let fd = handle.fd();
        if self.map.contains_fd(fd) {
            return Err(Error::AlreadyRegistered(handle));
        }

        let key = match self.delegate_for(handle) {
            Some(selector) => {
                debug!(fd, %events, "forwarding register");
                selector.register(source, events, data)?
            }
            None => {
                debug!(fd, %events, synthetic = handle.is_synthetic(), "register");
                SelectorKey::new(handle, events, data)
            }
        };

        self.map.insert(fd, key.clone());
        Ok(key)
    }

    fn unregister(&mut self, source: &dyn AsHandle) -> Result<SelectorKey<T>> {
        let handle = source.as_handle();
        let key = self.map.remove(handle.fd()).ok_or(Error::NotRegistered(handle))?;
        self.forget_ready(handle.fd());
        debug!(fd = handle.fd(), "unregister");
        Ok(key)
    }

    fn modify(
        &mut self,
        source: &dyn AsHandle,
        events: EventSet,
        data: T,
    ) -> Result<SelectorKey<T>> {
        let handle = source.as_handle();
        let fd = handle.fd();
        let key = match self.map.get_fd(fd) {
            Some(old) => old.modified(events, data.clone()),
            None => return Err(Error::NotRegistered(handle)),
        };

        let key = match self.delegate_for(handle) {
            Some(selector) => {
                debug!(fd, %events, "forwarding modify");
                match selector.modify(source, events, data) {
                    Ok(key) => key,
                    Err(err) => {
                        debug!(fd, error = %err, "modify failed, dropping registration");
                        self.map.remove(fd);
                        self.forget_ready(fd);
                        return Err(err);
                    }
                }
            }
            None => {
                debug!(fd, %events, "modify");
                key
            }
        };

        self.map.insert(fd, key.clone());
        Ok(key)
    }

    fn select(&mut self, timeout: Option<Duration>) -> Result<Vec<Fired<T>>> {
        trace!(?timeout, forwarded = self.selector.is_some(), "select");
        match self.selector {
            Some(ref mut selector) => selector.select(timeout),
            None => Ok(self.drain_ready()),
        }
    }

    fn close(&mut self) -> Result<()> {
        trace!(forwarded = self.selector.is_some(), "close");
        match self.selector {
            Some(ref mut selector) => selector.close(),
            None => Ok(()),
        }
    }

    fn get_map(&self) -> &SelectorMap<T> {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::time::Duration;

    use crate::fd;
    use crate::mock::FileMock;
    use super::*;

    type Nested = TestSelector<&'static str, TestSelector<&'static str>>;

    fn devnull() -> File {
        File::open("/dev/null").unwrap()
    }

    #[test]
    fn register_mock() {
        fd::reset();
        let mut selector = TestSelector::new();
        let mock = FileMock::new();

        let key = selector.register(&mock, EventSet::readable(), "data").unwrap();

        assert_eq!(Some(&key), selector.get_map().get(&mock));
        assert_eq!(Some(&key), selector.get_map().get_fd(0));
        assert_eq!(key.handle(), Handle::Synthetic(0));
        assert_eq!(key.data(), &"data");
    }

    #[test]
    fn register_twice() {
        let mut selector = TestSelector::new();
        let mock = FileMock::new();
        let key = selector.register(&mock, EventSet::readable(), "data").unwrap();

        match selector.register(&mock, EventSet::writable(), "other") {
            Err(Error::AlreadyRegistered(h)) => assert_eq!(h, mock.as_handle()),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(selector.get_map().len(), 1);
        assert_eq!(Some(&key), selector.get_map().get(&mock));
    }

    #[test]
    fn register_file_standalone() {
        let mut selector = TestSelector::new();
        let devnull = devnull();

        let key = selector.register(&devnull, EventSet::readable(), "data").unwrap();

        assert_eq!(Some(&key), selector.get_map().get(&devnull));
        assert_eq!(key.handle(), devnull.as_handle());
    }

    #[test]
    fn unregister_then_fail() {
        let mut selector = TestSelector::new();
        let mock = FileMock::new();
        let key = selector.register(&mock, EventSet::readable(), "data").unwrap();

        assert_eq!(selector.unregister(&mock).unwrap(), key);
        assert!(!selector.get_map().contains(&mock));
        assert!(!selector.get_map().contains_fd(mock.fileno()));

        assert!(matches!(selector.unregister(&mock), Err(Error::NotRegistered(_))));
        assert!(matches!(
            selector.modify(&mock, EventSet::writable(), "data"),
            Err(Error::NotRegistered(_))
        ));
    }

    #[test]
    fn reregister_after_unregister() {
        let mut selector = TestSelector::new();
        let mock = FileMock::new();
        selector.register(&mock, EventSet::readable(), "data").unwrap();
        selector.unregister(&mock).unwrap();

        let key = selector.register(&mock, EventSet::writable(), "again").unwrap();
        assert_eq!(key.revision(), 0);
        assert_eq!(Some(&key), selector.get_map().get(&mock));
    }

    #[test]
    fn modify_mock() {
        let mut selector = TestSelector::new();
        let mock = FileMock::new();
        let original = selector.register(&mock, EventSet::readable(), "data").unwrap();

        let rw = EventSet::readable() | EventSet::writable();
        let key = selector.modify(&mock, rw, "data").unwrap();

        assert_ne!(original, key);
        assert_eq!(key.events(), rw);
        assert_eq!(Some(&key), selector.get_map().get(&mock));
    }

    #[test]
    fn modify_unchanged_still_differs() {
        let mut selector = TestSelector::new();
        let mock = FileMock::new();
        let original = selector.register(&mock, EventSet::readable(), "data").unwrap();

        let key = selector.modify(&mock, EventSet::readable(), "data").unwrap();
        assert_ne!(original, key);
    }

    #[test]
    fn nested_forwards_os_handles() {
        let mut selector: Nested = TestSelector::with_selector(TestSelector::new());
        let devnull = devnull();

        let key = selector.register(&devnull, EventSet::readable(), "data").unwrap();
        let inner = selector.selector().unwrap();
        assert_eq!(Some(&key), inner.get_map().get(&devnull));

        let key = selector.modify(&devnull, EventSet::writable(), "data2").unwrap();
        let inner = selector.selector().unwrap();
        assert_eq!(Some(&key), inner.get_map().get(&devnull));
        assert_eq!(Some(&key), selector.get_map().get(&devnull));
    }

    #[test]
    fn nested_keeps_mocks_local() {
        let mut selector: Nested = TestSelector::with_selector(TestSelector::new());
        let mock = FileMock::new();

        selector.register(&mock, EventSet::readable(), "data").unwrap();
        selector.modify(&mock, EventSet::writable(), "data").unwrap();

        assert!(selector.get_map().contains(&mock));
        assert!(selector.selector().unwrap().get_map().is_empty());
    }

    #[test]
    fn nested_unregister_is_local() {
        let mut selector: Nested = TestSelector::with_selector(TestSelector::new());
        let devnull = devnull();

        selector.register(&devnull, EventSet::readable(), "data").unwrap();
        selector.unregister(&devnull).unwrap();

        assert!(!selector.get_map().contains(&devnull));
        assert!(selector.selector().unwrap().get_map().contains(&devnull));
    }

    #[test]
    fn nested_failed_modify_unregisters() {
        let mut selector: Nested = TestSelector::with_selector(TestSelector::new());
        let devnull = devnull();

        selector.register(&devnull, EventSet::readable(), "data").unwrap();
        selector.selector_mut().unwrap().unregister(&devnull).unwrap();

        match selector.modify(&devnull, EventSet::writable(), "data2") {
            Err(Error::NotRegistered(h)) => assert_eq!(h, devnull.as_handle()),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!selector.get_map().contains(&devnull));
    }

    #[test]
    fn select_standalone_is_empty() {
        let mut selector: TestSelector<&'static str> = TestSelector::new();
        assert!(selector.select(None).unwrap().is_empty());
        assert!(selector.select(Some(Duration::from_secs(5))).unwrap().is_empty());
    }

    #[test]
    fn set_ready_reports_subscribed_events() {
        let mut selector = TestSelector::new();
        let a = FileMock::new();
        let b = FileMock::new();
        let key = selector.register(&a, EventSet::readable(), "a").unwrap();
        selector.register(&b, EventSet::readable(), "b").unwrap();

        selector.set_ready(&a, EventSet::readable() | EventSet::writable()).unwrap();
        selector.set_ready(&b, EventSet::writable()).unwrap();

        let fired = selector.select(None).unwrap();
        assert_eq!(fired, vec![Fired::new(key, EventSet::readable())]);
        assert!(selector.select(None).unwrap().is_empty());
    }

    #[test]
    fn set_ready_dropped_after_unregister() {
        let mut selector = TestSelector::new();
        let mock = FileMock::new();
        selector.register(&mock, EventSet::readable(), "data").unwrap();
        selector.set_ready(&mock, EventSet::readable()).unwrap();
        selector.unregister(&mock).unwrap();

        assert!(selector.select(None).unwrap().is_empty());
        assert!(matches!(
            selector.set_ready(&mock, EventSet::readable()),
            Err(Error::NotRegistered(_))
        ));
    }

    #[test]
    fn reregister_starts_without_ready() {
        let mut selector = TestSelector::new();
        let mock = FileMock::new();
        selector.register(&mock, EventSet::readable(), "old").unwrap();
        selector.set_ready(&mock, EventSet::readable()).unwrap();
        selector.unregister(&mock).unwrap();

        selector.register(&mock, EventSet::readable(), "new").unwrap();

        assert!(selector.select(None).unwrap().is_empty());
    }

    #[test]
    fn ready_merges_per_fd() {
        let mut selector = TestSelector::new();
        let mock = FileMock::new();
        let rw = EventSet::readable() | EventSet::writable();
        let key = selector.register(&mock, rw, "data").unwrap();

        selector.set_ready(&mock, EventSet::readable()).unwrap();
        selector.set_ready(&mock, EventSet::writable()).unwrap();

        assert_eq!(selector.select(None).unwrap(), vec![Fired::new(key, rw)]);
    }

    #[test]
    fn ready_refused_when_wrapping() {
        fd::reset();
        let mut selector: Nested = TestSelector::with_selector(TestSelector::new());
        let mock = FileMock::new();
        let devnull = devnull();
        selector.register(&mock, EventSet::readable(), "data").unwrap();
        selector.register(&devnull, EventSet::readable(), "data").unwrap();

        for _ in 0..3 {
            match selector.set_ready(&mock, EventSet::readable()) {
                Err(Error::Wrapping(h)) => assert_eq!(h, mock.as_handle()),
                other => panic!("unexpected result: {:?}", other),
            }
            assert!(matches!(
                selector.set_ready(&devnull, EventSet::readable()),
                Err(Error::Wrapping(_))
            ));
            assert!(selector.select(None).unwrap().is_empty());
        }
        assert!(selector.ready.is_empty());
    }

    #[test]
    fn close_standalone() {
        let mut selector: TestSelector<()> = TestSelector::new();
        selector.close().unwrap();
        assert!(selector.selector().is_none());
    }
}
