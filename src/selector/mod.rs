use std::collections::hash_map::{
    self,
    HashMap,
};
use std::os::unix::io::RawFd;
use std::time::Duration;

use crate::error::Result;
use crate::event::EventSet;
use crate::handle::{
    AsHandle,
    Handle,
};

pub mod delegating;

pub use self::delegating::TestSelector;

/// The operations of a readiness selector.
///
/// `TestSelector` both implements and wraps this trait, so a test double can
/// sit in front of a real selector or in front of another test double.
pub trait Select<T> {
    /// Starts watching `source` for `events`, associating `data` with it.
    fn register(
        &mut self,
        source: &dyn AsHandle,
        events: EventSet,
        data: T,
    ) -> Result<SelectorKey<T>>;

    /// Stops watching `source`, returning its last key.
    fn unregister(&mut self, source: &dyn AsHandle) -> Result<SelectorKey<T>>;

    /// Replaces the events and data watched for `source`.
    fn modify(
        &mut self,
        source: &dyn AsHandle,
        events: EventSet,
        data: T,
    ) -> Result<SelectorKey<T>>;

    /// Waits up to `timeout` for registered handles to become ready.
    fn select(&mut self, timeout: Option<Duration>) -> Result<Vec<Fired<T>>>;

    fn close(&mut self) -> Result<()>;

    /// The current registrations.
    fn get_map(&self) -> &SelectorMap<T>;
}

impl<T, S> Select<T> for Box<S>
    where S: Select<T> + ?Sized
{
    fn register(
        &mut self,
        source: &dyn AsHandle,
        events: EventSet,
        data: T,
    ) -> Result<SelectorKey<T>> {
        (**self).register(source, events, data)
    }

    fn unregister(&mut self, source: &dyn AsHandle) -> Result<SelectorKey<T>> {
        (**self).unregister(source)
    }

    fn modify(
        &mut self,
        source: &dyn AsHandle,
        events: EventSet,
        data: T,
    ) -> Result<SelectorKey<T>> {
        (**self).modify(source, events, data)
    }

    fn select(&mut self, timeout: Option<Duration>) -> Result<Vec<Fired<T>>> {
        (**self).select(timeout)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn get_map(&self) -> &SelectorMap<T> {
        (**self).get_map()
    }
}

/// A registration: what is watched, for which events, and the caller's data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorKey<T> {
    handle: Handle,
    events: EventSet,
    data: T,
    revision: u64,
}

impl<T> SelectorKey<T> {
    pub fn new(handle: Handle, events: EventSet, data: T) -> SelectorKey<T> {
        SelectorKey {
            handle: handle,
            events: events,
            data: data,
            revision: 0,
        }
    }

    /// Builds the key that replaces `self` after a modification.
    ///
    /// The revision is bumped so the result never equals `self`, even when
    /// `events` and `data` are unchanged.
    pub fn modified(&self, events: EventSet, data: T) -> SelectorKey<T> {
        SelectorKey {
            handle: self.handle,
            events: events,
            data: data,
            revision: self.revision.wrapping_add(1),
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn fd(&self) -> RawFd {
        self.handle.fd()
    }

    pub fn events(&self) -> EventSet {
        self.events
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    /// How many times this registration has been modified locally.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// A handle reported ready by `select`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fired<T> {
    key: SelectorKey<T>,
    evset: EventSet,
}

impl<T> Fired<T> {
    pub fn new(key: SelectorKey<T>, evset: EventSet) -> Fired<T> {
        Fired {
            key: key,
            evset: evset,
        }
    }

    pub fn key(&self) -> &SelectorKey<T> {
        &self.key
    }

    pub fn fd(&self) -> RawFd {
        self.key.fd()
    }

    pub fn evset(&self) -> EventSet {
        self.evset
    }
}

/// Registrations indexed by descriptor.
///
/// A handle and its raw descriptor resolve to the same entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorMap<T> {
    keys: HashMap<RawFd, SelectorKey<T>>,
}

impl<T> SelectorMap<T> {
    pub fn new() -> SelectorMap<T> {
        SelectorMap { keys: HashMap::new() }
    }

    pub fn get(&self, source: &dyn AsHandle) -> Option<&SelectorKey<T>> {
        self.get_fd(source.as_handle().fd())
    }

    pub fn get_fd(&self, fd: RawFd) -> Option<&SelectorKey<T>> {
        self.keys.get(&fd)
    }

    pub fn contains(&self, source: &dyn AsHandle) -> bool {
        self.contains_fd(source.as_handle().fd())
    }

    pub fn contains_fd(&self, fd: RawFd) -> bool {
        self.keys.contains_key(&fd)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> Iter<T> {
        Iter { inner: self.keys.iter() }
    }

    pub(crate) fn insert(&mut self, fd: RawFd, key: SelectorKey<T>) {
        self.keys.insert(fd, key);
    }

    pub(crate) fn remove(&mut self, fd: RawFd) -> Option<SelectorKey<T>> {
        self.keys.remove(&fd)
    }
}

impl<T> Default for SelectorMap<T> {
    fn default() -> SelectorMap<T> {
        SelectorMap::new()
    }
}

impl<'a, T> IntoIterator for &'a SelectorMap<T> {
    type Item = (RawFd, &'a SelectorKey<T>);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// Iterator over the `(descriptor, key)` pairs of a `SelectorMap`.
#[derive(Debug)]
pub struct Iter<'a, T: 'a> {
    inner: hash_map::Iter<'a, RawFd, SelectorKey<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (RawFd, &'a SelectorKey<T>);

    fn next(&mut self) -> Option<(RawFd, &'a SelectorKey<T>)> {
        self.inner.next().map(|(&fd, key)| (fd, key))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modified_key_differs() {
        let key = SelectorKey::new(Handle::Os(3), EventSet::readable(), "data");
        let next = key.modified(EventSet::readable(), "data");
        assert_ne!(key, next);
        assert_eq!(next.revision(), 1);
        assert_eq!(next.handle(), key.handle());
        assert_eq!(next.data(), &"data");
    }

    #[test]
    fn map_lookup_by_handle_and_fd() {
        let mut map = SelectorMap::new();
        let key = SelectorKey::new(Handle::Synthetic(4), EventSet::writable(), ());
        map.insert(4, key.clone());

        assert_eq!(map.get(&Handle::Synthetic(4)), Some(&key));
        assert_eq!(map.get_fd(4), Some(&key));
        assert!(map.contains_fd(4));
        assert!(!map.contains(&Handle::Os(5)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(4, &key)]);

        assert_eq!(map.remove(4), Some(key));
        assert!(map.is_empty());
    }

    #[test]
    fn fired() {
        let key = SelectorKey::new(Handle::Os(6), EventSet::readable(), 1u8);
        let fired = Fired::new(key.clone(), EventSet::readable());
        assert_eq!(fired.fd(), 6);
        assert_eq!(fired.key(), &key);
        assert!(fired.evset().is_readable());
    }
}
