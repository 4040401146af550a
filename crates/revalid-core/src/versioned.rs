//! Versioned page props
//!
//! A page may edit its props locally (optimistic updates) while regenerated
//! props keep arriving from the server. Each value carries the server-clock
//! time it represents; older server data never overwrites newer state.

use crate::Timestamp;

/// Latest accepted page props with their version
#[derive(Clone, Debug, PartialEq)]
pub struct VersionedProps<P> {
    value: P,
    version: Timestamp,
}

impl<P> VersionedProps<P> {
    /// Start from server props generated at `time`
    pub fn new(value: P, time: Timestamp) -> Self {
        VersionedProps {
            value,
            version: time,
        }
    }

    /// Offer props generated at `time`.
    /// Accepted when newer than the held version, or when unversioned.
    /// Returns whether the value was replaced.
    pub fn offer(&mut self, value: P, time: Timestamp) -> bool {
        if time > self.version || time.is_zero() {
            self.value = value;
            self.version = time;
            true
        } else {
            false
        }
    }

    /// Local edit, versioned at `server_now`, the server-clock equivalent
    /// of the client's current time
    pub fn set(&mut self, value: P, server_now: Timestamp) {
        self.version = server_now;
        self.value = value;
    }

    /// Local edit derived from the current value
    pub fn update<F>(&mut self, f: F, server_now: Timestamp)
    where
        F: FnOnce(&P) -> P,
    {
        let next = f(&self.value);
        self.set(next, server_now);
    }

    pub fn get(&self) -> &P {
        &self.value
    }

    pub fn version(&self) -> Timestamp {
        self.version
    }

    pub fn into_inner(self) -> P {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_offer_accepts_only_newer() {
        let mut props = VersionedProps::new("a", Timestamp(100));

        assert!(!props.offer("old", Timestamp(50)));
        assert!(!props.offer("same", Timestamp(100)));
        assert_eq!(*props.get(), "a");

        assert!(props.offer("b", Timestamp(150)));
        assert_eq!(*props.get(), "b");
        assert_eq!(props.version(), Timestamp(150));
    }

    #[test]
    fn test_unversioned_offer_always_wins() {
        let mut props = VersionedProps::new(1, Timestamp(100));
        assert!(props.offer(2, Timestamp::ZERO));
        assert_eq!(*props.get(), 2);
    }

    #[test]
    fn test_local_edit_blocks_older_server_data() {
        let mut props = VersionedProps::new(1, Timestamp(100));

        // Client clock runs 40ms ahead of the server
        props.update(|v| v + 10, Timestamp(1_040).offset_by(-40));
        assert_eq!(*props.get(), 11);
        assert_eq!(props.version(), Timestamp(1_000));

        assert!(!props.offer(5, Timestamp(900)));
        assert!(props.offer(6, Timestamp(1_001)));
        assert_eq!(props.into_inner(), 6);
    }

    proptest! {
        #[test]
        fn prop_version_only_drops_for_unversioned_offers(
            start in 1i64..10_000,
            offers in proptest::collection::vec(0i64..10_000, 1..50),
        ) {
            let mut props = VersionedProps::new(0usize, Timestamp(start));
            for (i, time) in offers.into_iter().enumerate() {
                let before = props.version();
                let accepted = props.offer(i + 1, Timestamp(time));

                if time == 0 {
                    prop_assert!(accepted);
                    prop_assert_eq!(props.version(), Timestamp::ZERO);
                } else {
                    prop_assert_eq!(accepted, Timestamp(time) > before);
                    prop_assert!(props.version() >= before);
                }
                if accepted {
                    prop_assert_eq!(*props.get(), i + 1);
                }
            }
        }
    }
}
