//! Records that can be shown in a coordinated list.

use std::fmt::Debug;
use std::hash::Hash;

/// A server-owned record with a stable key.
///
/// The query coordinator caches lists of these and patches them in place
/// for optimistic updates.
pub trait Record: Clone + Send + Sync + 'static {
    type Key: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    fn key(&self) -> Self::Key;
}
