//! Transition detection

use super::object::WatchedObject;

/// A transition occurred iff the states differ. Exact comparison, no normalization.
#[inline]
pub fn detect(previous_state: &str, current_state: &str) -> bool {
    previous_state != current_state
}

/// Detect against the state recorded on the object itself
#[inline]
pub fn has_transitioned(object: &WatchedObject) -> bool {
    detect(object.previous_state(), &object.state)
}
