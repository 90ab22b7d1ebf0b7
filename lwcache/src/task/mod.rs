//! Background tasks of the cache: the per-entry expiration timers and the
//! per-key refresh loops.

pub(crate) mod refresh;
pub(crate) mod timer;
