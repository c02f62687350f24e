use std::cell::RefCell;
use std::time::Duration;

use swarmwatch_primitives::DurationSinceUnixEpoch;

use super::{Clock, Time};

/// Marker type for the test clock stopped at a settable instant.
#[derive(Debug)]
pub struct StoppedClock;

thread_local! {
    static FIXED_TIME: RefCell<DurationSinceUnixEpoch> = const { RefCell::new(Duration::ZERO) };
}

impl Time for Clock<StoppedClock> {
    fn now() -> DurationSinceUnixEpoch {
        FIXED_TIME.with(|time| *time.borrow())
    }
}

/// Controls for the stopped clock. The fixed time is thread local, so each
/// test owns its own timeline.
pub trait Stopped: Time {
    /// It sets the clock to a given time.
    fn local_set(unix_time: &DurationSinceUnixEpoch);

    /// It sets the clock to the Unix Epoch.
    fn local_set_to_unix_epoch() {
        Self::local_set(&DurationSinceUnixEpoch::ZERO);
    }

    /// It advances the clock by a `Duration`, saturating on overflow.
    fn local_add(duration: &Duration);
}

impl Stopped for Clock<StoppedClock> {
    fn local_set(unix_time: &DurationSinceUnixEpoch) {
        FIXED_TIME.with(|time| {
            *time.borrow_mut() = *unix_time;
        });
    }

    fn local_add(duration: &Duration) {
        FIXED_TIME.with(|time| {
            let advanced = time.borrow().saturating_add(*duration);
            *time.borrow_mut() = advanced;
        });
    }
}
