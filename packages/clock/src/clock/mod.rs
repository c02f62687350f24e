use std::time::Duration;

use swarmwatch_primitives::DurationSinceUnixEpoch;

pub mod stopped;
pub mod working;

/// A generic structure that represents a clock.
///
/// It can be either the working clock (production) or the stopped clock
/// (testing). It implements the `Time` trait, which gives you the current
/// time.
#[derive(Debug)]
pub struct Clock<T> {
    clock: std::marker::PhantomData<T>,
}

/// The working clock. It returns the current time.
pub type Working = Clock<working::WorkingClock>;
/// The stopped clock. It always returns the same fixed time.
pub type Stopped = Clock<stopped::StoppedClock>;

/// Trait for types that can be used as a timestamp clock.
pub trait Time: Sized {
    fn now() -> DurationSinceUnixEpoch;

    /// The current time as whole unix seconds, the unit all staleness and
    /// backoff arithmetic is done in.
    #[must_use]
    fn now_secs() -> u64 {
        Self::now().as_secs()
    }

    #[must_use]
    fn now_add(add_time: &Duration) -> Option<DurationSinceUnixEpoch> {
        Self::now().checked_add(*add_time)
    }

    #[must_use]
    fn now_sub(sub_time: &Duration) -> Option<DurationSinceUnixEpoch> {
        Self::now().checked_sub(*sub_time)
    }
}
