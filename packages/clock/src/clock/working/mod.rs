use std::time::SystemTime;

use swarmwatch_primitives::DurationSinceUnixEpoch;

use super::{Clock, Time};

/// Marker type for the production clock backed by the system time.
#[derive(Debug)]
pub struct WorkingClock;

impl Time for Clock<WorkingClock> {
    fn now() -> DurationSinceUnixEpoch {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("the system time should be after the unix epoch")
    }
}
