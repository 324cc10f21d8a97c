use chrono::{DateTime, Utc};

use crate::core::model::{ComponentState, ContainerState};

/// Anything with a container lifecycle that can be put in display order.
pub trait Lifecycle {
    fn lifecycle(&self) -> Option<&ContainerState>;
}

impl Lifecycle for ComponentState {
    fn lifecycle(&self) -> Option<&ContainerState> {
        self.state.as_ref()
    }
}

impl Lifecycle for ContainerState {
    fn lifecycle(&self) -> Option<&ContainerState> {
        Some(self)
    }
}

/// Sort key: started components first, ordered by when they started; a
/// terminated component uses its start time, not its finish time.
/// Components that have not started (waiting, or no known state) go last
/// and compare equal to each other.
fn sort_key(state: Option<&ContainerState>) -> (bool, Option<DateTime<Utc>>) {
    match state {
        Some(ContainerState::Running { started_at }) => (false, *started_at),
        Some(ContainerState::Terminated { started_at, .. }) => (false, *started_at),
        Some(ContainerState::Waiting { .. }) | None => (true, None),
    }
}

/// Orders steps or sidecars for display. Stable: ties keep input order.
pub fn order_by_start<C: Lifecycle>(components: &mut [C]) {
    components.sort_by_key(|c| sort_key(c.lifecycle()));
}
