// Agent Lifecycle Module - duty cycle and mission task state machines
//
// Agents move offline → online → {busy, on-site} → online → offline.
// Tasks move pending → en-route → on-site → completed, or to failed from any open state.

pub mod state_machine;
pub mod task_status;

pub use state_machine::{event_towards, state_for, status_of, DutyCycle, DutyEvent, State as DutyState};
pub use task_status::MissionStatus;
