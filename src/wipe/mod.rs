// Wipe session machinery
//
// Organized structure:
// - state.rs: lifecycle states, ETA and consumer snapshots
// - session.rs: shared, mutex-guarded session state with a watch channel
// - supervisor.rs: process-group launch, stream readers, two-phase cancel
// - progress.rs: dd progress line grammar and percent/ETA math
// - sampler.rs: iostat utilization sampling
// - history.rs: bounded utilization series

pub mod history;
pub mod progress;
pub mod sampler;
pub mod session;
pub mod state;
pub mod supervisor;

pub use history::UtilizationHistory;
pub use progress::{parse_progress_line, percent_complete, ProgressSample};
pub use sampler::{parse_iostat_utilization, UtilizationSampler};
pub use session::WipeSession;
pub use state::{Eta, SessionSnapshot, SessionState};
pub use supervisor::{cancel_session, WipeSupervisor, PARTIAL_ERASE_WARNING};
