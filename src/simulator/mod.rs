// Simulator module - THE CONTROL SURFACE
// Context object, send history and the scheduler task that drives them

mod config;
mod context;
mod handle;
mod history;

pub use config::SimulatorConfig;
pub use context::{Simulator, SimulatorSnapshot, TickSummary};
pub use handle::{run, spawn, Command, HandleError, SimulatorHandle};
pub use history::{LineSource, SendHistory, SentLine};
