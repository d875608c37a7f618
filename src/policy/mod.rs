//! Control policy variants.
//!
//! Every variant implements [`Policy`](crate::core::Policy) and keeps its
//! own memory between ticks:
//!
//! - [`HeuristicPolicy`]: rule-based steering, throttle and gear selection
//! - [`GearShifter`]: RPM hysteresis shared by rule-based variants
//!
//! Any `FnMut(&SensorSnapshot) -> Result<ControlCommand, PolicyError>`
//! closure is a policy as well, which is how learned models or input devices
//! plug in.

mod gear;
mod heuristic;

pub use gear::{DEFAULT_DOWNSHIFT_RPM, DEFAULT_UPSHIFT_RPM, GearShifter};
pub use heuristic::{HeuristicConfig, HeuristicPolicy};
