// Lineup optimizer core: pool, synergy graph and constraint models, the
// greedy seed, the search engine, the validator and the result assembler.
// Pure and synchronous; every call builds its own structures from plain data.

pub mod completion;
pub mod constraints;
pub mod error;
pub mod optimize;
pub mod pool;
pub mod report;
pub mod search;
pub mod seed;
pub mod synergy;
pub mod validate;

pub use constraints::RosterSlotSpec;
pub use error::{InputError, LineupError, OptimizeError};
pub use optimize::{optimize, Lineup, LineupSlot, OptimizeRequest, Optimized};
pub use pool::Player;
pub use report::{LineupReport, ReportOptions};
pub use search::{SearchLimits, SearchStats, Strategy, Termination};
pub use synergy::SynergyEdge;
