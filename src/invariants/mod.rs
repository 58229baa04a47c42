// Invariants - Cross-module consistency checks run after every block
// Principle: a replicated ledger must never silently diverge from its own bookkeeping

pub mod context;
pub mod enforcer;
pub mod registry;
pub mod runtime;
pub mod snapshot;

pub use context::*;
pub use enforcer::*;
pub use registry::*;
pub use runtime::*;
pub use snapshot::*;
