// Types - Shared ledger primitives
// Principle: Small, exact, serializable

pub mod primitives;
pub mod coin;
pub mod fraction;

pub use primitives::*;
pub use coin::*;
pub use fraction::*;
