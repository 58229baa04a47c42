// Governance - Tiered proposal parameters, tally rules and proposal lifecycle
// Principle: Parameters are validated as a whole set before they can reach the store

pub mod procedure;
pub mod params;
pub mod tally;
pub mod proposals;

pub use procedure::*;
pub use params::*;
pub use tally::*;
pub use proposals::*;
