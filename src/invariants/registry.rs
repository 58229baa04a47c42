// Registry - Ordered set of named invariant checks
// Populated once during process initialization, then sealed.

use super::context::BlockContext;
use super::runtime::{NonnegativeBalance, PositivePower, SupplyConservation, ValidatorAccumConsistency};

/// A protocol property that must hold after every block.
/// Checks read the context only; they never mutate state.
pub trait Invariant: Send + Sync {
    fn name(&self) -> &str;

    /// `Err` carries a human-readable description of the violation
    fn check(&self, ctx: &BlockContext<'_>) -> Result<(), String>;
}

/// Invariant backed by a plain function or closure
pub struct FnInvariant<F> {
    name: String,
    check: F,
}

impl<F> FnInvariant<F>
where
    F: Fn(&BlockContext<'_>) -> Result<(), String> + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> Invariant for FnInvariant<F>
where
    F: Fn(&BlockContext<'_>) -> Result<(), String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, ctx: &BlockContext<'_>) -> Result<(), String> {
        (self.check)(ctx)
    }
}

#[derive(Default)]
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
    sealed: bool,
}

impl InvariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The node's runtime invariants, sealed, in diagnostic order
    pub fn runtime() -> Self {
        let mut registry = Self::new();
        registry.invariants.push(Box::new(NonnegativeBalance));
        registry.invariants.push(Box::new(ValidatorAccumConsistency));
        registry.invariants.push(Box::new(SupplyConservation));
        registry.invariants.push(Box::new(PositivePower));
        registry.seal();
        registry
    }

    pub fn register<I: Invariant + 'static>(&mut self, invariant: I) -> Result<(), RegistryError> {
        if self.sealed {
            return Err(RegistryError::Sealed(invariant.name().to_string()));
        }
        if self.invariants.iter().any(|i| i.name() == invariant.name()) {
            return Err(RegistryError::DuplicateName(invariant.name().to_string()));
        }
        self.invariants.push(Box::new(invariant));
        Ok(())
    }

    /// Closes the registry; later `register` calls fail
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn all(&self) -> &[Box<dyn Invariant>] {
        &self.invariants
    }

    pub fn names(&self) -> Vec<&str> {
        self.invariants.iter().map(|i| i.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Registry is sealed, cannot register '{0}'")]
    Sealed(String),

    #[error("Invariant '{0}' is already registered")]
    DuplicateName(String),
}
