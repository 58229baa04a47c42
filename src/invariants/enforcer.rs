// Enforcer - Applies the invariant registry at block end under a fixed severity level
//
// Ignore:  nothing is evaluated
// LogOnly: every invariant is evaluated, each violation is logged, execution continues
// Fatal:   evaluation stops at the first violation and the caller must halt the node

use super::context::BlockContext;
use super::registry::InvariantRegistry;
use crate::types::BlockNumber;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error};

/// Severity applied to invariant violations, fixed at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvariantLevel {
    Ignore,
    #[default]
    LogOnly,
    Fatal,
}

impl fmt::Display for InvariantLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            InvariantLevel::Ignore => "ignore",
            InvariantLevel::LogOnly => "log-only",
            InvariantLevel::Fatal => "fatal",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for InvariantLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" | "none" => Ok(InvariantLevel::Ignore),
            "log-only" | "log" | "error" => Ok(InvariantLevel::LogOnly),
            "fatal" | "panic" => Ok(InvariantLevel::Fatal),
            _ => Err(UnknownLevel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown invariant level '{0}' (expected ignore, log-only or fatal)")]
pub struct UnknownLevel(pub String);

/// A broken invariant at a given height
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invariant broken: {name} at height {height}: {description}")]
pub struct InvariantViolation {
    pub name: String,
    pub height: BlockNumber,
    pub description: String,
}

/// What the block driver must do after enforcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enforcement {
    /// Keep applying blocks; carries the violations that were logged
    Continue { violations: Vec<InvariantViolation> },
    /// Stop the node: state is inconsistent and must not be replicated further
    Halt(InvariantViolation),
}

impl Enforcement {
    pub fn is_halt(&self) -> bool {
        matches!(self, Enforcement::Halt(_))
    }

    /// Converts `Halt` into an error for `?`-style drivers
    pub fn into_result(self) -> Result<Vec<InvariantViolation>, InvariantViolation> {
        match self {
            Enforcement::Continue { violations } => Ok(violations),
            Enforcement::Halt(violation) => Err(violation),
        }
    }
}

pub struct InvariantEnforcer {
    level: InvariantLevel,
    registry: InvariantRegistry,
}

impl InvariantEnforcer {
    pub fn new(level: InvariantLevel, registry: InvariantRegistry) -> Self {
        Self { level, registry }
    }

    pub fn level(&self) -> InvariantLevel {
        self.level
    }

    pub fn registry(&self) -> &InvariantRegistry {
        &self.registry
    }

    /// Runs the registry against the finalized state of a block
    pub fn enforce(&self, ctx: &BlockContext<'_>) -> Enforcement {
        let mut violations = Vec::new();

        if self.level == InvariantLevel::Ignore {
            return Enforcement::Continue { violations };
        }

        for invariant in self.registry.all() {
            let Err(description) = invariant.check(ctx) else {
                continue;
            };

            let violation = InvariantViolation {
                name: invariant.name().to_string(),
                height: ctx.height,
                description,
            };

            match self.level {
                InvariantLevel::Fatal => {
                    error!(
                        height = violation.height,
                        invariant = %violation.name,
                        reason = %violation.description,
                        "Invariant broken, halting"
                    );
                    return Enforcement::Halt(violation);
                }
                _ => {
                    error!(
                        height = violation.height,
                        invariant = %violation.name,
                        reason = %violation.description,
                        "Invariant broken"
                    );
                    violations.push(violation);
                }
            }
        }

        debug!(
            height = ctx.height,
            checked = self.registry.len(),
            broken = violations.len(),
            "Invariants evaluated"
        );
        Enforcement::Continue { violations }
    }
}
