// Tests module
// Governance lifecycle: parameter changes travelling from proposal to store
// Invariant enforcement: block-level checks across the three severity levels
