//! Consensus limits the evaluator enforces.

/// Combined main-plus-alt stack depth limit, checked after every step.
pub const MAX_STACK_DEPTH: usize = 1000;

/// Locktime values at or above this are interpreted as unix timestamps
/// rather than block heights.
pub const LOCKTIME_THRESHOLD: i64 = 500_000_000;

/// Per-network consensus limits. Both built-in networks currently share one
/// set of values; the indirection exists so callers configure the evaluator
/// rather than patch constants.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConsensusParams {
    /// Upper bound on the serialized byte length of a single script.
    pub max_script_size: usize,
    /// Upper bound on the byte length of any stack element.
    pub max_script_element_size: usize,
    /// Executed non-push opcodes allowed per script.
    pub max_ops_per_script: u32,
    /// Public keys allowed in one CHECKMULTISIG.
    pub max_pubkeys_per_multisig: usize,
}

const DEFAULT_PARAMS: ConsensusParams = ConsensusParams {
    max_script_size: 10_000,
    max_script_element_size: 520,
    max_ops_per_script: 500,
    max_pubkeys_per_multisig: 20,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Network {
    Main,
    Test,
}

impl Network {
    pub fn params(&self) -> &'static ConsensusParams {
        match self {
            Network::Main | Network::Test => &DEFAULT_PARAMS,
        }
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        DEFAULT_PARAMS
    }
}
