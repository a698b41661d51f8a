use std::fmt;

use ethsim_common::{Bytes, types::Log};

/// Outcome of one EVM run. `Success` is the only variant that keeps its
/// logs; a reverted or halted run still reports the gas it burned and (for
/// `REVERT`) the returned data, so callers can surface revert reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Success {
        gas_used: u64,
        gas_refunded: u64,
        output: Bytes,
        logs: Vec<Log>,
    },
    /// Reverted by the `REVERT` opcode.
    Revert { gas_used: u64, output: Bytes },
    /// Stopped by an exceptional condition; consumes the reported gas and
    /// returns no data.
    Halt { reason: HaltReason, gas_used: u64 },
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    pub fn gas_used(&self) -> u64 {
        match self {
            ExecutionResult::Success { gas_used, .. }
            | ExecutionResult::Revert { gas_used, .. }
            | ExecutionResult::Halt { gas_used, .. } => *gas_used,
        }
    }

    pub fn output(&self) -> Bytes {
        match self {
            ExecutionResult::Success { output, .. } | ExecutionResult::Revert { output, .. } => {
                output.clone()
            }
            ExecutionResult::Halt { .. } => Bytes::new(),
        }
    }

    pub fn logs(&self) -> Vec<Log> {
        match self {
            ExecutionResult::Success { logs, .. } => logs.clone(),
            _ => vec![],
        }
    }
}

/// Exceptional halts, mirroring the interpreter's failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    OutOfGas,
    InvalidOpcode,
    StackUnderflow,
    StackOverflow,
    InvalidJump,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HaltReason::OutOfGas => "out of gas",
            HaltReason::InvalidOpcode => "invalid opcode",
            HaltReason::StackUnderflow => "stack underflow",
            HaltReason::StackOverflow => "stack overflow",
            HaltReason::InvalidJump => "invalid jump destination",
        };
        f.write_str(name)
    }
}
