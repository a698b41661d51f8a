use std::fmt;

use ethsim_common::Bytes;

use crate::{db::DatabaseError, execution_result::ExecutionResult};

/// Selector of `Error(string)`, the encoding `REVERT` uses for require
/// messages.
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// A run that finished with a non-success result. Carries the full result
/// so the RPC boundary can extract revert data and the gas consumed before
/// the failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.message())]
pub struct CallError {
    pub result: ExecutionResult,
}

impl CallError {
    pub fn new(result: ExecutionResult) -> Self {
        Self { result }
    }

    /// The decoded revert reason when the output carries one, the error
    /// name otherwise. This is the `message` field of the RPC error.
    pub fn message(&self) -> String {
        match &self.result {
            ExecutionResult::Revert { output, .. } => match decode_revert_reason(output) {
                Some(reason) => format!("execution reverted: {reason}"),
                None => "execution reverted".to_string(),
            },
            ExecutionResult::Halt { reason, .. } => reason.to_string(),
            ExecutionResult::Success { .. } => "execution successful".to_string(),
        }
    }

    /// The raw return data, the `data` field of the RPC error.
    pub fn data(&self) -> Bytes {
        self.result.output()
    }
}

/// Decodes an ABI-encoded `Error(string)` payload into its message.
pub fn decode_revert_reason(output: &[u8]) -> Option<String> {
    if output.len() < 4 + 32 + 32 || output[..4] != ERROR_STRING_SELECTOR {
        return None;
    }
    let offset = usize_from_word(&output[4..36])?;
    let length_start = 4usize.checked_add(offset)?;
    let data_start = length_start.checked_add(32)?;
    let length = usize_from_word(output.get(length_start..data_start)?)?;
    let data = output.get(data_start..data_start.checked_add(length)?)?;
    String::from_utf8(data.to_vec()).ok()
}

fn usize_from_word(word: &[u8]) -> Option<usize> {
    if word.len() != 32 || word[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(buf)).ok()
}

/// Which override map a validation failure came from. The variant name is
/// part of the error message and therefore of the RPC contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKind {
    State,
    StateDiff,
}

impl fmt::Display for OverrideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverrideKind::State => "State",
            OverrideKind::StateDiff => "StateDiff",
        })
    }
}

/// State override validation failures. The message strings are stable RPC
/// contract and must not be reworded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverrideError {
    #[error("both state and stateDiff overrides specified")]
    ConflictingStorageOverride,
    #[error("{kind} override slot must be a 64 character hex string. Received {length} character string.")]
    SlotLength { kind: OverrideKind, length: usize },
    #[error("{kind} override slot not valid. Received: {value}")]
    SlotNotValid { kind: OverrideKind, value: String },
    #[error("{kind} override data must be a 64 character hex string. Received {length} character string.")]
    DataLength { kind: OverrideKind, length: usize },
    #[error("{kind} override data not valid. Received: {value}")]
    DataNotValid { kind: OverrideKind, value: String },
    #[error("invalid {field} override: {value}")]
    InvalidQuantity { field: &'static str, value: String },
    #[error("invalid code override: {0}")]
    InvalidCode(String),
}

/// Faults internal to the interpreter seam, distinct from in-band
/// `Revert`/`Halt` results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("engine fault: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
    #[error("arithmetic overflow in gas computation")]
    GasOverflow,
}

#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error(transparent)]
    Call(#[from] CallError),
    #[error(transparent)]
    Override(#[from] OverrideError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Internal(#[from] InternalError),
    #[error("access list did not converge after {iterations} iterations")]
    NonConvergence { iterations: usize },
    #[error("simulation was cancelled")]
    Cancelled,
    #[error("simulator was already consumed")]
    Consumed,
}
