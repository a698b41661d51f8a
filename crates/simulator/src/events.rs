use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use ethsim_common::{Address, Bytes, U256};

use crate::{
    constants::{CONSOLE_ADDRESS, CONSOLE_LOG_STRING_SELECTOR, opcodes},
    execution_result::ExecutionResult,
};

static NEXT_CONTEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Correlates events with the simulation that produced them. Tokens are
/// allocated from a process-wide counter; equality, not identity, is the
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextToken(u64);

impl ContextToken {
    pub(crate) fn next() -> Self {
        Self(NEXT_CONTEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// One interpreter step. The stack is bottom-up: the top of the stack is
/// the last element.
#[derive(Debug, Clone)]
pub struct StepEvent {
    pub pc: usize,
    pub opcode: u8,
    pub gas_remaining: u64,
    pub depth: usize,
    pub stack: Vec<U256>,
    pub memory: Vec<u8>,
}

/// A call into the console pseudo-contract. `message` is filled for the
/// `log(string)` selector; `data` always carries the raw calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLogEvent {
    pub data: Bytes,
    pub message: Option<String>,
}

/// Subscriber to the four simulation channels. Delivery is synchronous
/// with the interpreter, so implementations must not block in ways that
/// would reorder steps.
pub trait Observer: Send + Sync {
    fn on_before(&self, _token: ContextToken) {}
    fn on_step(&self, _step: &StepEvent, _token: ContextToken) {}
    fn on_console_log(&self, _log: &ConsoleLogEvent, _token: ContextToken) {}
    fn on_after(&self, _result: &ExecutionResult, _token: ContextToken) {}
}

/// Fans events out to the simulation's observers, tagged with its token.
pub struct EventHub {
    observers: Vec<Arc<dyn Observer>>,
    token: ContextToken,
}

impl EventHub {
    pub fn new(observers: Vec<Arc<dyn Observer>>) -> Self {
        Self {
            observers,
            token: ContextToken::next(),
        }
    }

    pub fn token(&self) -> ContextToken {
        self.token
    }

    pub(crate) fn before(&self) {
        for observer in &self.observers {
            observer.on_before(self.token);
        }
    }

    pub(crate) fn step(&self, step: &StepEvent) {
        for observer in &self.observers {
            observer.on_step(step, self.token);
        }
        if let Some(log) = console_log_from_step(step) {
            for observer in &self.observers {
                observer.on_console_log(&log, self.token);
            }
        }
    }

    pub(crate) fn after(&self, result: &ExecutionResult) {
        for observer in &self.observers {
            observer.on_after(result, self.token);
        }
    }
}

/// Recognizes a CALL-family step targeting the console address and
/// extracts its calldata from the step's stack and memory view.
fn console_log_from_step(step: &StepEvent) -> Option<ConsoleLogEvent> {
    // Stack top-down: gas, address, then (for CALL/CALLCODE) a value word
    // before the argument offset and size.
    let (args_offset_depth, args_size_depth) = match step.opcode {
        opcodes::CALL | opcodes::CALLCODE => (4, 5),
        opcodes::DELEGATECALL | opcodes::STATICCALL => (3, 4),
        _ => return None,
    };

    let target = stack_peek(&step.stack, 2)?;
    if Address::from(ethsim_common::utils::u256_to_h256(target)) != CONSOLE_ADDRESS {
        return None;
    }

    let offset = stack_peek(&step.stack, args_offset_depth)?;
    let size = stack_peek(&step.stack, args_size_depth)?;
    if offset > U256::from(u32::MAX) || size > U256::from(u32::MAX) {
        return None;
    }
    let offset = offset.as_u64() as usize;
    let size = size.as_u64() as usize;
    let data = step
        .memory
        .get(offset..offset.checked_add(size)?)
        .map(|slice| Bytes::from(slice.to_vec()))
        .unwrap_or_default();

    let message = decode_log_string(&data);
    Some(ConsoleLogEvent { data, message })
}

fn stack_peek(stack: &[U256], depth: usize) -> Option<U256> {
    stack.len().checked_sub(depth).map(|i| stack[i])
}

fn decode_log_string(data: &[u8]) -> Option<String> {
    if data.len() < 4 + 32 + 32 || data[..4] != CONSOLE_LOG_STRING_SELECTOR {
        return None;
    }
    let offset = U256::from_big_endian(&data[4..36]);
    if offset > U256::from(u32::MAX) {
        return None;
    }
    let length_start = 4usize.checked_add(offset.as_u64() as usize)?;
    let data_start = length_start.checked_add(32)?;
    let length = U256::from_big_endian(data.get(length_start..data_start)?);
    if length > U256::from(u32::MAX) {
        return None;
    }
    let text = data.get(data_start..data_start.checked_add(length.as_u64() as usize)?)?;
    String::from_utf8(text.to_vec()).ok()
}
