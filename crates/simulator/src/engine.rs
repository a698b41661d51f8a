use ethsim_common::{
    Address, Bytes, H256, U256,
    types::{AccountInfo, TxKind},
};

use crate::{
    db::{DatabaseError, OverlayState},
    environment::Environment,
    errors::EngineError,
    events::{EventHub, StepEvent},
    execution_result::ExecutionResult,
    substate::Substate,
};

/// Parameters of the top-level message call.
#[derive(Debug, Clone)]
pub struct CallParams {
    pub caller: Address,
    pub to: TxKind,
    pub value: U256,
    pub data: Bytes,
    pub gas_limit: u64,
}

/// The opcode interpreter seam.
///
/// The blockchain engine supplies an implementation bound to the chain
/// rules of the simulated block; the simulator never looks inside it. All
/// state the interpreter reads or writes flows through [`EngineContext`]
/// so the overlay and the access tracker observe every touch.
pub trait Engine {
    fn execute(&mut self, ctx: &mut EngineContext<'_>) -> Result<ExecutionResult, EngineError>;
}

/// Everything an [`Engine`] may see or do during one run: the call
/// parameters, the environment, tracked state access, and step event
/// emission.
pub struct EngineContext<'a> {
    pub call: &'a CallParams,
    pub env: &'a Environment,
    pub(crate) state: &'a mut OverlayState,
    pub(crate) substate: &'a mut Substate,
    pub(crate) events: &'a EventHub,
}

impl EngineContext<'_> {
    /// Reads an account, recording the touch. Returns the info and
    /// whether the access was cold.
    pub fn access_account(
        &mut self,
        address: Address,
    ) -> Result<(AccountInfo, bool), DatabaseError> {
        let was_cold = self.substate.add_touched_account(address);
        let info = self.state.get_account_info(address)?;
        Ok((info, was_cold))
    }

    /// Reads a storage slot, recording the touch. Returns the value and
    /// whether the access was cold.
    pub fn access_storage_slot(
        &mut self,
        address: Address,
        key: H256,
    ) -> Result<(U256, bool), DatabaseError> {
        let was_cold = self.substate.add_touched_slot(address, key);
        let value = self.state.get_storage_slot(address, key)?;
        Ok((value, was_cold))
    }

    /// Writes a storage slot. SSTORE touches the slot like a read does.
    pub fn write_storage_slot(
        &mut self,
        address: Address,
        key: H256,
        value: U256,
    ) -> Result<bool, DatabaseError> {
        let was_cold = self.substate.add_touched_slot(address, key);
        self.state.set_storage_slot(address, key, value)?;
        Ok(was_cold)
    }

    /// Code of the account at `address`, recording the account touch
    /// (EXTCODE* semantics).
    pub fn code_of(&mut self, address: Address) -> Result<Bytes, DatabaseError> {
        self.substate.add_touched_account(address);
        self.state.get_code(address)
    }

    pub fn is_account_warm(&self, address: Address) -> bool {
        self.substate.is_account_warm(address)
    }

    pub fn is_slot_warm(&self, address: Address, key: H256) -> bool {
        self.substate.is_slot_warm(address, key)
    }

    pub fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), DatabaseError> {
        self.state.add_balance(address, amount)
    }

    pub fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), DatabaseError> {
        self.state.sub_balance_saturating(address, amount)
    }

    pub fn increment_nonce(&mut self, address: Address) -> Result<u64, DatabaseError> {
        self.state.increment_nonce(address)
    }

    pub fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), DatabaseError> {
        self.state.set_code(address, code)
    }

    pub fn block_hash(&self, number: u64) -> Result<Option<H256>, DatabaseError> {
        self.state.get_block_hash(number)
    }

    /// Emits one step event, synchronously with the interpreter. Calls
    /// into the console pseudo-contract are detected here and surfaced on
    /// the console channel as well.
    pub fn step(&self, step: &StepEvent) {
        self.events.step(step);
    }
}
