use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use ethsim_common::{
    Address, H256, U256, serde_utils,
    types::{AccessList, BlockContext, ChainConfig, Fork, SimulationTransaction, TxKind},
};

use crate::{
    constants::{MAX_ACCESS_LIST_ITERATIONS, precompile_addresses},
    db::{Database, DatabaseError, OverlayState},
    engine::{CallParams, Engine, EngineContext},
    environment::Environment,
    errors::{CallError, InternalError, SimulatorError},
    events::{EventHub, Observer},
    execution_result::{ExecutionResult, HaltReason},
    gas,
    overrides::{self, StateOverrideSet},
    substate::{Substate, canonicalize},
};

/// What the blockchain engine lends a simulation: a read-only state view
/// pinned to a block's state root, the chain's fork schedule, and an
/// interpreter configured for those rules.
pub trait Blockchain {
    fn chain_config(&self) -> Result<ChainConfig, DatabaseError>;

    /// Shallow copy of the state trie at `state_root`. Shares the
    /// underlying key-value reads; the simulation's writes never reach it.
    fn state_view(&self, state_root: H256) -> Result<Arc<dyn Database>, DatabaseError>;

    fn create_engine(&self, fork: Fork) -> Box<dyn Engine>;
}

/// `eth_createAccessList` response: the converged list and the gas a
/// transaction carrying it would use (execution + intrinsic + list fee).
/// A non-success execution keeps its list and reports the failure in
/// `error`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListResult {
    pub access_list: AccessList,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub gas_used: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Single-use transaction simulator.
///
/// Construction runs the whole pre-execution phase: state overlay setup
/// behind an isolation checkpoint, intrinsic gas accounting, EIP-2929
/// pre-warming, override application and the sender's nonce bump and
/// upfront gas debit. [`Simulator::run`] then answers `eth_call`,
/// [`Simulator::create_access_list`] answers `eth_createAccessList`;
/// either consumes the simulator.
pub struct Simulator {
    state: OverlayState,
    substate: Substate,
    engine: Box<dyn Engine>,
    env: Environment,
    call: CallParams,
    intrinsic_gas: u64,
    /// Protocol-warmed addresses that never belong in a generated access
    /// list: the caller and the precompiles.
    exclusion: HashSet<Address>,
    /// The callee: listed only when storage keys were touched for it.
    storage_only: HashSet<Address>,
    seed_list: Option<AccessList>,
    init_error: Option<HaltReason>,
    events: EventHub,
    consumed: bool,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator").finish_non_exhaustive()
    }
}

impl Simulator {
    /// Builds the simulator and runs the initialization phase.
    ///
    /// Override validation failures reject construction; an execution
    /// budget below the intrinsic cost is recorded instead, making the
    /// eventual `run` report `out of gas` without ever invoking the
    /// interpreter.
    pub fn new(
        blockchain: &dyn Blockchain,
        block: &BlockContext,
        tx: &SimulationTransaction,
        state_overrides: Option<&StateOverrideSet>,
        observers: Vec<Arc<dyn Observer>>,
    ) -> Result<Self, SimulatorError> {
        let config = blockchain.chain_config()?;
        let fork = config.fork(block.number, block.timestamp);

        let store = blockchain.state_view(block.state_root)?;
        let mut state = OverlayState::new(store);
        let engine = blockchain.create_engine(fork);
        let events = EventHub::new(observers);

        // The isolation barrier: never committed, never reverted. No
        // write below this point can reach the parent store.
        state.checkpoint();

        let intrinsic_gas = gas::intrinsic_gas(&tx.data, tx.to.is_create(), fork)?;

        let mut env = Environment {
            origin: tx.from,
            gas_limit: 0,
            gas_price: tx.gas_price,
            chain_id: config.chain_id,
            fork,
            block: block.clone(),
        };
        let mut call = CallParams {
            caller: tx.from,
            to: tx.to.clone(),
            value: tx.value,
            data: tx.data.clone(),
            gas_limit: 0,
        };

        if tx.gas < intrinsic_gas {
            debug!(
                gas = tx.gas,
                intrinsic_gas, "transaction cannot cover its intrinsic cost"
            );
            return Ok(Self {
                state,
                substate: Substate::default(),
                engine,
                env,
                call,
                intrinsic_gas,
                exclusion: HashSet::new(),
                storage_only: HashSet::new(),
                seed_list: None,
                init_error: Some(HaltReason::OutOfGas),
                events,
                consumed: false,
            });
        }

        let gas_limit = tx.gas - intrinsic_gas;
        env.gas_limit = gas_limit;
        call.gas_limit = gas_limit;

        // [EIP-2929] pre-warm the caller, the callee and the precompiles.
        let mut substate = Substate::default();
        let mut exclusion = HashSet::new();
        let mut storage_only = HashSet::new();
        if fork >= Fork::Berlin {
            substate.add_touched_account(tx.from);
            exclusion.insert(tx.from);
            if let TxKind::Call(callee) = &tx.to {
                substate.add_touched_account(*callee);
                storage_only.insert(*callee);
            }
            for precompile in precompile_addresses(fork) {
                substate.add_touched_account(precompile);
                exclusion.insert(precompile);
            }
        }

        if let Some(overrides) = state_overrides {
            for (address, account_override) in overrides {
                let validated = overrides::validate(account_override)?;
                overrides::apply_account_override(&mut state, *address, &validated)?;
            }
        }

        // [EIP-2930] a transaction-supplied list is warmed up front.
        let seed_list = tx.access_list.clone();
        if fork >= Fork::Berlin {
            if let Some(list) = &seed_list {
                substate.warm_access_list(list);
            }
        }

        // The sender pays up front: nonce bump plus gas × gasPrice, so
        // CREATE addresses and balance reads observe post-debit values.
        let upfront_cost = U256::from(tx.gas)
            .checked_mul(tx.gas_price)
            .ok_or(InternalError::GasOverflow)?;
        state.increment_nonce(tx.from)?;
        state.sub_balance_saturating(tx.from, upfront_cost)?;

        debug!(
            caller = ?tx.from,
            to = ?tx.to.to(),
            gas_limit,
            intrinsic_gas,
            fork = %fork,
            "simulation initialized"
        );

        Ok(Self {
            state,
            substate,
            engine,
            env,
            call,
            intrinsic_gas,
            exclusion,
            storage_only,
            seed_list,
            init_error: None,
            events,
            consumed: false,
        })
    }

    pub fn context_token(&self) -> crate::events::ContextToken {
        self.events.token()
    }

    pub fn intrinsic_gas(&self) -> u64 {
        self.intrinsic_gas
    }

    /// Executes the call once. Success returns the result; anything else
    /// is raised as a [`CallError`] carrying the full result so revert
    /// data stays extractable.
    pub fn run(&mut self) -> Result<ExecutionResult, SimulatorError> {
        if self.consumed {
            return Err(SimulatorError::Consumed);
        }
        self.consumed = true;

        let result = self.run_once()?;
        if result.is_success() {
            Ok(result)
        } else {
            Err(CallError::new(result).into())
        }
    }

    /// Finds the access list fixed point: run, harvest the touched set,
    /// warm it, repeat until two consecutive runs touch the same set.
    ///
    /// Every iteration executes against the initialization baseline (the
    /// sender already debited) under its own checkpoint, reverted before
    /// the next round. `seed` falls back to the transaction's own access
    /// list; if that list is already optimal a single iteration confirms
    /// it. Cancellation is honored at iteration boundaries only.
    pub async fn create_access_list(
        &mut self,
        seed: Option<AccessList>,
        cancel: CancellationToken,
    ) -> Result<AccessListResult, SimulatorError> {
        if self.consumed {
            return Err(SimulatorError::Consumed);
        }
        self.consumed = true;

        // Pre-Berlin rules have no warm sets to speak of: degrade to a
        // single run and an empty list.
        if self.env.fork < Fork::Berlin && self.init_error.is_none() {
            let result = self.run_once()?;
            let gas_used = result
                .gas_used()
                .checked_add(self.intrinsic_gas)
                .ok_or(InternalError::GasOverflow)?;
            return Ok(AccessListResult {
                access_list: vec![],
                gas_used,
                error: execution_error_message(&result),
            });
        }

        let seed = seed.or_else(|| self.seed_list.clone()).unwrap_or_default();
        let mut previous = canonicalize(&seed);

        for iteration in 0..MAX_ACCESS_LIST_ITERATIONS {
            if cancel.is_cancelled() {
                return Err(SimulatorError::Cancelled);
            }

            self.reset_substate(&previous);
            self.state.checkpoint();
            let outcome = self.run_once();
            let current = self
                .substate
                .make_access_list(&self.exclusion, &self.storage_only);
            self.state.revert();
            let result = outcome?;

            if canonicalize(&current) == previous {
                let data_fee = gas::access_list_data_fee(&current)?;
                let gas_used = result
                    .gas_used()
                    .checked_add(self.intrinsic_gas)
                    .and_then(|gas| gas.checked_add(data_fee))
                    .ok_or(InternalError::GasOverflow)?;
                debug!(iterations = iteration + 1, gas_used, "access list converged");
                return Ok(AccessListResult {
                    access_list: current,
                    gas_used,
                    error: execution_error_message(&result),
                });
            }

            previous = canonicalize(&current);

            // Iteration boundary: the only suspension point, where other
            // tasks may run.
            tokio::task::yield_now().await;
        }

        warn!(
            iterations = MAX_ACCESS_LIST_ITERATIONS,
            "access list generation did not converge"
        );
        Err(SimulatorError::NonConvergence {
            iterations: MAX_ACCESS_LIST_ITERATIONS,
        })
    }

    /// One EVM pass: `before`, execution with live step events, `after`
    /// on success. A recorded initialization error short-circuits to a
    /// synthesized result without invoking the interpreter.
    fn run_once(&mut self) -> Result<ExecutionResult, SimulatorError> {
        self.events.before();

        if let Some(reason) = self.init_error {
            return Ok(ExecutionResult::Halt {
                reason,
                gas_used: 0,
            });
        }

        let mut ctx = EngineContext {
            call: &self.call,
            env: &self.env,
            state: &mut self.state,
            substate: &mut self.substate,
            events: &self.events,
        };
        let result = self.engine.execute(&mut ctx)?;

        if result.is_success() {
            self.events.after(&result);
        }
        Ok(result)
    }

    /// Restores the substate to the pre-execution warm set: caller,
    /// callee and precompiles, plus the access list being confirmed this
    /// iteration.
    fn reset_substate(&mut self, warm: &BTreeMap<Address, BTreeSet<H256>>) {
        self.substate.clear();
        for address in self.exclusion.iter().chain(self.storage_only.iter()) {
            self.substate.add_touched_account(*address);
        }
        for (address, keys) in warm {
            self.substate.add_touched_account(*address);
            for key in keys {
                self.substate.add_touched_slot(*address, *key);
            }
        }
    }
}

fn execution_error_message(result: &ExecutionResult) -> Option<String> {
    if result.is_success() {
        None
    } else {
        Some(CallError::new(result.clone()).message())
    }
}
