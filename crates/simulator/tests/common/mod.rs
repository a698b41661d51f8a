//! Shared harness: an in-memory parent store, a blockchain stub and a
//! scriptable engine that drives state access through the simulator's
//! tracked context.

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use ethsim_common::{
    Address, Bytes, H256, U256,
    types::{
        AccountInfo, BlockContext, ChainConfig, Fork, SimulationTransaction, TxKind,
    },
    utils::keccak,
};
use ethsim_simulator::{
    Blockchain, ConsoleLogEvent, Database, DatabaseError, Engine, EngineContext, EngineError,
    ExecutionResult, Observer, StepEvent,
};

/// Test addresses, offset so they never collide with the precompile
/// range.
pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(0xaa00 + n)
}

pub fn key(n: u64) -> H256 {
    H256::from_low_u64_be(n)
}

// ==================== Parent store ====================

#[derive(Default)]
pub struct TestStore {
    pub accounts: FxHashMap<Address, AccountInfo>,
    pub storage: FxHashMap<(Address, H256), U256>,
    pub code: FxHashMap<H256, Bytes>,
}

impl TestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, address: Address, balance: U256, nonce: u64) -> Self {
        let mut info = self.accounts.remove(&address).unwrap_or_default();
        info.balance = balance;
        info.nonce = nonce;
        self.accounts.insert(address, info);
        self
    }

    pub fn with_code(mut self, address: Address, code: Bytes) -> Self {
        let code_hash = keccak(&code);
        let mut info = self.accounts.remove(&address).unwrap_or_default();
        info.code_hash = code_hash;
        self.accounts.insert(address, info);
        self.code.insert(code_hash, code);
        self
    }

    pub fn with_storage(mut self, address: Address, slot: H256, value: U256) -> Self {
        self.accounts.entry(address).or_default();
        self.storage.insert((address, slot), value);
        self
    }
}

impl Database for TestStore {
    fn get_account_info(&self, address: Address) -> Result<Option<AccountInfo>, DatabaseError> {
        Ok(self.accounts.get(&address).cloned())
    }

    fn get_storage_slot(&self, address: Address, key: H256) -> Result<Option<U256>, DatabaseError> {
        Ok(self.storage.get(&(address, key)).copied())
    }

    fn get_code(&self, code_hash: H256) -> Result<Bytes, DatabaseError> {
        self.code
            .get(&code_hash)
            .cloned()
            .ok_or_else(|| DatabaseError::Custom(format!("unknown code hash {code_hash:x}")))
    }

    fn get_block_hash(&self, _number: u64) -> Result<Option<H256>, DatabaseError> {
        Ok(None)
    }
}

// ==================== Blockchain stub ====================

pub struct TestChain {
    pub store: Arc<TestStore>,
    pub config: ChainConfig,
    engine: RefCell<Option<Box<dyn Engine>>>,
}

impl TestChain {
    pub fn new(store: TestStore, fork: Fork, engine: Box<dyn Engine>) -> Self {
        Self {
            store: Arc::new(store),
            config: ChainConfig::from_fork(fork),
            engine: RefCell::new(Some(engine)),
        }
    }

    /// A fresh chain over the same parent store, for follow-up
    /// simulations.
    pub fn successor(&self, engine: Box<dyn Engine>) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            engine: RefCell::new(Some(engine)),
        }
    }
}

impl Blockchain for TestChain {
    fn chain_config(&self) -> Result<ChainConfig, DatabaseError> {
        Ok(self.config.clone())
    }

    fn state_view(&self, _state_root: H256) -> Result<Arc<dyn Database>, DatabaseError> {
        Ok(Arc::clone(&self.store) as Arc<dyn Database>)
    }

    fn create_engine(&self, _fork: Fork) -> Box<dyn Engine> {
        self.engine
            .borrow_mut()
            .take()
            .expect("engine requested twice")
    }
}

// ==================== Scriptable engine ====================

type Script = Box<dyn FnMut(&mut EngineContext<'_>) -> Result<ExecutionResult, EngineError>>;

pub struct ScriptedEngine {
    script: Script,
}

impl ScriptedEngine {
    pub fn boxed(
        script: impl FnMut(&mut EngineContext<'_>) -> Result<ExecutionResult, EngineError> + 'static,
    ) -> Box<dyn Engine> {
        Box::new(Self {
            script: Box::new(script),
        })
    }
}

impl Engine for ScriptedEngine {
    fn execute(&mut self, ctx: &mut EngineContext<'_>) -> Result<ExecutionResult, EngineError> {
        (self.script)(ctx)
    }
}

pub fn success(gas_used: u64) -> ExecutionResult {
    ExecutionResult::Success {
        gas_used,
        gas_refunded: 0,
        output: Bytes::new(),
        logs: vec![],
    }
}

// ==================== Fixtures ====================

pub fn block() -> BlockContext {
    BlockContext {
        number: 1,
        timestamp: 1,
        coinbase: addr(0xc0ffee),
        gas_limit: 30_000_000,
        base_fee_per_gas: Some(7),
        ..Default::default()
    }
}

pub fn call_tx(from: Address, to: Address, gas: u64) -> SimulationTransaction {
    SimulationTransaction {
        from,
        to: TxKind::Call(to),
        gas,
        ..Default::default()
    }
}

// ==================== Recording observer ====================

#[derive(Default)]
pub struct RecordingObserver {
    pub before: AtomicUsize,
    pub after: AtomicUsize,
    pub steps: Mutex<Vec<StepEvent>>,
    pub console: Mutex<Vec<ConsoleLogEvent>>,
}

impl Observer for RecordingObserver {
    fn on_before(&self, _token: ethsim_simulator::ContextToken) {
        self.before.fetch_add(1, Ordering::SeqCst);
    }

    fn on_step(&self, step: &StepEvent, _token: ethsim_simulator::ContextToken) {
        self.steps.lock().unwrap().push(step.clone());
    }

    fn on_console_log(&self, log: &ConsoleLogEvent, _token: ethsim_simulator::ContextToken) {
        self.console.lock().unwrap().push(log.clone());
    }

    fn on_after(&self, _result: &ExecutionResult, _token: ethsim_simulator::ContextToken) {
        self.after.fetch_add(1, Ordering::SeqCst);
    }
}
