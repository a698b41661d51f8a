//! Transaction simulation core of the ethsim development node.
//!
//! A [`simulator::Simulator`] executes a single transaction against an
//! ephemeral, checkpointed copy of chain state. It backs the two read-only
//! RPC queries `eth_call` (return value and gas) and `eth_createAccessList`
//! (the access list that would minimize gas, found by fixed-point
//! iteration).
//!
//! Nothing a simulation does survives it: the state overlay diverts every
//! write into a per-simulation cache that is never flushed to the parent
//! store.

pub mod constants;
pub mod db;
pub mod engine;
pub mod environment;
pub mod errors;
pub mod events;
pub mod execution_result;
pub mod gas;
pub mod overrides;
pub mod simulator;
pub mod substate;

pub use db::{Database, DatabaseError, OverlayState};
pub use engine::{CallParams, Engine, EngineContext};
pub use environment::Environment;
pub use errors::{CallError, EngineError, OverrideError, SimulatorError};
pub use events::{ConsoleLogEvent, ContextToken, Observer, StepEvent};
pub use execution_result::{ExecutionResult, HaltReason};
pub use overrides::{AccountOverride, StateOverrideSet};
pub use simulator::{AccessListResult, Blockchain, Simulator};
pub use substate::{Substate, access_lists_equal};
