mod account;
mod block;
mod fork;
mod log;
mod transaction;

pub use account::AccountInfo;
pub use block::BlockContext;
pub use fork::{ChainConfig, Fork};
pub use log::Log;
pub use transaction::{AccessList, AccessListEntry, SimulationTransaction, TxKind};
