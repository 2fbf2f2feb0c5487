//! Ledger-facing types and the client seam.
//!
//! The toolkit never signs or talks to the network itself: tools turn
//! normalized parameters into a [`LedgerOperation`] or [`Query`] and hand it to
//! a [`LedgerClient`].

mod client;
mod evm;
mod ids;
mod key;
mod operation;
mod sandbox;

pub use client::{ExchangeRate, LedgerClient, LedgerError, Query, TopicInfo, TransactionReceipt};
pub use evm::{EvmAddress, EvmAddressError, encode_erc20_transfer};
pub use ids::{
    AccountId, ContractId, EntityId, IdParseError, ScheduleId, TokenId, TopicId, TransactionId,
};
pub use key::{KeyAlgorithm, KeyParseError, PublicKey};
pub use operation::{
    HbarTransfer, LedgerOperation, ScheduleCreate, SupplyType, TokenCreate, TokenType,
};
pub use sandbox::SandboxLedger;
