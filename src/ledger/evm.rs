use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::{AccountId, EntityId};

/// `transfer(address,uint256)`
const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvmAddressError {
    #[error("address must be 0x followed by 40 hex digits or an account id, got {0:?}")]
    Malformed(String),
}

/// A 20-byte EVM address.
///
/// Parses either `0x`-prefixed hex or a `shard.realm.num` entity id, which
/// maps to its long-zero address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EvmAddress([u8; 20]);

impl EvmAddress {
    pub fn from_entity(id: EntityId) -> Self {
        let mut bytes = [0u8; 20];
        bytes[..4].copy_from_slice(&(id.shard as u32).to_be_bytes());
        bytes[4..12].copy_from_slice(&id.realm.to_be_bytes());
        bytes[12..].copy_from_slice(&id.num.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl From<AccountId> for EvmAddress {
    fn from(id: AccountId) -> Self {
        Self::from_entity(id.0)
    }
}

impl FromStr for EvmAddress {
    type Err = EvmAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let malformed = || EvmAddressError::Malformed(s.to_string());
        if let Some(digits) = s.strip_prefix("0x") {
            let mut bytes = [0u8; 20];
            hex::decode_to_slice(digits, &mut bytes).map_err(|_| malformed())?;
            return Ok(Self(bytes));
        }
        s.parse::<AccountId>()
            .map(Self::from)
            .map_err(|_| malformed())
    }
}

impl fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for EvmAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Call data for an ERC-20 `transfer(to, amount)`.
pub fn encode_erc20_transfer(to: &EvmAddress, amount: u128) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 2 * WORD);
    data.extend_from_slice(&ERC20_TRANSFER_SELECTOR);

    let mut word = [0u8; WORD];
    word[WORD - 20..].copy_from_slice(to.as_bytes());
    data.extend_from_slice(&word);

    let mut word = [0u8; WORD];
    word[WORD - 16..].copy_from_slice(&amount.to_be_bytes());
    data.extend_from_slice(&word);
    data
}
