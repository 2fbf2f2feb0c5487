use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static ENTITY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").expect("valid entity id regex"));

static TRANSACTION_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+\.\d+\.\d+)@(\d+)\.(\d{1,9})$").expect("valid transaction id regex")
});

/// Error returned when a string is not a well-formed identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id {value:?}")]
pub struct IdParseError {
    pub kind: &'static str,
    pub value: String,
}

/// `shard.realm.num` triple shared by every ledger entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EntityId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl EntityId {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }

    fn parse(value: &str, kind: &'static str) -> Result<Self, IdParseError> {
        let err = || IdParseError {
            kind,
            value: value.to_string(),
        };
        let caps = ENTITY_ID_RE.captures(value.trim()).ok_or_else(err)?;
        let part = |i: usize| caps[i].parse::<u64>().map_err(|_| err());
        Ok(Self::new(part(1)?, part(2)?, part(3)?))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub EntityId);

        impl $name {
            pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
                Self(EntityId::new(shard, realm, num))
            }

            pub fn num(&self) -> u64 {
                self.0.num
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                EntityId::parse(s, $kind).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

entity_id!(
    /// An account on the ledger.
    AccountId,
    "account"
);
entity_id!(
    /// A fungible or non-fungible token class.
    TokenId,
    "token"
);
entity_id!(
    /// A consensus topic.
    TopicId,
    "topic"
);
entity_id!(
    /// A pending scheduled operation.
    ScheduleId,
    "schedule"
);
entity_id!(
    /// A deployed smart contract.
    ContractId,
    "contract"
);

/// Payer account plus valid-start timestamp, rendered as
/// `shard.realm.num@seconds.nanos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransactionId {
    pub account_id: AccountId,
    pub valid_start_seconds: i64,
    pub valid_start_nanos: u32,
}

impl TransactionId {
    pub fn new(account_id: AccountId, valid_start_seconds: i64, valid_start_nanos: u32) -> Self {
        Self {
            account_id,
            valid_start_seconds,
            valid_start_nanos,
        }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}.{:09}",
            self.account_id, self.valid_start_seconds, self.valid_start_nanos
        )
    }
}

impl FromStr for TransactionId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || IdParseError {
            kind: "transaction",
            value: s.to_string(),
        };
        let caps = TRANSACTION_ID_RE.captures(s.trim()).ok_or_else(err)?;
        let account_id = caps[1].parse::<AccountId>().map_err(|_| err())?;
        let seconds = caps[2].parse::<i64>().map_err(|_| err())?;
        // Fractional digits are a fraction of a second, not a nanosecond count.
        let fraction = &caps[3];
        let nanos = format!("{:0<9}", fraction).parse::<u32>().map_err(|_| err())?;
        Ok(Self::new(account_id, seconds, nanos))
    }
}

impl Serialize for TransactionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
