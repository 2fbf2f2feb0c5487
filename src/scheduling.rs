//! Deferring mutating tools into schedules.
//!
//! Any schedulable tool accepts a `scheduling_params` object. When
//! `is_scheduled` is true, [`apply`] swaps the tool's operation for a
//! `ScheduleCreate` carrying that operation, so the ledger stores it until
//! the required signatures arrive. Otherwise the parameters pass through
//! untouched.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::info;

use crate::context::Context;
use crate::error::{FieldIssue, ValidationError};
use crate::ledger::{AccountId, LedgerOperation, PublicKey, ScheduleCreate};
use crate::normalize::{FlagOrText, ParamReader};
use crate::tools::{NormalizedParams, Request};

pub const FIELD: &str = "scheduling_params";

/// Who may delete the schedule before it executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminKey {
    /// The operator key from the context.
    Operator,
    Key(PublicKey),
}

/// Normalized `scheduling_params`. Every field except `is_scheduled` is inert
/// when `is_scheduled` is false.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchedulingParams {
    pub is_scheduled: bool,
    pub expiration_time: Option<DateTime<Utc>>,
    pub wait_for_expiry: bool,
    pub admin_key: Option<AdminKey>,
    pub payer_account_id: Option<AccountId>,
}

impl SchedulingParams {
    pub fn scheduled() -> Self {
        Self {
            is_scheduled: true,
            ..Default::default()
        }
    }

    /// Read `scheduling_params` from the tool arguments. Absent yields `None`.
    pub fn read(reader: &mut ParamReader<'_>) -> Option<Self> {
        reader.object(FIELD, |r| {
            let is_scheduled = r.optional_bool("is_scheduled").unwrap_or(false);
            let expiration_time = r.optional_timestamp("expiration_time");
            let wait_for_expiry = r.optional_bool("wait_for_expiry").unwrap_or(false);
            let admin_key = read_admin_key(r);
            let payer_account_id = r.optional_id::<AccountId>("payer_account_id");

            if is_scheduled && wait_for_expiry && expiration_time.is_none() && !r.has("expiration_time") {
                r.issue("expiration_time", "is required when wait_for_expiry is true");
            }

            Self {
                is_scheduled,
                expiration_time,
                wait_for_expiry,
                admin_key,
                payer_account_id,
            }
        })
    }
}

fn read_admin_key(r: &mut ParamReader<'_>) -> Option<AdminKey> {
    match r.optional_flag_or_text("admin_key")? {
        FlagOrText::Flag(true) => Some(AdminKey::Operator),
        FlagOrText::Flag(false) => None,
        FlagOrText::Text(s) => match s.parse::<PublicKey>() {
            Ok(key) => Some(AdminKey::Key(key)),
            Err(e) => {
                r.issue("admin_key", e.to_string());
                None
            }
        },
    }
}

/// JSON schema fragment advertised by every schedulable tool.
pub fn schema_property() -> Value {
    json!({
        "type": "object",
        "description": "Optional. Set is_scheduled to true to create a scheduled transaction that executes once every required signature is collected, instead of executing now.",
        "properties": {
            "is_scheduled": {
                "type": "boolean",
                "default": false,
                "description": "If true, the transaction is created as a schedule. If false or omitted, all other scheduling parameters are ignored."
            },
            "admin_key": {
                "type": ["boolean", "string"],
                "default": false,
                "description": "Key that can delete the schedule before it executes. true uses the operator key, a string is used as the key."
            },
            "payer_account_id": {
                "type": "string",
                "description": "Account that pays the fee when the scheduled transaction executes. Defaults to the operator account."
            },
            "expiration_time": {
                "type": "string",
                "description": "ISO 8601 time at which the schedule expires if it has not executed."
            },
            "wait_for_expiry": {
                "type": "boolean",
                "default": false,
                "description": "If true, execute at expiration_time instead of as soon as all signatures are present. Requires expiration_time."
            }
        }
    })
}

/// Redirect a scheduled transaction into a schedule-creation operation.
///
/// Unscheduled parameters are returned unchanged.
pub fn apply(params: NormalizedParams, context: &Context) -> Result<NormalizedParams, ValidationError> {
    let Some(scheduling) = params.scheduling.as_ref().filter(|s| s.is_scheduled) else {
        return Ok(params);
    };

    let operation = match &params.request {
        Request::Transaction(op) if op.is_schedulable() => op.clone(),
        Request::Transaction(op) => {
            return Err(ValidationError::single(
                format!("{}.is_scheduled", FIELD),
                format!("{} cannot be scheduled", op.kind()),
            ));
        }
        Request::Query(_) => {
            return Err(ValidationError::single(
                format!("{}.is_scheduled", FIELD),
                "queries cannot be scheduled",
            ));
        }
    };

    let mut issues = Vec::new();
    let admin_key = match &scheduling.admin_key {
        None => None,
        Some(AdminKey::Key(key)) => Some(key.clone()),
        Some(AdminKey::Operator) => {
            if context.account_public_key.is_none() {
                issues.push(FieldIssue::new(
                    format!("{}.admin_key", FIELD),
                    "is true but no operator public key is configured",
                ));
            }
            context.account_public_key.clone()
        }
    };
    if scheduling.wait_for_expiry && scheduling.expiration_time.is_none() {
        issues.push(FieldIssue::new(
            format!("{}.expiration_time", FIELD),
            "is required when wait_for_expiry is true",
        ));
    }
    if !issues.is_empty() {
        return Err(ValidationError::new(issues));
    }

    let create = ScheduleCreate {
        scheduled: operation,
        admin_key,
        payer_account_id: scheduling.payer_account_id.or(context.account_id),
        expiration_time: scheduling.expiration_time,
        wait_for_expiry: scheduling.wait_for_expiry,
        memo: None,
    };

    info!(
        operation = create.scheduled.kind(),
        wait_for_expiry = create.wait_for_expiry,
        "redirecting to schedule creation"
    );

    Ok(NormalizedParams {
        request: Request::Transaction(LedgerOperation::ScheduleCreate(Box::new(create))),
        scheduling: params.scheduling,
    })
}
