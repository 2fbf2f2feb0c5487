//! Context-aware fragments for tool descriptions.

use crate::context::{AgentMode, Context};

pub fn context_snippet(context: &Context) -> String {
    let mut lines = vec![format!(
        "Context: agent mode is {}.",
        context.mode
    )];
    match context.account_id {
        Some(id) => lines.push(format!(
            "The operator account is {}. Parameters documented as defaulting to the operator use this account when omitted.",
            id
        )),
        None => lines.push(
            "No operator account is configured, so account parameters must be given explicitly."
                .to_string(),
        ),
    }
    if context.mode == AgentMode::ReturnBytes {
        lines.push("Transactions are not executed in this mode.".to_string());
    }
    lines.join("\n")
}

/// Describe an account parameter that falls back to the operator account.
pub fn account_parameter_description(param: &str, context: &Context) -> String {
    match context.account_id {
        Some(id) => format!(
            "{} (str, optional): Account ID; defaults to the operator account {} if omitted",
            param, id
        ),
        None => format!(
            "{} (str, required): Account ID; there is no operator account to default to",
            param
        ),
    }
}

pub fn scheduling_description(context: &Context) -> String {
    let payer = match context.account_id {
        Some(id) => format!("defaults to the operator account {}", id),
        None => "no default payer is configured".to_string(),
    };
    format!(
        "- scheduling_params (object, optional): create a scheduled transaction instead of executing now:\n    \
         - is_scheduled (bool, default false): if false or omitted, all other scheduling fields are ignored\n    \
         - admin_key (bool or str, optional): true uses the operator key, a string is used as the key; enables deleting the schedule\n    \
         - payer_account_id (str, optional): pays the fee when the transaction executes; {}\n    \
         - expiration_time (str, optional): ISO 8601 time after which the schedule expires\n    \
         - wait_for_expiry (bool, default false): execute at expiration_time rather than once signed; requires expiration_time",
        payer
    )
}

pub fn usage_instructions() -> &'static str {
    "Only pass parameters the user asked for. Omit optional parameters instead of inventing values. Amounts are in display units (e.g. HBAR, not tinybars)."
}

/// Assemble a full tool description.
pub fn describe(context: &Context, summary: &str, params: &[String], schedulable: bool) -> String {
    let mut out = format!("{}\n\n{}\n\nParameters:\n", context_snippet(context), summary);
    for p in params {
        out.push_str("- ");
        out.push_str(p);
        out.push('\n');
    }
    if schedulable {
        out.push_str(&scheduling_description(context));
        out.push('\n');
    }
    out.push('\n');
    out.push_str(usage_instructions());
    out
}
