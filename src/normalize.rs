//! Turns loosely-typed agent arguments into domain values.
//!
//! A [`ParamReader`] walks the raw JSON arguments field by field. Each accessor
//! returns a usable value even on failure (a default placeholder) and records a
//! [`FieldIssue`], so one pass reports every problem at once. Call
//! [`ParamReader::finish`] to turn the collected issues into a result.
//!
//! Nothing here performs I/O.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};

use crate::context::{Context, resolve_account};
use crate::error::{FieldIssue, ValidationError};
use crate::ledger::{AccountId, PublicKey};

static EMPTY_ARGS: LazyLock<Map<String, Value>> = LazyLock::new(Map::new);

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A flag that may instead carry a value, like `admin_key: true | "<key>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagOrText {
    Flag(bool),
    Text(String),
}

pub struct ParamReader<'a> {
    args: &'a Map<String, Value>,
    prefix: String,
    issues: Vec<FieldIssue>,
}

impl<'a> ParamReader<'a> {
    /// `null` is read as an empty argument object.
    pub fn new(args: &'a Value) -> Self {
        let mut reader = Self {
            args: &EMPTY_ARGS,
            prefix: String::new(),
            issues: Vec::new(),
        };
        match args {
            Value::Object(map) => reader.args = map,
            Value::Null => {}
            _ => reader.issue_at("arguments", "must be a JSON object"),
        }
        reader
    }

    fn child(&self, args: &'a Map<String, Value>, prefix: String) -> Self {
        Self {
            args,
            prefix,
            issues: Vec::new(),
        }
    }

    fn path(&self, field: &str) -> String {
        format!("{}{}", self.prefix, field)
    }

    fn issue_at(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(FieldIssue::new(path, message));
    }

    /// Record an issue against `field` (relative to this reader).
    pub fn issue(&mut self, field: &str, message: impl Into<String>) {
        let path = self.path(field);
        self.issue_at(path, message);
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// `null` counts as absent.
    fn raw(&self, field: &str) -> Option<&'a Value> {
        self.args.get(field).filter(|v| !v.is_null())
    }

    pub fn has(&self, field: &str) -> bool {
        self.raw(field).is_some()
    }

    pub fn required_string(&mut self, field: &str) -> String {
        match self.optional_string(field) {
            Some(s) => s,
            None => {
                if !self.has(field) {
                    self.issue(field, "is required");
                }
                String::new()
            }
        }
    }

    /// Empty strings are reported, not treated as absent.
    pub fn optional_string(&mut self, field: &str) -> Option<String> {
        match self.raw(field)? {
            Value::String(s) if s.trim().is_empty() => {
                self.issue(field, "must not be empty");
                None
            }
            Value::String(s) => Some(s.clone()),
            _ => {
                self.issue(field, "must be a string");
                None
            }
        }
    }

    /// Accepts booleans and the strings `"true"` / `"false"`.
    pub fn optional_bool(&mut self, field: &str) -> Option<bool> {
        match self.raw(field)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => {
                self.issue(field, "must be a boolean");
                None
            }
        }
    }

    /// Booleans (including `"true"`/`"false"` strings) or any other non-empty string.
    pub fn optional_flag_or_text(&mut self, field: &str) -> Option<FlagOrText> {
        match self.raw(field)? {
            Value::Bool(b) => Some(FlagOrText::Flag(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(FlagOrText::Flag(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(FlagOrText::Flag(false)),
            Value::String(s) if s.trim().is_empty() => {
                self.issue(field, "must not be empty");
                None
            }
            Value::String(s) => Some(FlagOrText::Text(s.clone())),
            _ => {
                self.issue(field, "must be a boolean or a string");
                None
            }
        }
    }

    /// Accepts whole numbers as JSON numbers or numeric strings.
    pub fn optional_integer(&mut self, field: &str) -> Option<i64> {
        let value = self.optional_decimal(field)?;
        if !value.fract().is_zero() {
            self.issue(field, format!("must be a whole number, got {}", value));
            return None;
        }
        match value.to_i64() {
            Some(n) => Some(n),
            None => {
                self.issue(field, "is out of range");
                None
            }
        }
    }

    /// Accepts JSON numbers and numeric strings, including scientific notation.
    pub fn optional_decimal(&mut self, field: &str) -> Option<Decimal> {
        let text = match self.raw(field)? {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            _ => {
                self.issue(field, "must be a number");
                return None;
            }
        };
        match parse_decimal(&text) {
            Some(d) => Some(d),
            None => {
                self.issue(field, format!("must be a number, got {:?}", text));
                None
            }
        }
    }

    pub fn required_decimal(&mut self, field: &str) -> Decimal {
        if !self.has(field) {
            self.issue(field, "is required");
            return Decimal::ZERO;
        }
        self.optional_decimal(field).unwrap_or_default()
    }

    pub fn required_id<T>(&mut self, field: &str) -> T
    where
        T: FromStr + Default,
        T::Err: Display,
    {
        if !self.has(field) {
            self.issue(field, "is required");
            return T::default();
        }
        self.optional_id(field).unwrap_or_default()
    }

    /// Parses identity-like strings (`0.0.800`) into their structured form.
    pub fn optional_id<T>(&mut self, field: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let value = self.raw(field)?;
        self.parse_value(field, value)
    }

    fn parse_value<T>(&mut self, field: &str, value: &Value) -> Option<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Value::String(s) = value else {
            self.issue(field, format!("must be a string, got {}", value));
            return None;
        };
        match s.parse::<T>() {
            Ok(v) => Some(v),
            Err(e) => {
                self.issue(field, e.to_string());
                None
            }
        }
    }

    /// A list of identifiers. A single string is read as a one-element list.
    pub fn id_list<T>(&mut self, field: &str, required: bool) -> Vec<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(value) = self.raw(field) else {
            if required {
                self.issue(field, "is required");
            }
            return Vec::new();
        };
        match value {
            Value::Array(items) => {
                if required && items.is_empty() {
                    self.issue(field, "must contain at least one entry");
                }
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| self.parse_value(&format!("{}[{}]", field, i), item))
                    .collect()
            }
            single => self.parse_value(field, single).into_iter().collect(),
        }
    }

    /// A list of non-empty strings. A single string is read as a one-element list.
    pub fn string_list(&mut self, field: &str, required: bool) -> Vec<String> {
        let Some(value) = self.raw(field) else {
            if required {
                self.issue(field, "is required");
            }
            return Vec::new();
        };
        let items: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };
        if required && items.is_empty() {
            self.issue(field, "must contain at least one entry");
        }
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let path = format!("{}[{}]", field, i);
            match item {
                Value::String(s) if !s.trim().is_empty() => out.push(s.clone()),
                Value::String(_) => self.issue(&path, "must not be empty"),
                other => self.issue(&path, format!("must be a string, got {}", other)),
            }
        }
        out
    }

    /// Read each element of an array of objects with a nested reader whose
    /// issues are reported as `field[i].name`.
    pub fn each_object<T>(
        &mut self,
        field: &str,
        required: bool,
        mut read: impl FnMut(&mut ParamReader<'a>) -> T,
    ) -> Vec<T> {
        let Some(value) = self.raw(field) else {
            if required {
                self.issue(field, "is required");
            }
            return Vec::new();
        };
        let Value::Array(items) = value else {
            self.issue(field, "must be a list of objects");
            return Vec::new();
        };
        if required && items.is_empty() {
            self.issue(field, "must contain at least one entry");
        }

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let path = format!("{}[{}]", field, i);
            let Value::Object(map) = item else {
                self.issue(&path, "must be an object");
                continue;
            };
            let mut child = self.child(map, format!("{}{}.", self.prefix, path));
            out.push(read(&mut child));
            self.issues.append(&mut child.issues);
        }
        out
    }

    /// Read a nested object. Absent or `null` yields `None`.
    pub fn object<T>(
        &mut self,
        field: &str,
        read: impl FnOnce(&mut ParamReader<'a>) -> T,
    ) -> Option<T> {
        let value = self.raw(field)?;
        let Value::Object(map) = value else {
            self.issue(field, "must be an object");
            return None;
        };
        let mut child = self.child(map, self.path(field) + ".");
        let out = read(&mut child);
        self.issues.append(&mut child.issues);
        Some(out)
    }

    /// The explicit account, or the operator account from the context.
    pub fn account_or_default(&mut self, field: &str, context: &Context) -> AccountId {
        let explicit = self.optional_id::<AccountId>(field);
        if explicit.is_none() && self.has(field) {
            // Already reported as malformed.
            return AccountId::default();
        }
        match resolve_account(explicit, context) {
            Some(id) => id,
            None => {
                self.issue(
                    field,
                    "is required because no default account is configured",
                );
                AccountId::default()
            }
        }
    }

    /// Key parameters: `false`/absent means no key, `true` means the operator
    /// key, a string is parsed as a public key.
    pub fn optional_key(&mut self, field: &str, context: &Context) -> Option<PublicKey> {
        match self.optional_flag_or_text(field)? {
            FlagOrText::Flag(false) => None,
            FlagOrText::Flag(true) => {
                if context.account_public_key.is_none() {
                    self.issue(field, "is true but no operator public key is configured");
                }
                context.account_public_key.clone()
            }
            FlagOrText::Text(s) => match s.parse::<PublicKey>() {
                Ok(key) => Some(key),
                Err(e) => {
                    self.issue(field, e.to_string());
                    None
                }
            },
        }
    }

    /// RFC 3339 timestamps; timestamps without an offset are read as UTC.
    pub fn optional_timestamp(&mut self, field: &str) -> Option<DateTime<Utc>> {
        let text = match self.raw(field)? {
            Value::String(s) => s.trim().to_string(),
            other => {
                self.issue(field, format!("must be an ISO 8601 timestamp, got {}", other));
                return None;
            }
        };
        match parse_timestamp(&text) {
            Some(ts) => Some(ts),
            None => {
                self.issue(field, format!("must be an ISO 8601 timestamp, got {:?}", text));
                None
            }
        }
    }

    /// Report `field` if the caller supplied it.
    pub fn forbid(&mut self, field: &str, reason: &str) {
        if self.has(field) {
            self.issue(field, reason.to_string());
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.issues))
        }
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::ledger::TokenId;

    const ED25519_RAW: &str = "e0c8ec2758a5879ffac226a13c0c516b799e72e35141a0dd828f94d37988a4b7";

    #[test]
    fn null_arguments_read_as_empty() {
        let args = Value::Null;
        let mut r = ParamReader::new(&args);
        assert_eq!(r.optional_string("memo"), None);
        assert!(r.finish().is_ok());
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let args = json!([1, 2]);
        let err = ParamReader::new(&args).finish().unwrap_err();
        assert_eq!(err.fields(), vec!["arguments"]);
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let args = json!({});
        let mut r = ParamReader::new(&args);
        let _ = r.required_string("name");
        let _: TokenId = r.required_id("token_id");
        let err = r.finish().unwrap_err();
        assert_eq!(err.fields(), vec!["name", "token_id"]);
        assert!(err.to_string().contains("is required"));
    }

    #[test]
    fn malformed_id_names_field_and_value() {
        let args = json!({"token_id": "abc"});
        let mut r = ParamReader::new(&args);
        let _: TokenId = r.required_id("token_id");
        let err = r.finish().unwrap_err();
        assert_eq!(err.issues[0].field, "token_id");
        assert!(err.issues[0].message.contains("\"abc\""));
    }

    #[test]
    fn decimals_accept_numbers_strings_and_scientific_notation() {
        let args = json!({"a": 1.5, "b": "2.25", "c": 1e-7, "d": "ten"});
        let mut r = ParamReader::new(&args);
        assert_eq!(r.optional_decimal("a"), Some(dec!(1.5)));
        assert_eq!(r.optional_decimal("b"), Some(dec!(2.25)));
        assert_eq!(r.optional_decimal("c"), Some(dec!(0.0000001)));
        assert_eq!(r.optional_decimal("d"), None);
        assert_eq!(r.finish().unwrap_err().fields(), vec!["d"]);
    }

    #[test]
    fn integers_reject_fractions() {
        let args = json!({"n": "12", "m": 1.5});
        let mut r = ParamReader::new(&args);
        assert_eq!(r.optional_integer("n"), Some(12));
        assert_eq!(r.optional_integer("m"), None);
        assert_eq!(r.finish().unwrap_err().fields(), vec!["m"]);
    }

    #[test]
    fn booleans_accept_strings() {
        let args = json!({"a": "true", "b": false, "c": 3});
        let mut r = ParamReader::new(&args);
        assert_eq!(r.optional_bool("a"), Some(true));
        assert_eq!(r.optional_bool("b"), Some(false));
        assert_eq!(r.optional_bool("c"), None);
        assert!(r.finish().is_err());
    }

    #[test]
    fn nested_objects_prefix_their_issues() {
        let args = json!({"transfers": [
            {"account_id": "0.0.800", "amount": 1},
            {"account_id": "not-an-id", "amount": 1},
        ]});
        let mut r = ParamReader::new(&args);
        let ids = r.each_object("transfers", true, |t| {
            t.required_id::<AccountId>("account_id")
        });
        assert_eq!(ids[0], AccountId::new(0, 0, 800));
        let err = r.finish().unwrap_err();
        assert_eq!(err.fields(), vec!["transfers[1].account_id"]);
    }

    #[test]
    fn account_falls_back_to_context() {
        let ctx = Context::default().with_account_id(AccountId::new(0, 0, 2));
        let args = json!({});
        let mut r = ParamReader::new(&args);
        assert_eq!(r.account_or_default("account_id", &ctx), AccountId::new(0, 0, 2));
        assert!(r.finish().is_ok());

        let mut r = ParamReader::new(&args);
        r.account_or_default("account_id", &Context::default());
        assert_eq!(r.finish().unwrap_err().fields(), vec!["account_id"]);
    }

    #[test]
    fn keys_resolve_flags_and_strings() {
        let operator: PublicKey = ED25519_RAW.parse().unwrap();
        let ctx = Context::default().with_public_key(operator.clone());
        let args = json!({"a": true, "b": false, "c": ED25519_RAW, "d": "nope"});
        let mut r = ParamReader::new(&args);

        assert_eq!(r.optional_key("a", &ctx), Some(operator.clone()));
        assert_eq!(r.optional_key("b", &ctx), None);
        assert_eq!(r.optional_key("c", &ctx), Some(operator));
        assert_eq!(r.optional_key("d", &ctx), None);
        assert_eq!(r.finish().unwrap_err().fields(), vec!["d"]);
    }

    #[test]
    fn operator_key_flag_without_configured_key_is_an_issue() {
        let args = json!({"admin_key": true});
        let mut r = ParamReader::new(&args);
        assert_eq!(r.optional_key("admin_key", &Context::default()), None);
        assert_eq!(r.finish().unwrap_err().fields(), vec!["admin_key"]);
    }

    #[test]
    fn timestamps_without_offset_are_utc() {
        let args = json!({"a": "2025-11-11T10:00:00", "b": "2025-11-11T12:00:00+02:00", "c": "soon"});
        let mut r = ParamReader::new(&args);
        let a = r.optional_timestamp("a").unwrap();
        let b = r.optional_timestamp("b").unwrap();
        assert_eq!(a, b);
        assert_eq!(r.optional_timestamp("c"), None);
        assert_eq!(r.finish().unwrap_err().fields(), vec!["c"]);
    }

    #[test]
    fn lists_accept_a_single_string() {
        let args = json!({"ids": "0.0.1", "uris": ["ipfs://a", ""]});
        let mut r = ParamReader::new(&args);
        let ids: Vec<TokenId> = r.id_list("ids", true);
        assert_eq!(ids, vec![TokenId::new(0, 0, 1)]);
        assert_eq!(r.string_list("uris", true), vec!["ipfs://a".to_string()]);
        assert_eq!(r.finish().unwrap_err().fields(), vec!["uris[1]"]);
    }
}
