// Access token value object

use chrono::{Duration, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::provider::Provider;
use crate::error::{KronosError, Result};

/// Textual format of `issued_at`, in persisted records and internally
pub const ISSUED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static ISSUED_AT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}$").unwrap()
});

/// An issued bearer credential.
///
/// Immutable: a refresh produces a new `Token` rather than updating this one.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    subject: Option<String>,
    issued_at: NaiveDateTime,
    value: String,
    lifetime_seconds: Option<u64>,
    refresh_token: Option<String>,
}

impl Token {
    /// Validate a raw token record.
    ///
    /// Required: `token` (or `access_token`) and `issued_at`. Optional:
    /// `expires_in`, `refresh_token`, `username`.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let obj = payload
            .as_object()
            .ok_or_else(|| KronosError::Validation("token data must be an object".to_string()))?;

        let value = obj
            .get("token")
            .or_else(|| obj.get("access_token"))
            .ok_or_else(|| missing_key("token"))?;
        let value = parse_value(value)?;

        let issued_at = obj.get("issued_at").ok_or_else(|| missing_key("issued_at"))?;
        let issued_at = parse_issued_at(issued_at)?;

        let lifetime_seconds = match obj.get("expires_in") {
            None | Some(Value::Null) => None,
            Some(v) => Some(parse_lifetime("expires_in", v)?),
        };

        Ok(Self {
            subject: optional_string(obj, "username")?,
            issued_at,
            value,
            lifetime_seconds,
            refresh_token: optional_string(obj, "refresh_token")?,
        })
    }

    /// Build a token from a login response: issued now, living for the
    /// server-reported `ttl`
    pub fn from_login_response(provider: &Provider, now: NaiveDateTime, payload: &Value) -> Result<Self> {
        Self::derive(provider, now, payload, None)
    }

    /// Like [`Token::from_login_response`], but a `refresh_token` omitted by the
    /// server is carried over from `previous`
    pub fn from_refresh_response(
        provider: &Provider,
        now: NaiveDateTime,
        payload: &Value,
        previous: &Token,
    ) -> Result<Self> {
        Self::derive(provider, now, payload, Some(previous))
    }

    fn derive(
        provider: &Provider,
        now: NaiveDateTime,
        payload: &Value,
        previous: Option<&Token>,
    ) -> Result<Self> {
        let mut data: Map<String, Value> = payload
            .as_object()
            .cloned()
            .ok_or_else(|| KronosError::Validation("token response must be an object".to_string()))?;

        data.insert("username".to_string(), Value::from(provider.username()));
        data.insert(
            "issued_at".to_string(),
            Value::from(now.format(ISSUED_AT_FORMAT).to_string()),
        );
        let ttl = match data.get("ttl") {
            None | Some(Value::Null) => Value::Null,
            Some(v) => Value::from(parse_lifetime("ttl", v)?),
        };
        data.insert("expires_in".to_string(), ttl);

        if let Some(previous) = previous {
            if !data.contains_key("refresh_token") {
                let carried = previous.refresh_token.clone().map_or(Value::Null, Value::from);
                data.insert("refresh_token".to_string(), carried);
            }
        }

        Self::from_payload(&Value::Object(data))
    }

    /// Decode a persisted record produced by [`Token::to_json`]
    pub fn from_json(text: &str) -> Result<Self> {
        let payload: Value = serde_json::from_str(text).map_err(|e| {
            KronosError::Serialization(format!("unable to decode JSON from storage: {}", e))
        })?;
        if !payload.is_object() {
            return Err(KronosError::Serialization(
                "stored token is not a JSON object".to_string(),
            ));
        }

        Self::from_payload(&payload)
    }

    /// Flat record: `issued_at`, `access_token`, `expires_in` and, when known,
    /// `refresh_token` and `username`
    pub fn to_json(&self) -> String {
        let mut data = Map::new();
        data.insert(
            "issued_at".to_string(),
            Value::from(self.issued_at.format(ISSUED_AT_FORMAT).to_string()),
        );
        data.insert("access_token".to_string(), Value::from(self.value.as_str()));
        data.insert(
            "expires_in".to_string(),
            self.lifetime_seconds.map_or(Value::Null, Value::from),
        );
        if let Some(ref refresh_token) = self.refresh_token {
            data.insert("refresh_token".to_string(), Value::from(refresh_token.as_str()));
        }
        if let Some(ref subject) = self.subject {
            data.insert("username".to_string(), Value::from(subject.as_str()));
        }

        Value::Object(data).to_string()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn issued_at(&self) -> NaiveDateTime {
        self.issued_at
    }

    /// The credential presented in the `Bearer` header
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn lifetime_seconds(&self) -> Option<u64> {
        self.lifetime_seconds
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// `issued_at + lifetime`, or `None` for a token that never expires
    pub fn expires_at(&self) -> Option<NaiveDateTime> {
        let lifetime = i64::try_from(self.lifetime_seconds?).ok()?;
        self.issued_at.checked_add_signed(Duration::try_seconds(lifetime)?)
    }

    /// True once `now` reaches the expiry instant. A token without a declared
    /// lifetime never expires.
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at().is_some_and(|expires_at| now >= expires_at)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("subject", &self.subject)
            .field("issued_at", &self.issued_at)
            .field("value", &"[censored]")
            .field("lifetime_seconds", &self.lifetime_seconds)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[censored]"))
            .finish()
    }
}

fn missing_key(key: &str) -> KronosError {
    KronosError::Validation(format!("missing key \"{}\"", key))
}

fn require_string<'a>(key: &str, v: &'a Value) -> Result<&'a str> {
    v.as_str()
        .ok_or_else(|| KronosError::Validation(format!("\"{}\" must be string", key)))
}

// access-token = 1*VSCHAR, VSCHAR = %x20-7E
fn parse_value(v: &Value) -> Result<String> {
    let value = require_string("token", v)?;
    if value.is_empty() || !value.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
        return Err(KronosError::Validation("invalid \"token\"".to_string()));
    }
    Ok(value.to_string())
}

fn parse_issued_at(v: &Value) -> Result<NaiveDateTime> {
    let text = require_string("issued_at", v)?;
    if !ISSUED_AT_PATTERN.is_match(text) {
        return Err(KronosError::Validation("invalid \"issued_at\"".to_string()));
    }
    NaiveDateTime::parse_from_str(text, ISSUED_AT_FORMAT)
        .map_err(|_| KronosError::Validation("invalid \"issued_at\"".to_string()))
}

fn parse_lifetime(key: &str, v: &Value) -> Result<u64> {
    match v.as_u64() {
        Some(0) => Err(KronosError::Validation(format!("invalid {:?}", key))),
        Some(seconds) => Ok(seconds),
        None if v.is_i64() => Err(KronosError::Validation(format!("invalid {:?}", key))),
        None => Err(KronosError::Validation(format!("{:?} must be int", key))),
    }
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => require_string(key, v).map(|s| Some(s.to_string())),
    }
}
