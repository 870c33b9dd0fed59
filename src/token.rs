//! Token store: named shared data cells handlers use to talk to each other.
//!
//! A token name identifies at most one live token. Requesting an existing
//! token either replaces its fields (`reset`) or fills in only the field
//! names it does not have yet, so a late requester never wipes data an
//! earlier handler stored.

use crate::error::EngineError;
use crate::registry::Kind;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// Open field set of a token
pub type Fields = Map<String, Value>;

/// Shared handle to a live token
///
/// Do not hold the lock while requesting the same token again from the
/// store; the lock is not reentrant.
pub type TokenRef = Arc<Mutex<Token>>;

/// A named bag of fields
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    name: String,
    fields: Fields,
}

impl Token {
    pub fn new(name: impl Into<String>, fields: Fields) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Replace every field
    pub fn reset(&mut self, fields: Fields) {
        self.fields = fields;
    }

    /// Add fields that are missing; existing fields keep their values
    pub fn fill(&mut self, fields: Fields) {
        for (key, value) in fields {
            self.fields.entry(key).or_insert(value);
        }
    }
}

/// Build a field set from a JSON object (anything else yields no fields)
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

/// Join list-form token names with `.`
pub fn token_name<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|part| part.as_ref())
        .collect::<Vec<_>>()
        .join(".")
}

/// Store of live tokens
#[derive(Default)]
pub struct TokenStore {
    tokens: Mutex<BTreeMap<String, TokenRef>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a token
    ///
    /// - existing token, `reset`: fields are replaced by `fields`
    /// - existing token, no `reset`: missing field names are added
    /// - missing token, `create`: a token holding `fields` is created
    /// - missing token, no `create`: lookup error
    pub fn token(
        &self,
        name: &str,
        create: bool,
        reset: bool,
        fields: Fields,
    ) -> Result<TokenRef, EngineError> {
        let existing = self.tokens.lock().get(name).cloned();
        if let Some(token) = existing {
            {
                let mut guard = token.lock();
                if reset {
                    trace!(token = name, "Resetting token");
                    guard.reset(fields);
                } else {
                    guard.fill(fields);
                }
            }
            return Ok(token);
        }

        if !create {
            return Err(EngineError::NotRegistered {
                kind: Kind::Token,
                name: name.to_string(),
            });
        }

        trace!(token = name, "Creating token");
        let mut tokens = self.tokens.lock();
        let token = tokens
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Token::new(name, Fields::new()))))
            .clone();
        drop(tokens);
        token.lock().fill(fields);
        Ok(token)
    }

    /// Look up an existing token without touching its fields
    pub fn lookup(&self, name: &str) -> Result<TokenRef, EngineError> {
        self.token(name, false, false, Fields::new())
    }

    /// Drop a token so the name can start over
    pub fn remove(&self, name: &str) -> Option<TokenRef> {
        self.tokens.lock().remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tokens.lock().keys().cloned().collect()
    }
}
