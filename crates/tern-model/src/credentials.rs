use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::error::ModelResult;

/// Opaque security token, e.g. a storage delegation token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Token type, such as `"storage-delegation"`.
    pub kind: String,
    /// Service the token grants access to.
    pub service: String,
    pub identifier: Vec<u8>,
    pub password: Vec<u8>,
}

impl Token {
    pub fn new(
        kind: impl Into<String>,
        service: impl Into<String>,
        identifier: Vec<u8>,
        password: Vec<u8>,
    ) -> Self {
        Self {
            kind: kind.into(),
            service: service.into(),
            identifier,
            password,
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("kind", &self.kind)
            .field("service", &self.service)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Aggregated tokens and secret keys of the submitting identity.
///
/// Grows only through [`CredentialSet::add_token`], [`CredentialSet::add_secret`]
/// and [`CredentialSet::merge`]; nothing is ever removed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSet {
    #[serde(default)]
    tokens: BTreeMap<String, Token>,
    #[serde(default)]
    secrets: BTreeMap<String, Vec<u8>>,
}

impl CredentialSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a token under `alias`, replacing a previous one with the same alias.
    pub fn add_token(&mut self, alias: impl Into<String>, token: Token) {
        self.tokens.insert(alias.into(), token);
    }

    pub fn add_secret(&mut self, alias: impl Into<String>, secret: Vec<u8>) {
        self.secrets.insert(alias.into(), secret);
    }

    /// Union with `other`. Aliases already present are kept; only missing
    /// ones are taken from `other`.
    pub fn merge(&mut self, other: &CredentialSet) {
        for (alias, token) in &other.tokens {
            self.tokens
                .entry(alias.clone())
                .or_insert_with(|| token.clone());
        }
        for (alias, secret) in &other.secrets {
            self.secrets
                .entry(alias.clone())
                .or_insert_with(|| secret.clone());
        }
    }

    pub fn token(&self, alias: &str) -> Option<&Token> {
        self.tokens.get(alias)
    }

    pub fn tokens(&self) -> impl Iterator<Item = (&str, &Token)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn secret(&self, alias: &str) -> Option<&[u8]> {
        self.secrets.get(alias).map(Vec::as_slice)
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.secrets.is_empty()
    }

    /// Serialized form handed to the launched process.
    pub fn to_bytes(&self) -> ModelResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> ModelResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("tokens", &self.tokens.keys().collect::<Vec<_>>())
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(service: &str) -> Token {
        Token::new("storage-delegation", service, vec![1, 2], vec![3, 4])
    }

    #[test]
    fn merge_is_a_union_and_existing_aliases_win() {
        let mut base = CredentialSet::new();
        base.add_token("fs", token("old"));
        base.add_secret("k", vec![9]);

        let mut other = CredentialSet::new();
        other.add_token("fs", token("new"));
        other.add_token("rm", token("rm:8032"));
        other.add_secret("k", vec![1]);
        other.add_secret("j", vec![2]);

        base.merge(&other);

        assert_eq!(base.token_count(), 2);
        assert_eq!(base.token("fs").unwrap().service, "old");
        assert_eq!(base.token("rm").unwrap().service, "rm:8032");
        assert_eq!(base.secret("k"), Some(&[9u8][..]));
        assert_eq!(base.secret("j"), Some(&[2u8][..]));
    }

    #[test]
    fn bytes_roundtrip() {
        let mut set = CredentialSet::new();
        set.add_token("fs", token("nn:8020"));

        let back = CredentialSet::from_bytes(&set.to_bytes().unwrap()).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn debug_does_not_leak_passwords() {
        let mut set = CredentialSet::new();
        set.add_token("fs", token("nn:8020"));
        let dbg = format!("{set:?} {:?}", set.token("fs").unwrap());
        assert!(!dbg.contains("[3, 4]"));
    }
}
