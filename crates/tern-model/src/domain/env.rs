use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::KeyValue;

/// Environment handed to a launched process.
///
/// Stored as an ordered list of key–value pairs and serialized as a transparent array.
/// Later entries override earlier ones with the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Env(pub Vec<KeyValue>);

impl Env {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of entries, including overridden ones.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over all key–value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }

    /// Get the value for a key, returning the last matching entry.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|kv| kv.key() == key)
            .map(|kv| kv.value())
    }

    /// Append a key–value pair.
    pub fn push<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.push(KeyValue::new(key, value));
    }

    /// Builder-style [`Env::push`].
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.push(key, value);
        self
    }

    /// Merge two environments, entries from `other` win.
    pub fn merged(&self, other: &Env) -> Env {
        let mut out = self.0.clone();
        out.extend(other.0.iter().cloned());
        Env(out)
    }

    /// Resolve overrides into a sorted map with one value per key.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|kv| (kv.key().to_string(), kv.value().to_string()))
            .collect()
    }

    /// Expand `$NAME` and `${NAME}` references using this environment.
    ///
    /// Unknown variables are left untouched so the receiving shell can still resolve them.
    pub fn expand(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            let (name, consumed) = if let Some(body) = after.strip_prefix('{') {
                match body.find('}') {
                    Some(end) => (&body[..end], end + 2),
                    None => ("", 0),
                }
            } else {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], end)
            };

            match self.get(name) {
                Some(value) if !name.is_empty() => out.push_str(value),
                _ => out.push_str(&rest[pos..pos + 1 + consumed]),
            }
            rest = &after[consumed..];
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Env;

    #[test]
    fn env_push_and_override_last_wins() {
        let mut env = Env::new();
        env.push("FOO", "one");
        env.push("BAR", "x");
        env.push("FOO", "two");

        assert_eq!(env.get("FOO"), Some("two"));
        assert_eq!(env.get("BAR"), Some("x"));
        assert!(env.get("BAZ").is_none());
    }

    #[test]
    fn to_map_keeps_last_value() {
        let env = Env::new().with("A", "1").with("B", "2").with("A", "3");
        let map = env.to_map();

        assert_eq!(map.len(), 2);
        assert_eq!(map["A"], "3");
        assert_eq!(map["B"], "2");
    }

    #[test]
    fn merged_other_overrides_base() {
        let base = Env::new().with("FOO", "base").with("BAR", "bar");
        let other = Env::new().with("FOO", "override");

        let merged = base.merged(&other);
        assert_eq!(merged.get("FOO"), Some("override"));
        assert_eq!(merged.get("BAR"), Some("bar"));
    }

    #[test]
    fn expand_substitutes_known_variables() {
        let env = Env::new()
            .with("TERN_APP_ID", "application_1_0001")
            .with("TERN_APP_NAME", "wordcount");

        assert_eq!(env.expand("--app-id=$TERN_APP_ID"), "--app-id=application_1_0001");
        assert_eq!(env.expand("${TERN_APP_NAME}-x"), "wordcount-x");
        assert_eq!(env.expand("launcher.tar:$TERN_CONF_DIR"), "launcher.tar:$TERN_CONF_DIR");
        assert_eq!(env.expand("cost: $"), "cost: $");
        assert_eq!(env.expand("${UNCLOSED"), "${UNCLOSED");
    }

    #[test]
    fn serde_transparent_roundtrip_json() {
        let env = Env::new().with("FOO", "bar");

        let json = serde_json::to_string(&env).unwrap();
        assert!(json.starts_with('['));

        let back: Env = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("FOO"), Some("bar"));
    }
}
