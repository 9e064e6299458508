use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Environment variables passed to a unit.
///
/// Stored as an ordered map so rendered plans are stable between runs.
/// Serialized transparently, which reads naturally as a TOML inline table (`env = { SHELL = "/bin/bash" }`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitEnv(pub BTreeMap<String, String>);

impl UnitEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Create an environment containing a single variable.
    pub fn single<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Self::new();
        env.set(key, value);
        env
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Set a variable, replacing any previous value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), value.into());
    }

    /// Merge two environments; entries from `other` win.
    pub fn merged(&self, other: &UnitEnv) -> UnitEnv {
        let mut out = self.0.clone();
        out.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        UnitEnv(out)
    }

    /// Apply `f` to every value, keeping keys untouched.
    pub fn map_values<E>(&self, mut f: impl FnMut(&str) -> Result<String, E>) -> Result<UnitEnv, E> {
        let mut out = BTreeMap::new();
        for (k, v) in &self.0 {
            out.insert(k.clone(), f(v)?);
        }
        Ok(UnitEnv(out))
    }
}

impl<K, V> FromIterator<(K, V)> for UnitEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::UnitEnv;

    #[test]
    fn env_new_is_empty() {
        let env = UnitEnv::new();
        assert_eq!(env.len(), 0);
        assert!(env.get("FOO").is_none());
    }

    #[test]
    fn env_single_creates_one_entry() {
        let env = UnitEnv::single("SHELL", "/bin/bash");
        let items: Vec<_> = env.iter().collect();
        assert_eq!(items, vec![("SHELL", "/bin/bash")]);
    }

    #[test]
    fn env_set_overrides_previous_value() {
        let mut env = UnitEnv::new();
        env.set("FOO", "one");
        env.set("BAR", "x");
        env.set("FOO", "two");

        assert_eq!(env.get("FOO"), Some("two"));
        assert_eq!(env.get("BAR"), Some("x"));
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn env_merged_other_overrides_base() {
        let base: UnitEnv = [("FOO", "base"), ("BAR", "bar")].into_iter().collect();
        let other: UnitEnv = [("FOO", "override"), ("BAZ", "baz")].into_iter().collect();

        let merged = base.merged(&other);

        assert_eq!(merged.get("FOO"), Some("override"));
        assert_eq!(merged.get("BAR"), Some("bar"));
        assert_eq!(merged.get("BAZ"), Some("baz"));
    }

    #[test]
    fn env_map_values_stops_on_first_error() {
        let env: UnitEnv = [("A", "ok"), ("B", "bad")].into_iter().collect();
        let res = env.map_values(|v| if v == "bad" { Err(v.to_string()) } else { Ok(v.to_uppercase()) });
        assert_eq!(res, Err("bad".to_string()));
    }

    #[test]
    fn env_reads_from_toml_inline_table() {
        #[derive(serde::Deserialize)]
        struct Holder {
            env: UnitEnv,
        }
        let h: Holder = toml::from_str(r#"env = { SHELL = "/bin/bash", HOME = "/home/frappe" }"#).unwrap();
        assert_eq!(h.env.get("SHELL"), Some("/bin/bash"));
        let keys: Vec<_> = h.env.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["HOME", "SHELL"]);
    }
}
