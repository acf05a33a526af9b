//! Process-local environment table
//!
//! The sequencer never touches the global process environment. It keeps its
//! own table, seeded from the invoking process, and hands the whole table to
//! every child it spawns. Names and values are kept as raw `OsString`s so
//! that variables which are not valid UTF-8 pass through unchanged.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::{OsStr, OsString};

/// Variables bash manages itself and that always differ after a run.
const SHELL_INTERNAL: &[&str] = &["_", "SHLVL", "PWD", "OLDPWD", "BASH_EXECUTION_STRING"];

/// Environment variables passed to each step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<OsString, OsString>,
}

impl Environment {
    /// Capture the environment of the current process.
    pub fn inherit() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    pub fn get_os(&self, name: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(name.as_ref()).map(OsString::as_os_str)
    }

    /// Value of `name`, if set and valid UTF-8.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_os(name).and_then(OsStr::to_str)
    }

    pub fn set(&mut self, name: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn unset(&mut self, name: impl AsRef<OsStr>) {
        self.vars.remove(name.as_ref());
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    /// Apply the changes a sourced script made.
    pub fn apply(&mut self, delta: &EnvDelta) {
        for name in &delta.unset {
            self.vars.remove(name);
        }
        for (name, value) in &delta.set {
            self.vars.insert(name.clone(), value.clone());
        }
    }

    /// Compute what changed between `self` and `after`.
    pub fn diff(&self, after: &Environment) -> EnvDelta {
        let set = after
            .vars
            .iter()
            .filter(|(k, v)| self.vars.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let unset = self
            .vars
            .keys()
            .filter(|k| !after.vars.contains_key(*k))
            .cloned()
            .collect();
        EnvDelta { set, unset }
    }

    /// Parse the NUL-separated output of `env -0`.
    ///
    /// Entries without `=` are ignored. Bytes are kept as-is.
    pub fn from_env_dump(dump: &[u8]) -> Self {
        let vars = dump
            .split(|b| *b == 0)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let eq = entry.iter().position(|b| *b == b'=')?;
                Some((os_from_bytes(&entry[..eq]), os_from_bytes(&entry[eq + 1..])))
            })
            .collect();
        Self { vars }
    }
}

#[cfg(unix)]
fn os_from_bytes(bytes: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    OsStr::from_bytes(bytes).to_os_string()
}

#[cfg(not(unix))]
fn os_from_bytes(bytes: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(bytes).into_owned())
}

impl<K: Into<OsString>, V: Into<OsString>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Variables added, changed, or removed by a sourced script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvDelta {
    pub set: BTreeMap<OsString, OsString>,
    pub unset: BTreeSet<OsString>,
}

impl EnvDelta {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    /// New value of `name`, if the script set it to valid UTF-8.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.set.get(OsStr::new(name)).and_then(|v| v.to_str())
    }

    pub fn removes(&self, name: &str) -> bool {
        self.unset.contains(OsStr::new(name))
    }

    /// Drop shell bookkeeping variables from the delta.
    pub fn without_shell_internals(mut self) -> Self {
        for name in SHELL_INTERNAL {
            self.set.remove(OsStr::new(name));
            self.unset.remove(OsStr::new(name));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_dump() {
        let env = Environment::from_env_dump(b"A=1\0B=x=y\0broken\0\0EMPTY=\0");
        assert_eq!(env.get("A"), Some("1"));
        assert_eq!(env.get("B"), Some("x=y"));
        assert_eq!(env.get("EMPTY"), Some(""));
        assert_eq!(env.get("broken"), None);
        assert_eq!(env.len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_env_dump_keeps_non_utf8_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let env = Environment::from_env_dump(b"LATIN1=caf\xe9\0A=1\0");
        assert_eq!(
            env.get_os("LATIN1").map(OsStr::as_bytes),
            Some(&b"caf\xe9"[..])
        );
        // not readable as &str, but still present
        assert_eq!(env.get("LATIN1"), None);
        assert_eq!(env.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_value_survives_diff_and_apply() {
        use std::os::unix::ffi::OsStrExt;

        let before = Environment::default();
        let after = Environment::from_env_dump(b"LATIN1=caf\xe9\0");
        let delta = before.diff(&after);

        let mut applied = before.clone();
        applied.apply(&delta);
        assert_eq!(
            applied.get_os("LATIN1").map(OsStr::as_bytes),
            Some(&b"caf\xe9"[..])
        );
    }

    #[test]
    fn test_diff_and_apply() {
        let before: Environment = [("KEEP", "1"), ("CHANGE", "old"), ("GONE", "x")]
            .into_iter()
            .collect();
        let after: Environment = [("KEEP", "1"), ("CHANGE", "new"), ("ADDED", "y")]
            .into_iter()
            .collect();

        let delta = before.diff(&after);
        assert_eq!(delta.set.len(), 2);
        assert_eq!(delta.get("CHANGE"), Some("new"));
        assert!(delta.removes("GONE"));

        let mut applied = before.clone();
        applied.apply(&delta);
        assert_eq!(applied, after);
    }

    #[test]
    fn test_shell_internals_filtered() {
        let before: Environment = [("SHLVL", "1")].into_iter().collect();
        let after: Environment = [("SHLVL", "2"), ("_", "/usr/bin/env"), ("CC", "gcc")]
            .into_iter()
            .collect();
        let delta = before.diff(&after).without_shell_internals();
        assert_eq!(delta.set.len(), 1);
        assert_eq!(delta.get("CC"), Some("gcc"));
    }
}
