// SPDX-License-Identifier: MIT OR Apache-2.0
//! The argv builder used by every subcommand surface.

use std::fmt;

/// An ordered argv under construction.
///
/// Every builder operation appends at the end, so the final vector reflects
/// the exact order of the calls. Optional values that are absent append
/// nothing at all: the engine never sees an empty token.
///
/// ```
/// use gantry_core::Command;
///
/// let mut cmd = Command::new(["docker", "container", "run"]);
/// cmd.add_flag("--detach", true)
///     .add_simple_arg("--name", Some("web"))
///     .add_simple_arg("--hostname", None::<&str>)
///     .append("nginx");
/// assert_eq!(
///     cmd.into_vec(),
///     vec!["docker", "container", "run", "--detach", "--name", "web", "nginx"]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    args: Vec<String>,
}

impl Command {
    /// Start a command from a prefix of tokens.
    pub fn new<I, T>(prefix: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            args: prefix.into_iter().map(Into::into).collect(),
        }
    }

    /// Append one token.
    pub fn append(&mut self, token: impl Into<String>) -> &mut Self {
        self.args.push(token.into());
        self
    }

    /// Append `name` when `on` is true; no-op otherwise.
    pub fn add_flag(&mut self, name: &str, on: bool) -> &mut Self {
        if on {
            self.args.push(name.to_string());
        }
        self
    }

    /// Append `name` followed by the formatted value when present.
    pub fn add_simple_arg<V: fmt::Display>(&mut self, name: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.args.push(name.to_string());
            self.args.push(value.to_string());
        }
        self
    }

    /// Append `name value` once per element, preserving input order.
    pub fn add_args_iterable<I, V>(&mut self, name: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        for value in values {
            self.args.push(name.to_string());
            self.args.push(value.to_string());
        }
        self
    }

    /// Append `name k=v` once per pair, preserving iteration order.
    pub fn add_args_mapping<I, K, V>(&mut self, name: &str, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: fmt::Display,
        V: fmt::Display,
    {
        for (key, value) in pairs {
            self.args.push(name.to_string());
            self.args.push(format!("{key}={value}"));
        }
        self
    }

    /// Append each token of `tokens`.
    pub fn extend<I, T>(&mut self, tokens: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.args.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// The tokens accumulated so far.
    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    /// Number of tokens accumulated so far.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether no token has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Consume the builder and return the argv.
    pub fn into_vec(self) -> Vec<String> {
        self.args
    }
}

impl From<Command> for Vec<String> {
    fn from(cmd: Command) -> Self {
        cmd.into_vec()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn prefix_is_preserved() {
        let cmd = Command::new(["docker", "volume", "create"]);
        assert_eq!(cmd.as_slice(), ["docker", "volume", "create"]);
    }

    #[test]
    fn flag_true_appends_once() {
        let mut cmd = Command::new(["docker"]);
        cmd.add_flag("--all", true);
        assert_eq!(cmd.as_slice(), ["docker", "--all"]);
    }

    #[test]
    fn flag_false_is_noop() {
        let mut cmd = Command::new(["docker"]);
        cmd.add_flag("--all", false);
        assert_eq!(cmd.as_slice(), ["docker"]);
    }

    #[test]
    fn simple_arg_none_is_noop() {
        let mut cmd = Command::new(["docker"]);
        cmd.add_simple_arg("--name", None::<String>);
        assert_eq!(cmd.as_slice(), ["docker"]);
    }

    #[test]
    fn simple_arg_formats_value() {
        let mut cmd = Command::new(["docker"]);
        cmd.add_simple_arg("--tail", Some(25));
        assert_eq!(cmd.as_slice(), ["docker", "--tail", "25"]);
    }

    #[test]
    fn iterable_repeats_name_in_order() {
        let mut cmd = Command::new(["docker"]);
        cmd.add_args_iterable("--cap-add", ["NET_ADMIN", "SYS_PTRACE"]);
        assert_eq!(
            cmd.as_slice(),
            ["docker", "--cap-add", "NET_ADMIN", "--cap-add", "SYS_PTRACE"]
        );
    }

    #[test]
    fn mapping_emits_key_equals_value() {
        let mut labels = BTreeMap::new();
        labels.insert("a", "1");
        labels.insert("b", "2");
        let mut cmd = Command::new(["docker"]);
        cmd.add_args_mapping("--label", labels);
        assert_eq!(
            cmd.as_slice(),
            ["docker", "--label", "a=1", "--label", "b=2"]
        );
    }

    #[test]
    fn builder_call_order_is_argv_order() {
        let mut cmd = Command::new(["docker", "container", "create"]);
        cmd.add_simple_arg("--name", Some("x"))
            .add_flag("--rm", true)
            .append("ubuntu")
            .extend(["sleep", "infinity"]);
        assert_eq!(
            cmd.into_vec(),
            vec![
                "docker",
                "container",
                "create",
                "--name",
                "x",
                "--rm",
                "ubuntu",
                "sleep",
                "infinity"
            ]
        );
    }

    #[test]
    fn no_empty_tokens_from_optional_inputs() {
        let mut cmd = Command::new(["docker"]);
        cmd.add_simple_arg("--a", None::<&str>)
            .add_args_iterable("--b", Vec::<String>::new())
            .add_args_mapping("--c", BTreeMap::<String, String>::new());
        assert!(cmd.as_slice().iter().all(|t| !t.is_empty()));
        assert_eq!(cmd.len(), 1);
    }

    #[test]
    fn display_joins_with_spaces() {
        let mut cmd = Command::new(["docker", "ps"]);
        cmd.add_flag("--all", true);
        assert_eq!(cmd.to_string(), "docker ps --all");
    }
}
