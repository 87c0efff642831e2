// SPDX-License-Identifier: MIT OR Apache-2.0
//! Value formatters: the only legal stringifications of high-level
//! parameters handed to the engine CLI.

use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Durations
// ---------------------------------------------------------------------------

/// A duration accepted either as a whole number of seconds or as a
/// [`std::time::Duration`].
///
/// The engine CLI takes seconds everywhere; fractional parts are truncated.
/// Flags that require a unit suffix use [`ValidDuration::suffixed`], the
/// rest use the bare integer [`fmt::Display`] form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidDuration {
    seconds: u64,
}

impl ValidDuration {
    /// Whole seconds carried by this value.
    pub fn as_seconds(&self) -> u64 {
        self.seconds
    }

    /// The `"<n>s"` form required by e.g. `--cert-expiry`.
    pub fn suffixed(&self) -> String {
        format!("{}s", self.seconds)
    }
}

impl From<u64> for ValidDuration {
    fn from(seconds: u64) -> Self {
        Self { seconds }
    }
}

impl From<Duration> for ValidDuration {
    fn from(d: Duration) -> Self {
        Self { seconds: d.as_secs() }
    }
}

impl fmt::Display for ValidDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.seconds)
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// A signal passed through verbatim: numeric ids stay numeric, names stay
/// names. No `SIGRTMIN+N` inference is performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Numeric signal id, passed through as-is (including negative values).
    Number(i64),
    /// Symbolic signal name, e.g. `"SIGTERM"` or `"HUP"`.
    Name(String),
}

impl From<i64> for Signal {
    fn from(n: i64) -> Self {
        Signal::Number(n)
    }
}

impl From<i32> for Signal {
    fn from(n: i32) -> Self {
        Signal::Number(n.into())
    }
}

impl From<&str> for Signal {
    fn from(name: &str) -> Self {
        Signal::Name(name.to_string())
    }
}

impl From<String> for Signal {
    fn from(name: String) -> Self {
        Signal::Name(name)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Number(n) => write!(f, "{n}"),
            Signal::Name(name) => f.write_str(name),
        }
    }
}

// ---------------------------------------------------------------------------
// Port mappings
// ---------------------------------------------------------------------------

/// A publish specification, rendered to one of the engine's accepted forms:
/// `container`, `host:container`, `ip:host:container`, each optionally
/// followed by `/protocol`.
///
/// ```
/// use gantry_core::PortMapping;
///
/// assert_eq!(PortMapping::container(80).to_string(), "80");
/// assert_eq!(PortMapping::new(8000, 7000).to_string(), "8000:7000");
/// assert_eq!(
///     PortMapping::new("127.0.0.1:3000", 2000).protocol("udp").to_string(),
///     "127.0.0.1:3000:2000/udp"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortMapping {
    host: Option<String>,
    container: String,
    proto: Option<String>,
}

impl PortMapping {
    /// Publish `container` on a random free host port.
    pub fn container(container: impl fmt::Display) -> Self {
        Self {
            host: None,
            container: container.to_string(),
            proto: None,
        }
    }

    /// Publish `container` on `host`. The host side may itself carry an
    /// address prefix (`"127.0.0.1:3000"`).
    pub fn new(host: impl fmt::Display, container: impl fmt::Display) -> Self {
        Self {
            host: Some(host.to_string()),
            container: container.to_string(),
            proto: None,
        }
    }

    /// Restrict the mapping to a protocol (`"tcp"`, `"udp"`, `"sctp"`).
    pub fn protocol(mut self, proto: impl Into<String>) -> Self {
        self.proto = Some(proto.into());
        self
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            write!(f, "{host}:")?;
        }
        f.write_str(&self.container)?;
        if let Some(proto) = &self.proto {
            write!(f, "/{proto}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Volume / mount triples
// ---------------------------------------------------------------------------

/// A `--volume` argument: `source:target` or `source:target:mode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    source: String,
    target: String,
    mode: Option<String>,
}

impl VolumeSpec {
    /// Mount `source` (volume name or host path) at `target`.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            mode: None,
        }
    }

    /// Add a mode suffix, e.g. `"ro"` or `"rw,z"`.
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }
}

impl fmt::Display for VolumeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.target)?;
        if let Some(mode) = &self.mode {
            write!(f, ":{mode}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Add-hosts and mappings
// ---------------------------------------------------------------------------

/// An `--add-host` pair rendered as `host:ip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddHost {
    host: String,
    ip: String,
}

impl AddHost {
    /// Map `host` to `ip` inside the container.
    pub fn new(host: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ip: ip.into(),
        }
    }
}

impl fmt::Display for AddHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.ip)
    }
}

/// Render `(k, v)` pairs as `k=v` strings, preserving iteration order.
pub fn format_mapping<I, K, V>(pairs: I) -> Vec<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: fmt::Display,
    V: fmt::Display,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect()
}

/// Render `(k, v)` pairs as a single comma-joined `k=v,...` string with no
/// spaces, the form taken by buildx `--output` and `--cache-*` flags.
pub fn comma_joined_pairs<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: fmt::Display,
    V: fmt::Display,
{
    format_mapping(pairs).join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn duration_from_seconds() {
        let d = ValidDuration::from(90);
        assert_eq!(d.to_string(), "90");
        assert_eq!(d.suffixed(), "90s");
    }

    #[test]
    fn duration_truncates_fraction() {
        let d = ValidDuration::from(Duration::from_millis(2750));
        assert_eq!(d.as_seconds(), 2);
        assert_eq!(d.to_string(), "2");
    }

    #[test]
    fn signal_number_passes_through() {
        assert_eq!(Signal::from(9).to_string(), "9");
        assert_eq!(Signal::Number(-1).to_string(), "-1");
    }

    #[test]
    fn signal_name_passes_through() {
        assert_eq!(Signal::from("SIGKILL").to_string(), "SIGKILL");
    }

    #[test]
    fn port_container_only() {
        assert_eq!(PortMapping::container(80).to_string(), "80");
    }

    #[test]
    fn port_host_container() {
        assert_eq!(PortMapping::new(8000, 7000).to_string(), "8000:7000");
    }

    #[test]
    fn port_with_address_and_protocol() {
        let p = PortMapping::new("127.0.0.1:3000", 2000).protocol("udp");
        assert_eq!(p.to_string(), "127.0.0.1:3000:2000/udp");
    }

    #[test]
    fn volume_without_mode() {
        assert_eq!(VolumeSpec::new("/", "/host").to_string(), "/:/host");
    }

    #[test]
    fn volume_with_mode() {
        assert_eq!(
            VolumeSpec::new("data", "/var/lib/data").mode("ro").to_string(),
            "data:/var/lib/data:ro"
        );
    }

    #[test]
    fn add_host_form() {
        assert_eq!(
            AddHost::new("my_host_1", "192.168.30.31").to_string(),
            "my_host_1:192.168.30.31"
        );
    }

    #[test]
    fn mapping_renders_in_order() {
        let mut m = BTreeMap::new();
        m.insert("dodo", "dada");
        m.insert("x", "1");
        assert_eq!(format_mapping(m), ["dodo=dada", "x=1"]);
    }

    #[test]
    fn comma_joined_has_no_spaces() {
        let pairs = [("type", "local"), ("dest", "path/to/dir")];
        assert_eq!(comma_joined_pairs(pairs), "type=local,dest=path/to/dir");
    }
}
