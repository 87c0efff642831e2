// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swarm membership operations.

use crate::{engine_command, run_command};
use gantry_config::ClientConfig;
use gantry_core::ValidDuration;
use gantry_error::Result;
use gantry_host::Execution;

/// Options for `swarm ca`.
#[derive(Debug, Clone, Default)]
pub struct SwarmCaOpts {
    /// PEM root CA certificate for the cluster.
    pub ca_certificate: Option<String>,
    /// PEM root CA key for the cluster.
    pub ca_key: Option<String>,
    /// Validity period for node certificates.
    pub certificate_expiry: Option<ValidDuration>,
    /// Return immediately instead of waiting for convergence.
    pub detach: bool,
    /// External certificate signing endpoints.
    pub external_ca: Option<String>,
    /// Rotate the CA.
    pub rotate: bool,
}

/// Options for `swarm init`.
#[derive(Debug, Clone, Default)]
pub struct SwarmInitOpts {
    /// Advertised address (`<ip|interface>[:port]`).
    pub advertise_address: Option<String>,
    /// Enable manager autolocking.
    pub autolock: bool,
    /// Node availability (`"active"`, `"pause"`, `"drain"`).
    pub availability: Option<String>,
    /// Address or interface for data-path traffic.
    pub data_path_address: Option<String>,
    /// Port for data-path traffic.
    pub data_path_port: Option<u16>,
    /// Listen address.
    pub listen_address: Option<String>,
}

/// Options for `swarm join`.
#[derive(Debug, Clone, Default)]
pub struct SwarmJoinOpts {
    /// Advertised address.
    pub advertise_address: Option<String>,
    /// Node availability.
    pub availability: Option<String>,
    /// Address or interface for data-path traffic.
    pub data_path_address: Option<String>,
    /// Listen address.
    pub listen_address: Option<String>,
    /// Join token; decides whether the node joins as worker or manager.
    pub token: Option<String>,
}

/// Options for `swarm update`.
#[derive(Debug, Clone, Default)]
pub struct SwarmUpdateOpts {
    /// Change manager autolocking.
    pub autolock: Option<bool>,
    /// Node certificate validity period.
    pub cert_expiry: Option<ValidDuration>,
    /// Dispatcher heartbeat period.
    pub dispatcher_heartbeat: Option<ValidDuration>,
    /// External certificate signing endpoints.
    pub external_ca: Option<String>,
    /// Raft snapshots to retain.
    pub max_snapshots: Option<u64>,
    /// Log entries between Raft snapshots.
    pub snapshot_interval: Option<u64>,
    /// Task history retention limit.
    pub task_history_limit: Option<u64>,
}

/// Swarm operations (`swarm …`).
#[derive(Debug, Clone)]
pub struct SwarmCli {
    config: ClientConfig,
}

impl SwarmCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Get or rotate the root CA. Returns the current CA certificate.
    pub async fn ca(&self, opts: SwarmCaOpts) -> Result<Option<String>> {
        let mut cmd = engine_command(&self.config, &["swarm", "ca"]).await?;
        cmd.add_simple_arg("--ca-cert", opts.ca_certificate.as_deref());
        cmd.add_simple_arg("--ca-key", opts.ca_key.as_deref());
        cmd.add_simple_arg(
            "--cert-expiry",
            opts.certificate_expiry.map(|d| d.suffixed()),
        );
        cmd.add_flag("--detach", opts.detach);
        cmd.add_simple_arg("--external-ca", opts.external_ca.as_deref());
        cmd.add_flag("--rotate", opts.rotate);
        run_command(&self.config, cmd).await?;
        if opts.detach {
            return Ok(None);
        }
        // On rotation the progress goes to stdout; a clean readback needs
        // a second plain call.
        let cmd = engine_command(&self.config, &["swarm", "ca"]).await?;
        let output = run_command(&self.config, cmd).await?;
        Ok(Some(output.stdout))
    }

    /// Initialize a swarm on this node.
    pub async fn init(&self, opts: SwarmInitOpts) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["swarm", "init"]).await?;
        cmd.add_simple_arg("--advertise-addr", opts.advertise_address.as_deref());
        cmd.add_flag("--autolock", opts.autolock);
        cmd.add_simple_arg("--availability", opts.availability.as_deref());
        cmd.add_simple_arg("--data-path-addr", opts.data_path_address.as_deref());
        cmd.add_simple_arg("--data-path-port", opts.data_path_port);
        cmd.add_simple_arg("--listen-addr", opts.listen_address.as_deref());
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Join an existing swarm.
    pub async fn join(&self, manager_address: &str, opts: SwarmJoinOpts) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["swarm", "join"]).await?;
        cmd.add_simple_arg("--advertise-addr", opts.advertise_address.as_deref());
        cmd.add_simple_arg("--availability", opts.availability.as_deref());
        cmd.add_simple_arg("--data-path-addr", opts.data_path_address.as_deref());
        cmd.add_simple_arg("--listen-addr", opts.listen_address.as_deref());
        cmd.add_simple_arg("--token", opts.token.as_deref());
        cmd.append(manager_address);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// The token another node needs to join as `node_type`
    /// (`"worker"` or `"manager"`).
    pub async fn join_token(&self, node_type: &str, rotate: bool) -> Result<String> {
        let mut cmd = engine_command(&self.config, &["swarm", "join-token", "--quiet"]).await?;
        cmd.add_flag("--rotate", rotate);
        cmd.append(node_type);
        let output = run_command(&self.config, cmd).await?;
        Ok(output.stdout)
    }

    /// Leave the swarm.
    pub async fn leave(&self, force: bool) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["swarm", "leave"]).await?;
        cmd.add_flag("--force", force);
        run_command(&self.config, cmd).await?;
        Ok(())
    }

    /// Unlock the swarm after a manager restart; the key is fed through
    /// stdin so it never shows in process listings.
    pub async fn unlock(&self, key: &str) -> Result<()> {
        let cmd = engine_command(&self.config, &["swarm", "unlock"]).await?;
        Execution::new(cmd.into_vec(), self.config.kind())
            .stdin(key.as_bytes().to_vec())
            .run()
            .await?;
        Ok(())
    }

    /// The key needed to unlock the swarm after a manager restart.
    pub async fn unlock_key(&self, rotate: bool) -> Result<String> {
        let mut cmd = engine_command(&self.config, &["swarm", "unlock-key", "--quiet"]).await?;
        cmd.add_flag("--rotate", rotate);
        let output = run_command(&self.config, cmd).await?;
        Ok(output.stdout)
    }

    /// Update the swarm configuration.
    pub async fn update(&self, opts: SwarmUpdateOpts) -> Result<()> {
        let mut cmd = engine_command(&self.config, &["swarm", "update"]).await?;
        if let Some(autolock) = opts.autolock {
            cmd.append(format!("--autolock={autolock}"));
        }
        cmd.add_simple_arg("--cert-expiry", opts.cert_expiry.map(|d| d.suffixed()));
        cmd.add_simple_arg(
            "--dispatcher-heartbeat",
            opts.dispatcher_heartbeat.map(|d| d.suffixed()),
        );
        cmd.add_simple_arg("--external-ca", opts.external_ca.as_deref());
        cmd.add_simple_arg("--max-snapshots", opts.max_snapshots);
        cmd.add_simple_arg("--snapshot-interval", opts.snapshot_interval);
        cmd.add_simple_arg("--task-history-limit", opts.task_history_limit);
        run_command(&self.config, cmd).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_for_swarm_flags_carry_the_unit_suffix() {
        let expiry = ValidDuration::from(std::time::Duration::from_secs(90 * 24 * 3600));
        assert_eq!(expiry.suffixed(), "7776000s");
    }

    #[test]
    fn autolock_uses_the_explicit_value_form() {
        // The flag requires `--autolock=<bool>` rather than a bare flag.
        let rendered = format!("--autolock={}", false);
        assert_eq!(rendered, "--autolock=false");
    }
}
