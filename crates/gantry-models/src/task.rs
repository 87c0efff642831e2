// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swarm task inspect payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monotonic object version of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskVersion {
    /// Raft index.
    pub index: Option<i64>,
}

/// Container state of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskContainerStatus {
    /// Backing container id.
    #[serde(rename = "ContainerID")]
    pub container_id: Option<String>,
    /// PID inside the node.
    #[serde(rename = "PID")]
    pub pid: Option<i64>,
    /// Exit code, when finished.
    pub exit_code: Option<i64>,
}

/// Status of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskStatus {
    /// When the status was recorded.
    pub timestamp: Option<DateTime<Utc>>,
    /// Lifecycle state (`"running"`, `"shutdown"`, …).
    pub state: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
    /// Error, if the task failed.
    pub err: Option<String>,
    /// Container status.
    pub container_status: Option<TaskContainerStatus>,
}

/// Placement constraints of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskPlacement {
    /// Constraint expressions.
    pub constraints: Option<Vec<String>>,
    /// Maximum replicas per node.
    pub max_replicas: Option<i64>,
}

/// Resource quotas of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskResources {
    /// Limits.
    pub limits: Option<serde_json::Value>,
    /// Reservations.
    pub reservation: Option<serde_json::Value>,
}

/// Declarative specification of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskSpec {
    /// Container template.
    pub container_spec: Option<serde_json::Value>,
    /// Resource quotas.
    pub resources: Option<TaskResources>,
    /// Restart policy.
    pub restart_policy: Option<serde_json::Value>,
    /// Placement constraints.
    pub placement: Option<TaskPlacement>,
    /// Forced-update counter.
    pub force_update: Option<i64>,
    /// Runtime kind.
    pub runtime: Option<String>,
    /// Attached networks.
    pub networks: Option<Vec<serde_json::Value>>,
    /// Log driver.
    pub log_driver: Option<serde_json::Value>,
}

/// The full task inspect payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskInspect {
    /// Canonical task id.
    #[serde(rename = "ID")]
    pub id: Option<String>,
    /// Object version.
    pub version: Option<TaskVersion>,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
    /// Task name.
    pub name: Option<String>,
    /// Labels.
    pub labels: Option<BTreeMap<String, String>>,
    /// Specification.
    pub spec: Option<TaskSpec>,
    /// Owning service id.
    #[serde(rename = "ServiceID")]
    pub service_id: Option<String>,
    /// Slot for replicated services.
    pub slot: Option<i64>,
    /// Node the task runs on.
    #[serde(rename = "NodeID")]
    pub node_id: Option<String>,
    /// Current status.
    pub status: Option<TaskStatus>,
    /// Desired lifecycle state.
    pub desired_state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_single;

    #[test]
    fn parses_ids_and_status() {
        let task: TaskInspect = parse_single(
            r#"[{
                "ID": "task1",
                "ServiceID": "svc1",
                "NodeID": "node1",
                "Slot": 2,
                "Status": {
                    "State": "running",
                    "ContainerStatus": {"ContainerID": "c1", "PID": 77}
                },
                "DesiredState": "running"
            }]"#,
        )
        .unwrap();
        assert_eq!(task.id.as_deref(), Some("task1"));
        assert_eq!(task.service_id.as_deref(), Some("svc1"));
        assert_eq!(task.node_id.as_deref(), Some("node1"));
        let status = task.status.unwrap();
        assert_eq!(status.state.as_deref(), Some("running"));
        assert_eq!(status.container_status.unwrap().pid, Some(77));
        assert_eq!(task.desired_state.as_deref(), Some("running"));
    }
}
