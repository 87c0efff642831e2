// SPDX-License-Identifier: MIT OR Apache-2.0
//! Swarm task operations and the [`Task`] handle.

use crate::entity::json_entity;
use gantry_config::ClientConfig;
use gantry_error::Result;
use gantry_models::{TaskInspect, TaskStatus};

json_entity! {
    /// A handle to one swarm task, identified by its immutable id.
    Task {
        payload: TaskInspect,
        id_field: id,
        inspect: ["inspect"],
    }
}

impl Task {
    /// The id of the owning service.
    pub async fn service_id(&self) -> Result<Option<String>> {
        Ok(self.inspect_result().await?.service_id)
    }

    /// The id of the node the task runs on.
    pub async fn node_id(&self) -> Result<Option<String>> {
        Ok(self.inspect_result().await?.node_id)
    }

    /// The task status.
    pub async fn status(&self) -> Result<TaskStatus> {
        Ok(self.inspect_result().await?.status.unwrap_or_default())
    }

    /// The desired lifecycle state.
    pub async fn desired_state(&self) -> Result<Option<String>> {
        Ok(self.inspect_result().await?.desired_state)
    }
}

/// Swarm task operations.
#[derive(Debug, Clone)]
pub struct TaskCli {
    config: ClientConfig,
}

impl TaskCli {
    pub(crate) fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// All tasks in the swarm: the tasks of every service.
    pub async fn list(&self) -> Result<Vec<Task>> {
        let services = crate::service::ServiceCli::new(self.config.clone());
        let all = services.list(&[]).await?;
        let ids: Vec<String> = all.iter().map(|s| s.id().to_string()).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        services.ps(ids).await
    }

    /// Resolve a reference into a [`Task`] handle.
    pub async fn inspect(&self, task: &str) -> Result<Task> {
        Task::from_reference(self.config.clone(), task).await
    }

    /// Task log retrieval has no stable CLI shape.
    pub fn logs(&self) -> Result<()> {
        Err(gantry_error::Error::NotImplemented("task logs"))
    }
}
