//! Permission statements and network rules implied by the stack storage.

use berth_model::{Protocol, StackMeta, StorageSpec};
use serde::{Deserialize, Serialize};

/// NFS port the shared filesystem listens on.
pub const NFS_PORT: u16 = 2049;

/// Principal the task role is assumed by.
pub const TASK_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// Stand-in for identifiers that only exist once the provisioner creates the resource.
pub const DEDICATED_PLACEHOLDER: &str = "<dedicated>";

const FS_ACTIONS: &[&str] = &[
    "elasticfilesystem:ClientMount",
    "elasticfilesystem:ClientWrite",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

/// Role the task runs under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRole {
    pub assumed_by: String,
    pub statements: Vec<PolicyStatement>,
}

/// Outbound rule on the task security group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgressRule {
    pub protocol: Protocol,
    pub port: u16,
    pub peer_security_group: String,
    pub description: String,
}

/// Task role carrying filesystem access, if the stack mounts shared storage.
pub fn task_role(meta: &StackMeta, storage: &StorageSpec) -> Option<TaskRole> {
    let fs_id = match storage {
        StorageSpec::None => return None,
        StorageSpec::Dedicated { .. } => DEDICATED_PLACEHOLDER,
        StorageSpec::Existing { file_system_id, .. } => file_system_id.as_str(),
    };

    Some(TaskRole {
        assumed_by: TASK_PRINCIPAL.to_string(),
        statements: vec![PolicyStatement {
            effect: Effect::Allow,
            actions: FS_ACTIONS.iter().map(|a| a.to_string()).collect(),
            resources: vec![file_system_arn(meta, fs_id)],
        }],
    })
}

/// NFS egress towards the filesystem's security group.
pub fn egress_rules(storage: &StorageSpec) -> Vec<EgressRule> {
    let peer = match storage {
        StorageSpec::None => return Vec::new(),
        StorageSpec::Dedicated { .. } => DEDICATED_PLACEHOLDER,
        StorageSpec::Existing {
            security_group_id, ..
        } => security_group_id.as_str(),
    };

    vec![EgressRule {
        protocol: Protocol::Tcp,
        port: NFS_PORT,
        peer_security_group: peer.to_string(),
        description: "Allow NFS traffic to shared storage".to_string(),
    }]
}

pub fn file_system_arn(meta: &StackMeta, fs_id: &str) -> String {
    format!(
        "arn:aws:elasticfilesystem:{}:{}:file-system/{fs_id}",
        meta.region, meta.account
    )
}
