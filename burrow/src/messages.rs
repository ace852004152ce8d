//! Records exchanged with the controller.

use serde::{Deserialize, Serialize};

/// Host facts gathered for registration and check-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostProfile {
    pub hostname: String,
    pub username: String,
    pub os: String,
    pub ip: String,
    /// Bounded sample, not a full listing.
    pub processes: Vec<String>,
    pub directory: String,
    pub pid: u32,
    pub arch: String,
}

/// Check-in record announced before any tasking exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinMessage {
    pub action: String,
    pub host: String,
    pub user: String,
    pub os: String,
    pub ip: String,
    pub pid: u32,
    pub architecture: String,
    pub uuid: String,
}

impl CheckinMessage {
    pub fn from_profile(profile: &HostProfile, uuid: &str) -> Self {
        CheckinMessage {
            action: "checkin".to_string(),
            host: profile.hostname.clone(),
            user: profile.username.clone(),
            os: profile.os.clone(),
            ip: profile.ip.clone(),
            pid: profile.pid,
            architecture: profile.arch.clone(),
            uuid: uuid.to_string(),
        }
    }
}

/// One task handed down by the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub command: String,
    #[serde(default)]
    pub params: String,
}

impl Task {
    /// Merged form fed to command dispatch.
    pub fn command_line(&self) -> String {
        if self.params.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.params)
        }
    }
}

/// Result record echoing the task that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub user_output: String,
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_merges_command_and_params() {
        let task = Task {
            id: "t-1".into(),
            command: "ls".into(),
            params: "/tmp".into(),
        };
        assert_eq!(task.command_line(), "ls /tmp");
    }

    #[test]
    fn task_without_params_stays_bare() {
        let task: Task = serde_json::from_str(r#"{"id":"t-2","command":"pwd"}"#).unwrap();
        assert_eq!(task.command_line(), "pwd");
    }
}
