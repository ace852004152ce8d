use anyhow::Result;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use burrow::settings::Settings;
use burrow_agent::BurrowAgent;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(e) => {
            panic!("{e:?}");
        },
    };

    let level = if settings.agent.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
    info!("{settings:?}");

    let mut agent = BurrowAgent::with_settings(settings)?;
    agent.run().await?;

    Ok(())
}
