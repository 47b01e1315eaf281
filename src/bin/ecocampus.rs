use anyhow::Result;
use ecocampus::cli::{self, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let (action, globals) = cli::start()?;

    let result = action.execute(&globals).await;

    telemetry::shutdown_tracer();

    result
}
