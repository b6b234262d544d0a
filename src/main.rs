use anyhow::Result;

use chainer::app::run_app;
use chainer::cli::Config;
use chainer::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args();

    // Keep the guard alive so buffered file logs are flushed on exit
    let session_id = uuid::Uuid::new_v4().to_string();
    let _log_guard = init_logging(&session_id);

    run_app(&config).await
}
