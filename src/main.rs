//! Heartcheck: heart disease risk prediction form.
//!
//! Main entry point for the terminal application.

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use heartcheck::adapters::knn::KnnClassifier;
use heartcheck::adapters::sanitize::SanitizingMakeWriter;
use heartcheck::application::PredictorService;
use heartcheck::config::Config;
use heartcheck::tui::App;

fn main() -> Result<()> {
    let config = Config::from_env();

    // Logging to the terminal would draw over the TUI's alternate screen.
    let interactive = std::io::stdout().is_terminal();
    let (writer, _guard) = if config.log_mode.use_file(interactive) {
        if let Some(parent) = config.log_file.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("Failed to open log file {:?}", config.log_file))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer().with_writer(
                SanitizingMakeWriter::new(writer).with_max_bytes(config.sanitize_max_bytes),
            ),
        )
        .init();

    tracing::info!("Starting Heartcheck...");

    // The model is loaded before the terminal is touched so a failure prints
    // a plain diagnostic.
    let classifier = match KnnClassifier::load(&config.model_path, &config.integrity_policy()) {
        Ok(classifier) => classifier,
        Err(e) => {
            tracing::error!("Model load failed: {}", e);
            return Err(e).with_context(|| {
                format!(
                    "Cannot start without a model (HEARTCHECK_MODEL_PATH={:?})",
                    config.model_path
                )
            });
        }
    };
    let summary = classifier.summary();

    let predictor = PredictorService::new(Arc::new(classifier)).map_err(|e| {
        tracing::error!("Model feature order rejected: {}", e);
        anyhow::Error::new(e).context("Model feature order does not match the input form")
    })?;

    let mut app = App::new(predictor, summary);
    app.run()?;

    tracing::info!("Heartcheck shutdown complete.");
    Ok(())
}
