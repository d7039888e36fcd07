use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use audio_translator::audio::FfmpegConverter;
use audio_translator::routes;
use audio_translator::settings::Settings;
use audio_translator::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("audio_translator=debug,tower_http=debug")),
        )
        .init();

    let settings = Settings::load()?;
    info!(
        "Loaded configuration: model={}, sample_rate={}, formats={:?}",
        settings.gemini_model, settings.pcm_sample_rate, settings.supported_audio_formats
    );

    // Ensure the temp directory exists
    let temp_dir = settings.temp_dir();
    std::fs::create_dir_all(&temp_dir)?;
    info!("Temporary files go to {}", temp_dir.display());

    if let Err(e) = FfmpegConverter::new(settings.ffmpeg_path.clone()).probe().await {
        warn!("{} is not usable, conversions will fail: {}", settings.ffmpeg_path, e);
    }

    let host = settings.server_host.clone();
    let port = settings.server_port;
    let app = routes::create_app(AppState::new(settings));

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("Starting server on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
