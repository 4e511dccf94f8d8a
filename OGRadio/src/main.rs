use ogconfig::get_config;
use ogradio::RadioServerExt;
use ogserver::{LoggingOptions, ServerBuilder};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Infrastructure ==========
    let config = get_config();
    let mut server = ServerBuilder::new_configured().build();
    server
        .init_logging(LoggingOptions::from_config(&config))
        .await;

    server
        .add_route("/info", || async {
            serde_json::json!({
                "name": "OG Radio",
                "version": env!("CARGO_PKG_VERSION"),
            })
        })
        .await;

    // ========== PHASE 2 : Station ==========
    // une playlist invalide arrête le démarrage ici
    info!("📻 Initializing radio station...");
    let station = server.init_radio().await?;
    let state = station.current_state();
    info!(
        "🎵 On air: {} - {} ({}s in)",
        state.track.artist, state.track.title, state.elapsed
    );

    // ========== PHASE 3 : Démarrage du serveur ==========
    info!("🌐 Starting HTTP server...");
    server.start().await?;

    let server_info = server.info();
    info!(
        "✅ OG Radio is ready at http://{}:{}",
        server_info.base_url, server_info.http_port
    );
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    Ok(())
}
