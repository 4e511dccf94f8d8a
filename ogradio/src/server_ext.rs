//! Extension ogserver pour la radio
//!
//! Ce module fournit un trait d'extension qui ajoute l'API de la radio à un
//! `ogserver::Server`, sans que ogserver dépende de ogradio.

use crate::api_rest::{RadioApiDoc, RadioStation, create_router};
use crate::config_ext::RadioConfigExt;
use crate::edge_cache::MemoryEdgeCache;
use crate::gateway::StreamGateway;
use crate::phase::SystemClock;
use crate::playlist::Playlist;
use crate::store::{BlobStore, FsBlobStore, HttpBlobStore, MemoryBlobStore, StoreKind};
use anyhow::{Context, Result, anyhow};
use ogconfig::Config;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;

impl RadioStation {
    /// Construit la station à partir de la configuration
    ///
    /// Une playlist invalide fait échouer la construction : le serveur ne
    /// démarre pas.
    pub fn from_config(config: &Config) -> Result<Self> {
        let playlist = match config.get_radio_playlist_file()? {
            Some(path) => Playlist::from_file(&path)
                .with_context(|| format!("Invalid playlist file {}", path.display()))?,
            None => Playlist::builtin().context("Invalid built-in playlist")?,
        };
        let playlist = Arc::new(playlist);
        info!(
            tracks = playlist.len(),
            total_duration = playlist.total_duration(),
            "Playlist loaded"
        );

        let store: Arc<dyn BlobStore> = match config.get_radio_store_kind()? {
            StoreKind::Fs => {
                let dir = config.get_radio_store_dir()?;
                info!(directory = %dir.display(), "Using filesystem store");
                Arc::new(FsBlobStore::new(dir))
            }
            StoreKind::Http => {
                let url = config
                    .get_radio_store_url()?
                    .ok_or_else(|| anyhow!("radio.store.url is required for the http store"))?;
                info!(url = %url, "Using HTTP bucket store");
                Arc::new(HttpBlobStore::new(&url)?)
            }
            StoreKind::Memory => {
                info!("Using in-memory store");
                Arc::new(MemoryBlobStore::new())
            }
        };

        let capacity_mb = config.get_radio_edge_cache_capacity_mb()?;
        let cache = Arc::new(MemoryEdgeCache::with_capacity_mb(capacity_mb));

        Ok(Self {
            gateway: StreamGateway::new(playlist.clone(), cache, store),
            playlist,
            clock: Arc::new(SystemClock),
            state_max_age: config.get_radio_state_max_age()?,
            cover_key: config.get_radio_cover_key()?,
        })
    }
}

/// Trait pour étendre ogserver avec la radio
///
/// # Exemple
///
/// ```rust,no_run
/// use ogradio::RadioServerExt;
/// use ogserver::ServerBuilder;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut server = ServerBuilder::new_configured().build();
///     server.init_radio().await?;
///
///     server.start().await?;
///     server.wait().await;
///     Ok(())
/// }
/// ```
pub trait RadioServerExt {
    /// Initialise la radio depuis la configuration globale
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /api/radio/current`, `GET /api/radio/upcoming`
    /// - `GET /api/tracks`
    /// - `GET /api/audio/{identifier}`, `GET /api/cover`
    /// - documentation sous `/swagger-ui/radio`
    ///
    /// Les chemins hors API sont servis depuis le répertoire statique
    /// configuré.
    async fn init_radio(&mut self) -> Result<RadioStation>;

    /// Initialise la radio avec une station déjà construite
    async fn init_radio_with_station(&mut self, station: RadioStation) -> Result<RadioStation>;
}

impl RadioServerExt for ogserver::Server {
    async fn init_radio(&mut self) -> Result<RadioStation> {
        let config = ogconfig::get_config();
        let station = RadioStation::from_config(&config)?;

        let static_dir = config.get_radio_static_dir()?;
        self.add_static_dir(static_dir);

        self.init_radio_with_station(station).await
    }

    async fn init_radio_with_station(&mut self, station: RadioStation) -> Result<RadioStation> {
        let api_router = create_router(station.clone());
        self.add_openapi(api_router, RadioApiDoc::openapi(), "radio")
            .await;

        info!("Radio API registered");
        Ok(station)
    }
}
