//! # ogserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit le serveur HTTP de la radio : routes JSON, fusion
//! des routers des crates métier, documentation OpenAPI, délégation des
//! chemins hors API à un répertoire statique, réponses CORS préliminaires
//! sous `/api`, et logs consultables en direct (buffer + SSE).
//!
//! Les crates métier étendent [`Server`] par des traits d'extension
//! (voir `ogradio::RadioServerExt`) sans que ce crate les connaisse.
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use ogserver::{ServerBuilder, logs::LoggingOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new("MyServer", "localhost", 8080).build();
//!     server.init_logging(LoggingOptions::default()).await;
//!
//!     server.add_route("/info", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod cors;
pub mod logs;
pub mod server;

pub use logs::{LogState, LoggingOptions, SseLayer, log_dump, log_sse};
pub use server::{API_PREFIX, Server, ServerBuilder, ServerInfo};
