//! Endpoints API REST de la radio
//!
//! - `GET /api/radio/current` : état courant de la station
//! - `GET /api/radio/upcoming?count=N` : prochains passages
//! - `GET /api/tracks` : catalogue complet
//! - `GET /api/audio/{identifier}` : fichier audio via le cache edge
//! - `GET /api/cover` : pochette de la station
//!
//! Toutes les routes répondent aux requêtes CORS préliminaires (`OPTIONS`).

use crate::edge_cache::CacheKey;
use crate::error::GatewayError;
use crate::gateway::{GatewayResponse, StreamGateway};
use crate::models::{ErrorBody, RadioState, ScheduledTrack, Track};
use crate::phase::{self, Clock};
use crate::playlist::Playlist;
use crate::range;
use axum::{
    Json, Router,
    extract::{OriginalUri, Query, State},
    http::{HeaderMap, HeaderValue, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use ogserver::cors::api_preflight;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi};

/// Préfixe des fichiers audio
pub const AUDIO_PREFIX: &str = "/api/audio/";

/// En-tête indiquant si la réponse vient du cache edge
pub const X_CACHE: &str = "x-cache";

/// `max-age` du catalogue
pub const TRACKS_MAX_AGE_SECS: u64 = 86_400;

/// Nombre de passages renvoyés par défaut par `/api/radio/upcoming`
pub const DEFAULT_UPCOMING: usize = 5;

/// Borne haute de `count`
pub const MAX_UPCOMING: usize = 100;

/// État partagé des handlers
#[derive(Clone)]
pub struct RadioStation {
    pub playlist: Arc<Playlist>,
    pub clock: Arc<dyn Clock>,
    pub gateway: StreamGateway,
    /// `max-age` de `/api/radio/current`
    pub state_max_age: u64,
    /// Clé de la pochette dans le stockage
    pub cover_key: String,
}

impl RadioStation {
    /// État de la station à l'instant donné par l'horloge
    pub fn current_state(&self) -> RadioState {
        phase::compute_state(self.clock.now_ms(), &self.playlist)
    }
}

// ============ Gestion des erreurs ============

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        let body = Json(ErrorBody {
            error: self.public_message().to_string(),
        });
        (self.status(), headers, body).into_response()
    }
}

fn json_with_max_age<T: serde::Serialize>(value: T, max_age: u64) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(cache_control) = HeaderValue::from_str(&format!("public, max-age={}", max_age)) {
        headers.insert(header::CACHE_CONTROL, cache_control);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    (headers, Json(value)).into_response()
}

fn serve(outcome: GatewayResponse, request_headers: &HeaderMap) -> Response {
    let cache_status = HeaderValue::from_static(outcome.outcome.as_str());
    let mut response = range::respond(outcome.response, request_headers);
    response.headers_mut().insert(X_CACHE, cache_status);
    response
}

// ============================================================================
// Route Handlers
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/radio/current",
    responses(
        (status = 200, description = "Morceau en cours et position de lecture", body = RadioState)
    ),
    tag = "Radio"
)]
async fn get_current_state(State(station): State<RadioStation>) -> Response {
    json_with_max_age(station.current_state(), station.state_max_age)
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct UpcomingQuery {
    /// Nombre de passages (1 à 100, défaut 5)
    count: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/radio/upcoming",
    params(UpcomingQuery),
    responses(
        (status = 200, description = "Prochains passages", body = Vec<ScheduledTrack>)
    ),
    tag = "Radio"
)]
async fn get_upcoming(
    State(station): State<RadioStation>,
    Query(query): Query<UpcomingQuery>,
) -> Response {
    let count = query
        .count
        .unwrap_or(DEFAULT_UPCOMING)
        .clamp(1, MAX_UPCOMING);
    let schedule = phase::upcoming(station.clock.now_ms(), &station.playlist, count);
    json_with_max_age(schedule, station.state_max_age)
}

#[utoipa::path(
    get,
    path = "/api/tracks",
    responses(
        (status = 200, description = "Catalogue complet, dans l'ordre de diffusion", body = Vec<Track>)
    ),
    tag = "Radio"
)]
async fn get_tracks(State(station): State<RadioStation>) -> Response {
    json_with_max_age(station.playlist.tracks(), TRACKS_MAX_AGE_SECS)
}

#[utoipa::path(
    get,
    path = "/api/audio/{identifier}",
    params(
        ("identifier" = String, Path, description = "Nom du fichier dans la playlist")
    ),
    responses(
        (status = 200, description = "Fichier FLAC", body = Vec<u8>, content_type = "audio/flac"),
        (status = 206, description = "Plage d'octets"),
        (status = 304, description = "Non modifié"),
        (status = 400, description = "Identifiant invalide", body = ErrorBody),
        (status = 404, description = "Fichier inconnu", body = ErrorBody),
        (status = 416, description = "Plage non satisfiable"),
        (status = 500, description = "Erreur du stockage", body = ErrorBody)
    ),
    tag = "Radio"
)]
async fn stream_audio(
    State(station): State<RadioStation>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    // segment brut : le décodage se fait après la validation.
    // `/api/audio` et `/api/audio/` donnent un identifiant vide (400).
    let raw = uri.path().strip_prefix(AUDIO_PREFIX).unwrap_or_default();
    let cache_key = CacheKey::from_request(&uri, &headers);

    let outcome = station.gateway.handle_stream(raw, cache_key).await?;
    Ok(serve(outcome, &headers))
}

#[utoipa::path(
    get,
    path = "/api/cover",
    responses(
        (status = 200, description = "Pochette de la station", body = Vec<u8>, content_type = "image/jpeg"),
        (status = 404, description = "Pas de pochette", body = ErrorBody)
    ),
    tag = "Radio"
)]
async fn get_cover(
    State(station): State<RadioStation>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let cache_key = CacheKey::from_request(&uri, &headers);
    let outcome = station
        .gateway
        .handle_asset(&station.cover_key, cache_key, "image/jpeg")
        .await?;
    Ok(serve(outcome, &headers))
}

/// Documentation OpenAPI pour l'API de la radio
#[derive(OpenApi)]
#[openapi(
    info(
        title = "OG Radio API",
        version = "1.0.0",
        description = "Station toujours à l'antenne : état de lecture partagé et diffusion des fichiers audio"
    ),
    paths(get_current_state, get_upcoming, get_tracks, stream_audio, get_cover),
    components(schemas(RadioState, ScheduledTrack, Track, ErrorBody)),
    tags(
        (name = "Radio", description = "Station et fichiers audio")
    )
)]
pub struct RadioApiDoc;

/// Crée le router de l'API radio (chemins complets, à fusionner à la racine)
pub fn create_router(station: RadioStation) -> Router {
    Router::new()
        .route("/api/radio/current", get(get_current_state))
        .route("/api/radio/upcoming", get(get_upcoming))
        .route("/api/tracks", get(get_tracks))
        .route("/api/audio", get(stream_audio))
        .route("/api/audio/", get(stream_audio))
        .route("/api/audio/{*identifier}", get(stream_audio))
        .route("/api/cover", get(get_cover))
        .layer(middleware::from_fn(api_preflight))
        .with_state(station)
}
