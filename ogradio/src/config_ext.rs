//! Extension pour intégrer la radio dans ogconfig
//!
//! Ce module fournit le trait `RadioConfigExt`, qui ajoute à
//! `ogconfig::Config` les réglages de la station : playlist, stockage des
//! fichiers audio, cache edge et en-têtes HTTP.
//!
//! # Exemple
//!
//! ```no_run
//! use ogconfig::get_config;
//! use ogradio::RadioConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//!
//! let kind = config.get_radio_store_kind()?;
//! let capacity = config.get_radio_edge_cache_capacity_mb()?;
//! println!("store: {}, cache: {} MiB", kind, capacity);
//! # Ok(())
//! # }
//! ```

use crate::edge_cache::DEFAULT_CAPACITY_MB;
use crate::store::StoreKind;
use anyhow::{Result, anyhow};
use ogconfig::Config;
use serde_yaml::Value;
use std::path::PathBuf;

/// Default `max-age` of `/api/radio/current`, in seconds
pub const DEFAULT_STATE_MAX_AGE_SECS: u64 = 5;

/// Default store key of the station cover
pub const DEFAULT_COVER_KEY: &str = "cover.jpg";

/// Default audio directory of the `fs` store, relative to the config dir
pub const DEFAULT_STORE_DIR: &str = "audio";

/// Default static files directory, relative to the config dir
pub const DEFAULT_STATIC_DIR: &str = "static";

const RADIO: &str = "radio";

/// Trait d'extension pour la configuration de la radio
///
/// # Auto-persist des valeurs par défaut
///
/// Les getters persistent la valeur par défaut dans la configuration
/// lorsque la clé est absente ou invalide.
pub trait RadioConfigExt {
    /// Fichier de playlist YAML ; `None` pour la playlist intégrée
    fn get_radio_playlist_file(&self) -> Result<Option<PathBuf>>;
    fn set_radio_playlist_file(&self, path: Option<&str>) -> Result<()>;

    /// Backend de stockage des fichiers audio (défaut : `fs`)
    fn get_radio_store_kind(&self) -> Result<StoreKind>;
    fn set_radio_store_kind(&self, kind: StoreKind) -> Result<()>;

    /// Répertoire du backend `fs`, créé si besoin
    fn get_radio_store_dir(&self) -> Result<PathBuf>;

    /// URL du bucket du backend `http`
    fn get_radio_store_url(&self) -> Result<Option<String>>;
    fn set_radio_store_url(&self, url: &str) -> Result<()>;

    /// Capacité du cache edge, en MiB de corps de réponse
    fn get_radio_edge_cache_capacity_mb(&self) -> Result<u64>;
    fn set_radio_edge_cache_capacity_mb(&self, capacity: u64) -> Result<()>;

    /// `max-age` de l'état courant de la station
    fn get_radio_state_max_age(&self) -> Result<u64>;
    fn set_radio_state_max_age(&self, secs: u64) -> Result<()>;

    /// Clé de la pochette dans le stockage
    fn get_radio_cover_key(&self) -> Result<String>;

    /// Répertoire des fichiers statiques, créé si besoin
    fn get_radio_static_dir(&self) -> Result<PathBuf>;
}

fn get_or_default_u64(config: &Config, path: &[&str], default: u64) -> Result<u64> {
    match config.get_value(path) {
        Ok(Value::Number(n)) if n.as_u64().is_some() => Ok(n.as_u64().unwrap_or(default)),
        _ => {
            config.set_value(path, Value::Number(default.into()))?;
            Ok(default)
        }
    }
}

fn get_or_default_string(config: &Config, path: &[&str], default: &str) -> Result<String> {
    match config.get_value(path) {
        Ok(Value::String(s)) if !s.is_empty() => Ok(s),
        _ => {
            config.set_value(path, Value::String(default.to_string()))?;
            Ok(default.to_string())
        }
    }
}

impl RadioConfigExt for Config {
    fn get_radio_playlist_file(&self) -> Result<Option<PathBuf>> {
        match self.get_value(&[RADIO, "playlist_file"]) {
            Ok(Value::String(s)) if !s.is_empty() => {
                let path = PathBuf::from(s);
                if path.is_absolute() {
                    Ok(Some(path))
                } else {
                    Ok(Some(self.directory().join(path)))
                }
            }
            _ => Ok(None),
        }
    }

    fn set_radio_playlist_file(&self, path: Option<&str>) -> Result<()> {
        let value = path.map_or(Value::Null, |p| Value::String(p.to_string()));
        self.set_value(&[RADIO, "playlist_file"], value)
    }

    fn get_radio_store_kind(&self) -> Result<StoreKind> {
        let kind = get_or_default_string(self, &[RADIO, "store", "kind"], "fs")?;
        kind.parse::<StoreKind>().map_err(|e| anyhow!(e))
    }

    fn set_radio_store_kind(&self, kind: StoreKind) -> Result<()> {
        self.set_value(&[RADIO, "store", "kind"], Value::String(kind.to_string()))
    }

    fn get_radio_store_dir(&self) -> Result<PathBuf> {
        self.get_managed_dir(&[RADIO, "store", "directory"], DEFAULT_STORE_DIR)
    }

    fn get_radio_store_url(&self) -> Result<Option<String>> {
        match self.get_value(&[RADIO, "store", "url"]) {
            Ok(Value::String(s)) if !s.is_empty() => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    fn set_radio_store_url(&self, url: &str) -> Result<()> {
        self.set_value(&[RADIO, "store", "url"], Value::String(url.to_string()))
    }

    fn get_radio_edge_cache_capacity_mb(&self) -> Result<u64> {
        get_or_default_u64(self, &[RADIO, "edge_cache", "capacity_mb"], DEFAULT_CAPACITY_MB)
    }

    fn set_radio_edge_cache_capacity_mb(&self, capacity: u64) -> Result<()> {
        self.set_value(
            &[RADIO, "edge_cache", "capacity_mb"],
            Value::Number(capacity.into()),
        )
    }

    fn get_radio_state_max_age(&self) -> Result<u64> {
        get_or_default_u64(self, &[RADIO, "state_max_age"], DEFAULT_STATE_MAX_AGE_SECS)
    }

    fn set_radio_state_max_age(&self, secs: u64) -> Result<()> {
        self.set_value(&[RADIO, "state_max_age"], Value::Number(secs.into()))
    }

    fn get_radio_cover_key(&self) -> Result<String> {
        get_or_default_string(self, &[RADIO, "cover_key"], DEFAULT_COVER_KEY)
    }

    fn get_radio_static_dir(&self) -> Result<PathBuf> {
        self.get_managed_dir(&[RADIO, "static_dir"], DEFAULT_STATIC_DIR)
    }
}
