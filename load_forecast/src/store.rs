//! Process-wide model parameter store
//!
//! One slot per model variant. Readers clone an `Arc` under a short read
//! lock, so an in-flight prediction keeps the parameter set it started with
//! while a reload swaps in a new one.

use crate::error::{ForecastError, Result};
use crate::models::ModelVariant;
use crate::params::ModelParameters;
use parking_lot::RwLock;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Default)]
struct Slot {
    source: Option<PathBuf>,
    params: RwLock<Option<Arc<ModelParameters>>>,
}

/// Load state of one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStatus {
    pub variant: ModelVariant,
    pub loaded: bool,
    pub source: Option<PathBuf>,
}

/// Read-mostly holder of the persisted parameters of every variant
#[derive(Debug, Default)]
pub struct ParameterStore {
    sarimax: Slot,
    autoregressive: Slot,
}

impl ParameterStore {
    /// A store with nothing loaded
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load each variant from its file
    ///
    /// A file that cannot be read leaves its variant unavailable and is
    /// logged; the store is still returned.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(sarimax: P, autoregressive: Q) -> Self {
        let store = Self {
            sarimax: Slot {
                source: Some(sarimax.as_ref().to_path_buf()),
                ..Slot::default()
            },
            autoregressive: Slot {
                source: Some(autoregressive.as_ref().to_path_buf()),
                ..Slot::default()
            },
        };

        for variant in ModelVariant::ALL {
            if let Err(e) = store.reload(variant) {
                warn!(%variant, error = %e, "starting without model parameters");
            }
        }
        store
    }

    fn slot(&self, variant: ModelVariant) -> &Slot {
        match variant {
            ModelVariant::Sarimax => &self.sarimax,
            ModelVariant::Autoregressive => &self.autoregressive,
        }
    }

    /// Current parameters of `variant`
    pub fn get(&self, variant: ModelVariant) -> Result<Arc<ModelParameters>> {
        self.slot(variant).params.read().clone().ok_or_else(|| {
            ForecastError::ModelUnavailable(format!("{} model parameters are not loaded", variant))
        })
    }

    /// Replace the parameters of their own variant
    pub fn set(&self, params: ModelParameters) {
        let variant = params.variant();
        *self.slot(variant).params.write() = Some(Arc::new(params));
        info!(%variant, "model parameters replaced");
    }

    /// Re-read `variant` from its source file
    ///
    /// On failure the previous parameters stay in place.
    pub fn reload(&self, variant: ModelVariant) -> Result<Arc<ModelParameters>> {
        let slot = self.slot(variant);
        let path = slot.source.as_deref().ok_or_else(|| {
            ForecastError::Persistence(format!("no parameter file configured for {}", variant))
        })?;

        let params = Self::read_variant(path, variant)?;
        let params = Arc::new(params);
        *slot.params.write() = Some(Arc::clone(&params));
        info!(%variant, path = %path.display(), "model parameters loaded");
        Ok(params)
    }

    /// Reload every variant that has a source file
    pub fn reload_all(&self) -> Vec<(ModelVariant, Result<Arc<ModelParameters>>)> {
        ModelVariant::ALL
            .iter()
            .map(|&variant| (variant, self.reload(variant)))
            .collect()
    }

    pub fn status(&self) -> Vec<SlotStatus> {
        ModelVariant::ALL
            .iter()
            .map(|&variant| {
                let slot = self.slot(variant);
                SlotStatus {
                    variant,
                    loaded: slot.params.read().is_some(),
                    source: slot.source.clone(),
                }
            })
            .collect()
    }

    fn read_variant(path: &Path, variant: ModelVariant) -> Result<ModelParameters> {
        let params = ModelParameters::load(path)?;
        if params.variant() != variant {
            return Err(ForecastError::Persistence(format!(
                "{} holds {} parameters, expected {}",
                path.display(),
                params.variant(),
                variant
            )));
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ArParameters, SarimaParameters};
    use tempfile::tempdir;

    #[test]
    fn missing_files_leave_the_store_degraded() {
        let dir = tempdir().unwrap();
        let store = ParameterStore::from_files(dir.path().join("a.json"), dir.path().join("b.json"));

        assert!(matches!(
            store.get(ModelVariant::Sarimax),
            Err(ForecastError::ModelUnavailable(_))
        ));
        assert!(store.status().iter().all(|s| !s.loaded));
    }

    #[test]
    fn reload_swaps_without_touching_held_parameters() {
        let dir = tempdir().unwrap();
        let sarimax = dir.path().join("sarimax_model_params.json");
        let ar = dir.path().join("ar_model_params.json");
        ModelParameters::Autoregressive(ArParameters { lags: 5 }).save(&ar).unwrap();

        let store = ParameterStore::from_files(&sarimax, &ar);
        let held = store.get(ModelVariant::Autoregressive).unwrap();

        ModelParameters::Autoregressive(ArParameters { lags: 2 }).save(&ar).unwrap();
        store.reload(ModelVariant::Autoregressive).unwrap();

        assert_eq!(*held, ModelParameters::Autoregressive(ArParameters { lags: 5 }));
        assert_eq!(
            *store.get(ModelVariant::Autoregressive).unwrap(),
            ModelParameters::Autoregressive(ArParameters { lags: 2 })
        );
    }

    #[test]
    fn failed_reload_keeps_previous_parameters() {
        let dir = tempdir().unwrap();
        let sarimax = dir.path().join("sarimax.json");
        ModelParameters::Sarima(SarimaParameters::daily(96)).save(&sarimax).unwrap();
        let store = ParameterStore::from_files(&sarimax, dir.path().join("ar.json"));

        std::fs::write(&sarimax, "not json").unwrap();
        assert!(store.reload(ModelVariant::Sarimax).is_err());
        assert!(store.get(ModelVariant::Sarimax).is_ok());
    }

    #[test]
    fn wrong_variant_in_file_is_rejected() {
        let dir = tempdir().unwrap();
        let sarimax = dir.path().join("sarimax.json");
        ModelParameters::Autoregressive(ArParameters { lags: 3 }).save(&sarimax).unwrap();
        let store = ParameterStore::from_files(&sarimax, dir.path().join("ar.json"));
        assert!(store.get(ModelVariant::Sarimax).is_err());
    }

    #[test]
    fn set_targets_the_matching_slot() {
        let store = ParameterStore::empty();
        store.set(ModelParameters::Sarima(SarimaParameters::daily(24)));
        assert!(store.get(ModelVariant::Sarimax).is_ok());
        assert!(store.get(ModelVariant::Autoregressive).is_err());
    }
}
