use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::aggregate::ThresholdPolicy;
use crate::data::loader::DatasetCache;
use crate::data::model::{NumericField, RentalDataset};
use crate::view::DashboardView;

// ---------------------------------------------------------------------------
// City selector
// ---------------------------------------------------------------------------

/// The city picker at the bottom of the dashboard.
///
/// Options come from the unfiltered table. The selection is kept for a
/// per-city view; no chart reads it yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitySelector {
    pub options: Vec<String>,
    pub selected: Option<String>,
}

impl CitySelector {
    pub fn from_dataset(dataset: &RentalDataset) -> Self {
        let options = dataset.cities();
        let selected = options.first().cloned();
        Self { options, selected }
    }

    /// Ignores cities that are not among the options.
    pub fn select(&mut self, city: &str) {
        if self.options.iter().any(|c| c == city) {
            self.selected = Some(city.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded tables, one per path opened this session.
    pub cache: DatasetCache,

    pub config: DashboardConfig,

    /// Raw table currently shown.
    pub dataset: Option<Arc<RentalDataset>>,

    /// Everything the charts draw, derived from `dataset` and `config`.
    pub view: Option<DashboardView>,

    pub city_selector: CitySelector,

    /// Colour per city, stable across rebuilds of the same table.
    pub color_map: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            cache: DatasetCache::new(),
            config,
            dataset: None,
            view: None,
            city_selector: CitySelector::default(),
            color_map: None,
            status_message: None,
        }
    }

    /// Load the configured table. A failure here is fatal to the caller.
    pub fn build(config: DashboardConfig) -> Result<Self> {
        let mut state = Self::new(config);
        let path = state.config.data_path.clone();
        let dataset = state.cache.get_or_load(&path)?;
        state.set_dataset(dataset);
        Ok(state)
    }

    /// Ingest a newly loaded table and derive everything from it.
    pub fn set_dataset(&mut self, dataset: Arc<RentalDataset>) {
        self.city_selector = CitySelector::from_dataset(&dataset);
        self.color_map = Some(ColorMap::new(&self.city_selector.options));
        self.dataset = Some(dataset);
        self.status_message = None;
        self.rebuild_view();
    }

    /// Recompute the derived view after the table or config changed.
    pub fn rebuild_view(&mut self) {
        self.view = self
            .dataset
            .as_deref()
            .map(|ds| DashboardView::build(ds, &self.config));
    }

    /// Load another file (File → Open). On failure the current table stays.
    pub fn open_path(&mut self, path: &Path) {
        match self.cache.get_or_load(path) {
            Ok(dataset) => {
                self.config.data_path = path.to_path_buf();
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    pub fn set_scatter_policy(&mut self, policy: ThresholdPolicy) {
        if self.config.scatter_policy != policy {
            self.config.scatter_policy = policy;
            self.rebuild_view();
        }
    }

    /// Turn one outlier pass on or off, keeping area before total.
    pub fn toggle_outlier_field(&mut self, field: NumericField) {
        let fields = &mut self.config.outliers.fields;
        if let Some(pos) = fields.iter().position(|&f| f == field) {
            fields.remove(pos);
        } else {
            fields.push(field);
            fields.sort_by_key(|f| NumericField::ALL.iter().position(|a| a == f));
        }
        self.rebuild_view();
    }
}
