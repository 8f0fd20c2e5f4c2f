//! Chart widgets owning at most one live chart instance.
//!
//! The chart library itself sits behind [`ChartBackend`]. A [`ChartSlot`]
//! destroys its previous instance before constructing a replacement, and
//! when it is cleared or dropped.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Doughnut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
}

/// Labels plus one numeric series per dataset, as served by the dashboard
/// endpoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

impl ChartData {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse chart data")
    }

    /// True when no dataset has a value for any label.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() || self.datasets.iter().all(|d| d.data.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub data: ChartData,
}

/// The chart library seam.
pub trait ChartBackend {
    type Handle;

    fn create(&mut self, canvas_id: &str, spec: &ChartSpec) -> Result<Self::Handle>;
    fn destroy(&mut self, handle: Self::Handle);
}

pub struct ChartSlot<B: ChartBackend> {
    backend: B,
    canvas_id: String,
    instance: Option<B::Handle>,
}

impl<B: ChartBackend> ChartSlot<B> {
    pub fn new(backend: B, canvas_id: impl Into<String>) -> Self {
        Self {
            backend,
            canvas_id: canvas_id.into(),
            instance: None,
        }
    }

    /// Replaces the live chart. The old instance is destroyed first, so a
    /// failed construction leaves the slot empty.
    pub fn render(&mut self, spec: &ChartSpec) -> Result<()> {
        self.clear();
        let handle = self
            .backend
            .create(&self.canvas_id, spec)
            .with_context(|| format!("Failed to create chart on #{}", self.canvas_id))?;
        debug!("Rendered {:?} chart on #{}", spec.kind, self.canvas_id);
        self.instance = Some(handle);
        Ok(())
    }

    pub fn clear(&mut self) {
        if let Some(old) = self.instance.take() {
            self.backend.destroy(old);
        }
    }

    pub fn is_live(&self) -> bool {
        self.instance.is_some()
    }

    pub fn instance(&self) -> Option<&B::Handle> {
        self.instance.as_ref()
    }
}

impl<B: ChartBackend> Drop for ChartSlot<B> {
    fn drop(&mut self) {
        self.clear();
    }
}
