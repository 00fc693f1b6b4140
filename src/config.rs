// config.rs — renderer tuning knobs
//
// Loaded from a JSON file (path in $GLINT_CONFIG, or passed explicitly).
// Every key is optional:
//
// {
//   "vertex_capacity": 10000,
//   "index_capacity": 15000,
//   "gamma": 1.4,
//   "min_ellipse_segments": 12,
//   "max_ellipse_segments": 256,
//   "corner_segments": 8,
//   "min_line_length": 0.001
// }

use serde::Deserialize;
use std::path::Path;

use crate::buffer::{MIN_INDEX_CAPACITY, MIN_VERTEX_CAPACITY};
use crate::error::{RenderError, Result};

pub const CONFIG_ENV: &str = "GLINT_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Vertices staged between flushes.
    pub vertex_capacity: usize,
    /// 32-bit indices staged between flushes.
    pub index_capacity: usize,
    /// Glyph coverage gamma (`uGamma`).
    pub gamma: f32,
    pub min_ellipse_segments: u32,
    pub max_ellipse_segments: u32,
    /// Default per-corner segments for rounded rectangles.
    pub corner_segments: u32,
    /// Lines shorter than this are skipped.
    pub min_line_length: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            vertex_capacity: 10_000,
            index_capacity: 15_000,
            gamma: 1.4,
            min_ellipse_segments: 12,
            max_ellipse_segments: 256,
            corner_segments: 8,
            min_line_length: 0.001,
        }
    }
}

impl RendererConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Load from `$GLINT_CONFIG` if set; defaults otherwise. A broken file is
    /// logged and ignored rather than aborting startup.
    pub fn from_env() -> Self {
        let Ok(path) = std::env::var(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::load(Path::new(&path)) {
            Ok(cfg) => {
                tracing::info!("renderer config loaded from {path}");
                cfg
            }
            Err(e) => {
                tracing::warn!("renderer config {path}: {e} — using defaults");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.vertex_capacity < MIN_VERTEX_CAPACITY {
            return Err(RenderError::Config(format!(
                "vertex_capacity {} is below the minimum of {MIN_VERTEX_CAPACITY}",
                self.vertex_capacity
            )));
        }
        if self.index_capacity < MIN_INDEX_CAPACITY {
            return Err(RenderError::Config(format!(
                "index_capacity {} is below the minimum of {MIN_INDEX_CAPACITY}",
                self.index_capacity
            )));
        }
        if !(self.gamma > 0.0) {
            return Err(RenderError::Config(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        if self.min_ellipse_segments > self.max_ellipse_segments {
            return Err(RenderError::Config(format!(
                "min_ellipse_segments {} exceeds max_ellipse_segments {}",
                self.min_ellipse_segments, self.max_ellipse_segments
            )));
        }
        Ok(())
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let cfg = RendererConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, RendererConfig::default());
        assert_eq!(cfg.vertex_capacity, 10_000);
        assert_eq!(cfg.index_capacity, 15_000);
    }

    #[test]
    fn partial_override() {
        let cfg = RendererConfig::from_json_str(r#"{ "gamma": 1.8, "corner_segments": 4 }"#)
            .unwrap();
        assert!((cfg.gamma - 1.8).abs() < 1e-6);
        assert_eq!(cfg.corner_segments, 4);
        assert_eq!(cfg.min_ellipse_segments, 12);
    }

    #[test]
    fn tiny_capacity_rejected() {
        let err = RendererConfig::from_json_str(r#"{ "index_capacity": 3 }"#).unwrap_err();
        assert!(matches!(err, RenderError::Config(_)));
    }

    #[test]
    fn zero_gamma_rejected() {
        assert!(RendererConfig::from_json_str(r#"{ "gamma": 0.0 }"#).is_err());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = RendererConfig::from_json_str("{ vertex_capacity: ").unwrap_err();
        assert!(matches!(err, RenderError::ConfigParse(_)));
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("glint-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "vertex_capacity": 512 }"#).unwrap();
        let cfg = RendererConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.vertex_capacity, 512);
    }
}
