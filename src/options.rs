//! Context Options
//!
//! Everything a [`Context`](crate::Context) needs to know up front: what the
//! device can do and how aggressively pipeline work is shared.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tincture::{ContextOptions, Caps};
//!
//! let options = ContextOptions {
//!     caps: Caps { dual_source_blending: true, ..Caps::default() },
//!     label_pipelines: false,
//!     ..Default::default()
//! };
//! ```
//!
//! Options are plain data and deserialize from JSON; missing fields take
//! their defaults.

use serde::{Deserialize, Serialize};
use tincture_core::{Result, TinctureError};
use tincture_pipeline::PipelineManagerConfig;
use tincture_shader::Caps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    pub caps: Caps,
    /// Upper bound on tracked in-flight pipeline tasks. Requests beyond it
    /// still compile but are not shared.
    pub max_pipeline_tasks_in_flight: usize,
    /// Attach human-readable labels to generated programs and pipelines.
    pub label_pipelines: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        let manager = PipelineManagerConfig::default();
        Self {
            caps: manager.caps,
            max_pipeline_tasks_in_flight: manager.max_tasks_in_flight,
            label_pipelines: manager.label_pipelines,
        }
    }
}

impl ContextOptions {
    /// Rejects binding assignments that would alias one another.
    pub fn validate(&self) -> Result<()> {
        let bindings = &self.caps.resource_binding_requirements;
        let slots = [
            ("intrinsic", bindings.intrinsic_buffer_binding),
            ("render step", bindings.render_step_buffer_binding),
            ("paint", bindings.paint_params_buffer_binding),
        ];
        for (i, (name, slot)) in slots.iter().enumerate() {
            if let Some((other, _)) = slots[i + 1..].iter().find(|(_, s)| s == slot) {
                return Err(TinctureError::InvalidOptions(format!(
                    "{name} and {other} buffers share binding {slot}"
                )));
            }
        }
        if bindings.uniforms_set_index == bindings.textures_and_samplers_set_index {
            return Err(TinctureError::InvalidOptions(format!(
                "uniforms and textures share set {}",
                bindings.uniforms_set_index
            )));
        }
        Ok(())
    }

    #[must_use]
    pub(crate) fn manager_config(&self) -> PipelineManagerConfig {
        PipelineManagerConfig {
            caps: self.caps,
            max_tasks_in_flight: self.max_pipeline_tasks_in_flight,
            label_pipelines: self.label_pipelines,
        }
    }
}
