//! Ordered engine option batches.
//!
//! Every configuration change the host makes is expressed as an
//! [`OptionBatch`]: a list of `name=value` pairs applied in order. Shader-chain
//! edits use the engine's list-option suffixes, so a batch fully describes its
//! effect without extra command calls.

use crate::config::EngineSettings;
use crate::profile::{shader_path, BUILTIN_PROFILES, DEFAULT_PROFILE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Clears the shader chain.
pub const SHADERS_CLEAR: &str = "glsl-shaders-clr";
/// Appends one shader path to the chain.
pub const SHADERS_APPEND: &str = "glsl-shaders-append";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOption {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionBatch {
    options: Vec<EngineOption>,
}

impl OptionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.options.push(EngineOption {
            name: name.to_owned(),
            value: value.to_owned(),
        });
    }

    pub fn clear_shaders(&mut self) {
        self.set(SHADERS_CLEAR, "");
    }

    pub fn append_shader(&mut self, path: &str) {
        self.set(SHADERS_APPEND, path);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EngineOption> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Value the batch leaves `name` at, i.e. the last assignment.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .rev()
            .find(|o| o.name == name)
            .map(|o| o.value.as_str())
    }

    /// Shader chain the batch produces when applied to an empty chain.
    pub fn shader_chain(&self) -> Vec<&str> {
        let mut chain = Vec::new();
        for option in &self.options {
            match option.name.as_str() {
                SHADERS_CLEAR => chain.clear(),
                SHADERS_APPEND => chain.push(option.value.as_str()),
                _ => {}
            }
        }
        chain
    }
}

impl<'a> IntoIterator for &'a OptionBatch {
    type Item = &'a EngineOption;
    type IntoIter = std::slice::Iter<'a, EngineOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.options.iter()
    }
}

/// The fixed configuration applied to every freshly created engine.
///
/// Output and logging options come from `settings`; scaling, deband, and the
/// default shader chain (the `normal` profile's) are fixed.
pub fn baseline_batch(settings: &EngineSettings, shader_dir: Option<&Path>) -> OptionBatch {
    let mut batch = OptionBatch::new();
    batch.set("vo", &settings.vo);
    batch.set("gpu-api", &settings.gpu_api);
    batch.set("gpu-context", &settings.gpu_context);

    batch.set("hwdec", &settings.hwdec);
    batch.set("hwdec-codecs", "all");

    batch.set("profile", "gpu-hq");
    batch.set("scale", "ewa_lanczossharp");
    batch.set("cscale", "ewa_lanczossharp");
    batch.set("dscale", "mitchell");

    batch.set("sigmoid-upscaling", "yes");
    batch.set("correct-downscaling", "yes");
    batch.set("linear-downscaling", "no");

    batch.set("deband", "yes");
    batch.set("deband-iterations", "2");
    batch.set("deband-threshold", "35");
    batch.set("deband-range", "16");
    batch.set("deband-grain", "8");

    for shader in BUILTIN_PROFILES[DEFAULT_PROFILE].shaders {
        batch.append_shader(&shader_path(shader_dir, shader));
    }

    batch.set("msg-level", &settings.msg_level);
    batch
}
