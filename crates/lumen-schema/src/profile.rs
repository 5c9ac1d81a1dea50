use crate::options::OptionBatch;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Upper bound on the shader chain a single profile may carry.
pub const MAX_PROFILE_SHADERS: usize = 5;

/// Index of the profile whose shader chain the baseline configuration uses.
pub const DEFAULT_PROFILE: usize = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile index {index} out of range (0..{len})")]
    OutOfRange { index: i64, len: usize },
    #[error("unknown profile: '{0}'")]
    UnknownName(String),
}

/// A named bundle of scaling, deband, hwdec, and shader options.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QualityProfile {
    pub name: &'static str,
    pub description: &'static str,
    /// Shader asset identifiers, in pipeline order.
    pub shaders: &'static [&'static str],
    pub scale: &'static str,
    pub cscale: &'static str,
    pub dscale: &'static str,
    pub deband: &'static str,
    pub hwdec: &'static str,
}

pub const BUILTIN_PROFILES: &[QualityProfile] = &[
    QualityProfile {
        name: "light",
        description: "Bilinear scaling and a single highlight clamp, for weak GPUs",
        shaders: &["Anime4K_Clamp_Highlights.glsl"],
        scale: "bilinear",
        cscale: "bilinear",
        dscale: "bilinear",
        deband: "no",
        hwdec: "auto-safe",
    },
    QualityProfile {
        name: "normal",
        description: "EWA Lanczos scaling with the fast Anime4K upscale chain",
        shaders: &[
            "Anime4K_Clamp_Highlights.glsl",
            "Anime4K_Darken_Fast.glsl",
            "Anime4K_Thin_Fast.glsl",
            "Anime4K_Upscale_Original_x2.glsl",
        ],
        scale: "ewa_lanczos",
        cscale: "ewa_lanczos",
        dscale: "mitchell",
        deband: "yes",
        hwdec: "auto-safe",
    },
    QualityProfile {
        name: "high",
        description: "Sharp EWA Lanczos scaling with the HQ Anime4K chain",
        shaders: &[
            "Anime4K_Clamp_Highlights.glsl",
            "Anime4K_Darken_HQ.glsl",
            "Anime4K_Thin_HQ.glsl",
            "Anime4K_Upscale_DoG_x2.glsl",
        ],
        scale: "ewa_lanczossharp",
        cscale: "ewa_lanczossharp",
        dscale: "mitchell",
        deband: "yes",
        hwdec: "auto",
    },
];

impl QualityProfile {
    /// Build the batch that applies this profile.
    ///
    /// Scaling, deband, and hwdec options are overwritten, the shader chain is
    /// cleared, and each shader is appended in catalog order. Identifiers are
    /// joined onto `shader_dir` when one is given.
    pub fn option_batch(&self, shader_dir: Option<&Path>) -> OptionBatch {
        let mut batch = OptionBatch::new();
        batch.set("hwdec", self.hwdec);
        batch.set("scale", self.scale);
        batch.set("cscale", self.cscale);
        batch.set("dscale", self.dscale);
        batch.set("deband", self.deband);
        batch.clear_shaders();
        for shader in self.shaders {
            batch.append_shader(&shader_path(shader_dir, shader));
        }
        batch
    }
}

pub(crate) fn shader_path(shader_dir: Option<&Path>, shader: &str) -> String {
    match shader_dir {
        Some(dir) => dir.join(shader).to_string_lossy().into_owned(),
        None => shader.to_owned(),
    }
}

/// Look up a profile by catalog index.
///
/// The index is signed because it usually arrives from outside the process
/// (a UI selection, a bridge call); negative values are rejected here.
pub fn get_profile(index: i64) -> Result<&'static QualityProfile, ProfileError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| BUILTIN_PROFILES.get(i))
        .ok_or(ProfileError::OutOfRange {
            index,
            len: BUILTIN_PROFILES.len(),
        })
}

pub fn find_profile(name: &str) -> Option<&'static QualityProfile> {
    BUILTIN_PROFILES.iter().find(|p| p.name == name)
}

pub fn list_profiles() -> &'static [QualityProfile] {
    BUILTIN_PROFILES
}
