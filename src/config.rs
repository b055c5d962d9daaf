//! Typed configuration for the liquid surface.
//!
//! Everything here is fixed when a [`LiquidSurface`](crate::lifecycle::LiquidSurface)
//! is built and is checked once by [`LiquidConfig::validate`].

use std::fs;
use std::path::{Path, PathBuf};

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

/// Simulation parameters, applied uniformly to the whole field.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidConfig {
    /// Grid cells per container pixel, in (0, 1]
    pub scale: f32,
    /// Multiplier on the Laplacian and the position integration
    pub wave_speed: f32,
    /// Per-step pressure decay. Must stay below 1: the field has no other
    /// bound on pressure and grows without limit at 1 or above.
    pub damping: f32,
    /// Ripple radius in grid cells; the shockwave ring sits at twice this
    pub ripple_radius: f32,
    #[serde(default)]
    pub compositor: CompositorParams,
}

impl Default for LiquidConfig {
    fn default() -> Self {
        Self {
            scale: 0.6,
            wave_speed: 1.1,
            damping: 0.95,
            ripple_radius: 20.0,
            compositor: CompositorParams::default(),
        }
    }
}

/// Shading constants for the compositor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorParams {
    /// Gradient to uv offset
    pub distortion: f32,
    /// Horizontal weight of the gradient in the surface normal
    pub normal_slope: f32,
    /// Vertical component of the surface normal
    pub normal_up: f32,
    pub light_dir: [f32; 3],
    pub sharp_exponent: f32,
    pub soft_exponent: f32,
    pub sharp_weight: f32,
    pub soft_weight: f32,
    /// Brightening on positive crests
    pub crest_glow: f32,
    pub caustic_frequency: f32,
    pub caustic_weight: f32,
    pub base_alpha: f32,
    pub height_alpha: f32,
    pub specular_alpha: f32,
    pub distortion_alpha: f32,
    pub min_alpha: f32,
    pub max_alpha: f32,
}

impl Default for CompositorParams {
    fn default() -> Self {
        Self {
            distortion: 0.25,
            normal_slope: 3.5,
            normal_up: 0.4,
            light_dir: [-2.5, 6.0, 2.5],
            sharp_exponent: 200.0,
            soft_exponent: 100.0,
            sharp_weight: 1.0,
            soft_weight: 0.5,
            crest_glow: 0.1,
            caustic_frequency: 20.0,
            caustic_weight: 0.08,
            base_alpha: 0.12,
            height_alpha: 0.3,
            specular_alpha: 0.5,
            distortion_alpha: 0.8,
            min_alpha: 0.08,
            max_alpha: 0.6,
        }
    }
}

impl CompositorParams {
    fn is_finite(&self) -> bool {
        let scalars = [
            self.distortion,
            self.normal_slope,
            self.normal_up,
            self.sharp_exponent,
            self.soft_exponent,
            self.sharp_weight,
            self.soft_weight,
            self.crest_glow,
            self.caustic_frequency,
            self.caustic_weight,
            self.base_alpha,
            self.height_alpha,
            self.specular_alpha,
            self.distortion_alpha,
            self.min_alpha,
            self.max_alpha,
        ];
        scalars.iter().chain(&self.light_dir).all(|v| v.is_finite())
    }
}

impl LiquidConfig {
    /// Rejects configurations the step cannot run stably with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [self.scale, self.wave_speed, self.damping, self.ripple_radius];
        if finite.iter().any(|v| !v.is_finite()) || !self.compositor.is_finite() {
            return Err(ConfigError::NonFinite);
        }
        if self.scale <= 0.0 || self.scale > 1.0 {
            return Err(ConfigError::Scale(self.scale));
        }
        if self.wave_speed <= 0.0 {
            return Err(ConfigError::WaveSpeed(self.wave_speed));
        }
        if !(0.0..1.0).contains(&self.damping) {
            return Err(ConfigError::Damping(self.damping));
        }
        if self.ripple_radius <= 0.0 {
            return Err(ConfigError::RippleRadius(self.ripple_radius));
        }

        let c = &self.compositor;
        if c.min_alpha > c.max_alpha || c.min_alpha <= 0.0 || c.max_alpha > 1.0 {
            return Err(ConfigError::AlphaRange {
                min: c.min_alpha,
                max: c.max_alpha,
            });
        }
        if glam::Vec3::from_array(c.light_dir).length_squared() == 0.0 {
            return Err(ConfigError::LightDirection);
        }
        Ok(())
    }

    pub fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a RON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|error| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            error,
        })?;
        Self::from_ron_str(&contents)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path.as_ref(), contents).map_err(|error| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            error,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config values must be finite")]
    NonFinite,
    #[error("scale must be in (0, 1], got {0}")]
    Scale(f32),
    #[error("wave_speed must be positive, got {0}")]
    WaveSpeed(f32),
    #[error("damping must be in [0, 1), got {0}; the field is unstable otherwise")]
    Damping(f32),
    #[error("ripple_radius must be positive, got {0}")]
    RippleRadius(f32),
    #[error("alpha range [{min}, {max}] is empty or outside (0, 1]")]
    AlphaRange { min: f32, max: f32 },
    #[error("light direction must be non-zero")]
    LightDirection,
    #[error("failed to read/write config file '{}': {error}", path.display())]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("RON serialize error: {0}")]
    Serialize(#[from] ron::Error),
}
