pub mod config;
pub mod error;
pub mod lifecycle;

pub mod cpu {
    pub mod compositor;
    pub mod field;
    pub mod pointer;
    pub mod shockwave;
    pub mod state;
}

pub mod gpu {
    pub mod ffi;
    pub mod plugin;
    pub mod textures;
}

pub use config::LiquidConfig;
pub use error::{ContextLostError, LiquidError};
pub use gpu::plugin::{LiquidSurfacePlugin, LiquidSurfaceFailed};
pub use lifecycle::LiquidSurface;
