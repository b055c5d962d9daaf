use bevy::asset::RenderAssetUsages;
use bevy::image::ImageSampler;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bytemuck::Zeroable;

use crate::cpu::compositor::{ContentFrame, ContentSource, OutputSurface};
use crate::cpu::field::{FieldBuffer, GridSize};
use crate::error::ContextLostError;
use crate::gpu::ffi::{GPUCell, GPUPixel};
use crate::lifecycle::SurfaceBackend;

// ==================== resources ======================================

/// GPU-side images: the composited output shown on screen and a float mirror
/// of the field (pressure, velocity, grad_x, grad_y) for debug views.
#[derive(Resource, Default, Clone)]
pub struct LiquidTextures {
    pub output: Option<Handle<Image>>,
    pub field: Option<Handle<Image>>,
}

/// Handle of the image the host keeps redrawing as the content layer.
#[derive(Resource, Default, Clone)]
pub struct LiquidContent(pub Option<Handle<Image>>);

// =====================================================================

fn extent(width: u32, height: u32) -> Extent3d {
    Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

/// `SurfaceBackend` over `Assets<Image>`, borrowed for one system run.
pub struct ImageTargets<'a> {
    pub images: &'a mut Assets<Image>,
    pub textures: &'a mut LiquidTextures,
}

impl ImageTargets<'_> {
    fn image_mut(
        &mut self,
        handle: Option<&Handle<Image>>,
        what: &str,
    ) -> Result<&mut Image, ContextLostError> {
        let gone = || ContextLostError::new(format!("{what} texture is gone"));
        let Some(handle) = handle else {
            return Err(gone());
        };
        self.images.get_mut(handle).ok_or_else(gone)
    }
}

impl SurfaceBackend for ImageTargets<'_> {
    fn allocate(&mut self, grid: GridSize, output: glam::UVec2) -> Result<(), ContextLostError> {
        self.release();

        let mut field = Image::new_fill(
            extent(grid.width, grid.height),
            TextureDimension::D2,
            bytemuck::bytes_of(&GPUCell::zeroed()),
            TextureFormat::Rgba32Float,
            RenderAssetUsages::default(),
        );
        // float textures are not filterable everywhere
        field.sampler = ImageSampler::nearest();

        let surface = Image::new_fill(
            extent(output.x, output.y),
            TextureDimension::D2,
            &[0, 0, 0, 0],
            TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::default(),
        );

        self.textures.field = Some(self.images.add(field));
        self.textures.output = Some(self.images.add(surface));
        info!(
            "liquid textures allocated: field {}x{}, output {}x{}",
            grid.width, grid.height, output.x, output.y
        );
        Ok(())
    }

    fn upload(&mut self, field: &FieldBuffer, output: &OutputSurface) -> Result<(), ContextLostError> {
        let grid = field.size();
        let field_handle = self.textures.field.clone();
        let image = self.image_mut(field_handle.as_ref(), "field")?;
        if image.width() != grid.width || image.height() != grid.height {
            return Err(ContextLostError::new("field texture size mismatch"));
        }
        let bytes = image.data.get_or_insert_with(Vec::new);
        bytes.clear();
        // image rows run top-down, the field bottom-up
        for y in (0..grid.height).rev() {
            for x in 0..grid.width {
                bytes.extend_from_slice(bytemuck::bytes_of(&GPUCell::from(field.get(x, y))));
            }
        }

        let output_handle = self.textures.output.clone();
        let image = self.image_mut(output_handle.as_ref(), "output")?;
        if image.width() != output.width() || image.height() != output.height() {
            return Err(ContextLostError::new("output texture size mismatch"));
        }
        let pixels: Vec<GPUPixel> = output.pixels().iter().copied().map(GPUPixel::from).collect();
        image.data = Some(bytemuck::cast_slice(&pixels).to_vec());
        Ok(())
    }

    fn release(&mut self) {
        for handle in [self.textures.field.take(), self.textures.output.take()]
            .into_iter()
            .flatten()
        {
            self.images.remove(&handle);
        }
    }
}

/// Reads the content layer straight out of an `Image` asset.
pub struct ImageContent<'a> {
    pub images: &'a Assets<Image>,
    pub handle: Option<&'a Handle<Image>>,
}

impl ContentSource for ImageContent<'_> {
    fn current_frame(&self) -> Option<ContentFrame<'_>> {
        let image = self.images.get(self.handle?)?;
        match image.texture_descriptor.format {
            TextureFormat::Rgba8UnormSrgb | TextureFormat::Rgba8Unorm => {}
            _ => return None,
        }
        ContentFrame::new(image.width(), image.height(), image.data.as_deref()?)
    }
}
