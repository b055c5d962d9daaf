// refraction + two-lobe specular + caustic shading of the wave surface
use glam::{Vec2, Vec3, Vec4};

use super::field::FieldBuffer;
use crate::config::CompositorParams;

const SOFT_TINT: Vec3 = Vec3::new(1.0, 0.98, 0.95);
const CAUSTIC_TINT: Vec3 = Vec3::new(1.0, 0.95, 0.9);

/// Borrowed RGBA8 image, row 0 at the top.
#[derive(Clone, Copy, Debug)]
pub struct ContentFrame<'a> {
    width: u32,
    height: u32,
    rgba: &'a [u8],
}

impl<'a> ContentFrame<'a> {
    /// `None` when the byte slice is too short for the given size or the
    /// image is empty.
    pub fn new(width: u32, height: u32, rgba: &'a [u8]) -> Option<Self> {
        let needed = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() < needed {
            return None;
        }
        Some(Self { width, height, rgba })
    }

    #[inline]
    fn texel(&self, x: i64, y: i64) -> Vec4 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        let i = (y * self.width as usize + x) * 4;
        let px = &self.rgba[i..i + 4];
        Vec4::new(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32) / 255.0
    }

    /// Bilinear, clamp-to-edge. `uv` is bottom-up like the field.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let fx = uv.x * self.width as f32 - 0.5;
        let fy = (1.0 - uv.y) * self.height as f32 - 0.5;
        if !fx.is_finite() || !fy.is_finite() {
            return Vec4::ZERO;
        }
        // everything past one texel outside reads the edge anyway
        let fx = fx.clamp(-1.0, self.width as f32);
        let fy = fy.clamp(-1.0, self.height as f32);
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), tx);
        let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), tx);
        top.lerp(bottom, ty)
    }
}

/// Something that can hand the compositor the content layer.
///
/// The source is refreshed by its owner at its own pace; the compositor only
/// reads whatever is current. Until `ready` the layer composites as empty.
pub trait ContentSource {
    fn current_frame(&self) -> Option<ContentFrame<'_>>;

    fn ready(&self) -> bool {
        self.current_frame().is_some()
    }
}

/// A source that never has content; the surface shows water only.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyContent;

impl ContentSource for EmptyContent {
    fn current_frame(&self) -> Option<ContentFrame<'_>> {
        None
    }
}

/// Owned RGBA8 content image.
#[derive(Clone, Debug, Default)]
pub struct ContentImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl ContentImage {
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            rgba: rgba.repeat(width as usize * height as usize),
        }
    }
}

impl ContentSource for ContentImage {
    fn current_frame(&self) -> Option<ContentFrame<'_>> {
        ContentFrame::new(self.width, self.height, &self.rgba)
    }
}

/// The visible layer: straight-alpha RGBA in [0, 1], row 0 at the top.
#[derive(Clone, Debug)]
pub struct OutputSurface {
    width: u32,
    height: u32,
    pixels: Vec<Vec4>,
}

impl OutputSurface {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            pixels: vec![Vec4::ZERO; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, row: u32) -> Vec4 {
        self.pixels[row as usize * self.width as usize + x as usize]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompositeReport {
    pub skipped_pixels: usize,
}

/// Shade one pixel from its field sample and the refracted content.
fn shade(
    pressure: f32,
    gradient: Vec2,
    uv: Vec2,
    content: Option<&ContentFrame<'_>>,
    params: &CompositorParams,
    light: Vec3,
) -> Vec4 {
    let distortion = gradient * params.distortion;
    let base = content.map_or(Vec4::ZERO, |c| c.sample(uv + distortion));

    let height = pressure.abs();
    let mut color = base.truncate() + Vec3::ONE * pressure.max(0.0) * params.crest_glow;

    let normal = Vec3::new(
        -gradient.x * params.normal_slope,
        params.normal_up,
        -gradient.y * params.normal_slope,
    )
    .normalize_or_zero();
    let facing = normal.dot(light).max(0.0);
    let sharp = facing.powf(params.sharp_exponent);
    let soft = facing.powf(params.soft_exponent);
    color += Vec3::ONE * sharp * params.sharp_weight;
    color += SOFT_TINT * soft * params.soft_weight;

    let caustic = (height * params.caustic_frequency).sin() * 0.5 + 0.5;
    color += CAUSTIC_TINT * caustic * height * params.caustic_weight;

    let water_alpha = (params.base_alpha
        + height * params.height_alpha
        + sharp * params.specular_alpha
        + distortion.length() * params.distortion_alpha)
        .clamp(params.min_alpha, params.max_alpha);

    color.extend(base.w.max(water_alpha))
}

/// Render `field` over `content` into `output`.
///
/// The field is sampled nearest-neighbour, so the output may be any size.
pub fn composite(
    field: &FieldBuffer,
    content: Option<ContentFrame<'_>>,
    params: &CompositorParams,
    output: &mut OutputSurface,
) -> CompositeReport {
    let mut report = CompositeReport::default();
    let grid = field.size();
    let light = Vec3::from_array(params.light_dir).normalize_or_zero();
    let (w, h) = (output.width as f32, output.height as f32);

    for row in 0..output.height {
        let v = 1.0 - (row as f32 + 0.5) / h;
        let gy = ((v * grid.height as f32) as u32).min(grid.height - 1);

        for x in 0..output.width {
            let u = (x as f32 + 0.5) / w;
            let gx = ((u * grid.width as f32) as u32).min(grid.width - 1);
            let cell = field.get(gx, gy);

            let gradient = Vec2::new(cell.gradient_x, cell.gradient_y);
            if !cell.pressure.is_finite() || !gradient.is_finite() {
                report.skipped_pixels += 1;
                continue;
            }

            let i = row as usize * output.width as usize + x as usize;
            output.pixels[i] = shade(
                cell.pressure,
                gradient,
                Vec2::new(u, v),
                content.as_ref(),
                params,
                light,
            );
        }
    }
    report
}
