use bevy::asset::RenderAssetUsages;
use bevy::input::ButtonInput;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::window::{PrimaryWindow, WindowResized};
use bevy_liquid_surface::gpu::textures::LiquidContent;
use bevy_liquid_surface::lifecycle::{LiquidSurface, Schedule};
use bevy_liquid_surface::{LiquidConfig, LiquidSurfaceFailed, LiquidSurfacePlugin};

#[derive(Component)]
struct ContentCard;

const CONTENT_SIZE: (u32, u32) = (640, 360);
const CARD_HALF: (f32, f32) = (200.0, 110.0); // in content pixels
const CARD_CORNER: f32 = 24.0;
const GRADIENT_FROM: [f32; 3] = [0x66 as f32, 0x7e as f32, 0xea as f32];
const GRADIENT_TO: [f32; 3] = [0x76 as f32, 0x4b as f32, 0xa2 as f32];

fn main() {
    // optional RON config as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => match LiquidConfig::from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{err}, using defaults");
                LiquidConfig::default()
            }
        },
        None => LiquidConfig::default(),
    };

    App::new()
        .add_plugins(DefaultPlugins)
        .insert_resource(config)
        .add_plugins(LiquidSurfacePlugin)
        .add_systems(Startup, setup)
        .add_systems(Update, (keyboard_input, fit_content, report_failures))
        .run();
}

/// Signed distance to a rounded rectangle centred on the origin.
fn rounded_rect_sdf(x: f32, y: f32) -> f32 {
    let qx = x.abs() - (CARD_HALF.0 - CARD_CORNER);
    let qy = y.abs() - (CARD_HALF.1 - CARD_CORNER);
    let outside = Vec2::new(qx.max(0.0), qy.max(0.0)).length();
    outside + qx.max(qy).min(0.0) - CARD_CORNER
}

// 135 degree gradient card on a transparent background
fn card_image() -> Image {
    let (width, height) = CONTENT_SIZE;
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for row in 0..height {
        for col in 0..width {
            let x = col as f32 + 0.5 - width as f32 * 0.5;
            let y = row as f32 + 0.5 - height as f32 * 0.5;

            let t = (((x / CARD_HALF.0) + (y / CARD_HALF.1)) * 0.25 + 0.5).clamp(0.0, 1.0);
            let coverage = (0.5 - rounded_rect_sdf(x, y)).clamp(0.0, 1.0);
            for c in 0..3 {
                let v = GRADIENT_FROM[c] + (GRADIENT_TO[c] - GRADIENT_FROM[c]) * t;
                data.push(v.round() as u8);
            }
            data.push((coverage * 255.0).round() as u8);
        }
    }

    Image::new(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}

fn setup(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    mut content: ResMut<LiquidContent>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    commands.spawn(Camera2d::default());

    let size = match windows.single() {
        Ok(w) => Vec2::new(w.width(), w.height()),
        Err(_) => Vec2::new(CONTENT_SIZE.0 as f32, CONTENT_SIZE.1 as f32),
    };

    let card = images.add(card_image());
    content.0 = Some(card.clone());

    // the page under the liquid layer
    commands.spawn((
        Sprite {
            image: card,
            custom_size: Some(size),
            ..Default::default()
        },
        Transform::from_xyz(0.0, 0.0, 0.0),
        ContentCard,
    ));

    info!("move the pointer over the card; Space pauses, Esc quits");
}

fn keyboard_input(
    keys: Res<ButtonInput<KeyCode>>,
    surface: Option<ResMut<LiquidSurface>>,
    mut exit: EventWriter<AppExit>,
) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
        return;
    }
    let Some(mut surface) = surface else {
        return;
    };
    if keys.just_pressed(KeyCode::Space) {
        match surface.schedule() {
            Schedule::Running => surface.stop(),
            Schedule::Stopped => surface.start(),
            Schedule::Disposed => {}
        }
    }
}

fn fit_content(
    mut resized: EventReader<WindowResized>,
    mut cards: Query<&mut Sprite, With<ContentCard>>,
) {
    let Some(ev) = resized.read().last() else {
        return;
    };
    for mut sprite in &mut cards {
        sprite.custom_size = Some(Vec2::new(ev.width, ev.height));
    }
}

fn report_failures(mut failed: EventReader<LiquidSurfaceFailed>) {
    for ev in failed.read() {
        error!("liquid surface stopped: {}", ev.message);
    }
}
