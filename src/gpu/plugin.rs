use bevy::input::touch::{TouchInput, TouchPhase};
use bevy::prelude::*;
use bevy::window::{CursorEntered, CursorLeft, CursorMoved, PrimaryWindow, WindowResized};

use crate::config::LiquidConfig;
use crate::cpu::pointer::PointerEvent;
use crate::gpu::textures::{ImageContent, ImageTargets, LiquidContent, LiquidTextures};
use crate::lifecycle::{LiquidSurface, Schedule};

// ==================== components / events ============================

/// Sprite that shows the composited liquid layer; kept window sized.
#[derive(Component)]
pub struct LiquidOutputSprite;

/// The surface could not recover from a lost context and has stopped.
#[derive(Event, Debug, Clone)]
pub struct LiquidSurfaceFailed {
    pub message: String,
}

#[derive(Debug, Hash, PartialEq, Eq, Clone, SystemSet)]
pub struct LiquidSurfaceSet;

// Draw order above the content layer
const OUTPUT_Z: f32 = 10.0;

// ========================== systems ==================================

// Startup systems that have to run only once

fn init_liquid_surface(
    mut commands: Commands,
    config: Res<LiquidConfig>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut failed: EventWriter<LiquidSurfaceFailed>,
) {
    let (width, height) = match windows.single() {
        Ok(window) => (window.width(), window.height()),
        Err(_) => {
            warn!("no primary window yet, liquid surface starts at 1x1");
            (1.0, 1.0)
        }
    };

    let mut surface = match LiquidSurface::new(config.clone(), width, height) {
        Ok(surface) => surface,
        Err(err) => {
            error!("{err}");
            failed.write(LiquidSurfaceFailed {
                message: err.to_string(),
            });
            return;
        }
    };
    surface.start();
    commands.insert_resource(surface);

    commands.spawn((
        Sprite {
            custom_size: Some(Vec2::new(width, height)),
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, OUTPUT_Z),
        LiquidOutputSprite,
    ));
}

// Update systems that have to run per frame

fn track_pointer(
    surface: Option<ResMut<LiquidSurface>>,
    windows: Query<(Entity, &Window), With<PrimaryWindow>>,
    mut entered: EventReader<CursorEntered>,
    mut moved: EventReader<CursorMoved>,
    mut touches: EventReader<TouchInput>,
    mut left: EventReader<CursorLeft>,
) {
    let Some(mut surface) = surface else {
        return;
    };
    let Ok((primary, window)) = windows.single() else {
        return;
    };

    // read both readers fully so nothing carries over to the next frame
    let did_enter = entered.read().filter(|ev| ev.window == primary).count() > 0;
    let did_leave = left.read().filter(|ev| ev.window == primary).count() > 0;

    // only the latest position matters to a frame
    if let Some(ev) = moved.read().filter(|ev| ev.window == primary).last() {
        surface.handle_pointer(PointerEvent::Move {
            x: ev.position.x,
            y: ev.position.y,
        });
    }
    for touch in touches.read().filter(|touch| touch.window == primary) {
        let (x, y) = (touch.position.x, touch.position.y);
        let event = match touch.phase {
            TouchPhase::Started => PointerEvent::TouchStart { x, y },
            TouchPhase::Moved => PointerEvent::TouchMove { x, y },
            TouchPhase::Ended | TouchPhase::Canceled => PointerEvent::TouchEnd,
        };
        surface.handle_pointer(event);
    }
    // enter and leave arrive on separate queues; the window knows which came last
    if did_enter || did_leave {
        let crossing = if window.cursor_position().is_some() {
            PointerEvent::Enter
        } else {
            PointerEvent::Leave
        };
        surface.handle_pointer(crossing);
    }
}

fn handle_resize(
    surface: Option<ResMut<LiquidSurface>>,
    windows: Query<Entity, With<PrimaryWindow>>,
    mut resized: EventReader<WindowResized>,
    mut sprites: Query<&mut Sprite, With<LiquidOutputSprite>>,
) {
    let Some(mut surface) = surface else {
        return;
    };
    let Ok(primary) = windows.single() else {
        return;
    };
    // a drag produces a burst of events; only the final size is allocated
    let Some(ev) = resized.read().filter(|ev| ev.window == primary).last() else {
        return;
    };
    surface.resize(ev.width, ev.height);
    for mut sprite in &mut sprites {
        sprite.custom_size = Some(Vec2::new(ev.width, ev.height));
    }
}

fn step_liquid_surface(
    surface: Option<ResMut<LiquidSurface>>,
    images: Res<Assets<Image>>,
    content: Res<LiquidContent>,
) {
    let Some(mut surface) = surface else {
        return;
    };
    let Some(ticket) = surface.request_frame() else {
        return;
    };
    let source = ImageContent {
        images: &images,
        handle: content.0.as_ref(),
    };
    surface.run_frame(ticket, &source);
}

fn present_liquid_surface(
    surface: Option<ResMut<LiquidSurface>>,
    mut images: ResMut<Assets<Image>>,
    mut textures: ResMut<LiquidTextures>,
    mut failed: EventWriter<LiquidSurfaceFailed>,
) {
    let Some(mut surface) = surface else {
        return;
    };
    if surface.schedule() != Schedule::Running {
        return;
    }
    let mut targets = ImageTargets {
        images: &mut images,
        textures: &mut textures,
    };
    if let Err(err) = surface.present(&mut targets) {
        failed.write(LiquidSurfaceFailed {
            message: err.to_string(),
        });
    }
}

fn sync_output_sprite(
    textures: Res<LiquidTextures>,
    mut sprites: Query<&mut Sprite, With<LiquidOutputSprite>>,
) {
    let Some(handle) = textures.output.as_ref() else {
        return;
    };
    for mut sprite in &mut sprites {
        if sprite.image != *handle {
            sprite.image = handle.clone();
        }
    }
}

/// Dispose the surface and free its images. Safe to run more than once.
pub fn teardown_liquid_surface(
    surface: Option<ResMut<LiquidSurface>>,
    mut images: ResMut<Assets<Image>>,
    mut textures: ResMut<LiquidTextures>,
) {
    let Some(mut surface) = surface else {
        return;
    };
    let mut targets = ImageTargets {
        images: &mut images,
        textures: &mut textures,
    };
    surface.dispose_with(&mut targets);
}

fn teardown_on_exit(
    mut exit: EventReader<AppExit>,
    surface: Option<ResMut<LiquidSurface>>,
    images: ResMut<Assets<Image>>,
    textures: ResMut<LiquidTextures>,
) {
    if exit.read().last().is_none() {
        return;
    }
    teardown_liquid_surface(surface, images, textures);
}

// =====================================================================

// Plugin

pub struct LiquidSurfacePlugin;

impl Plugin for LiquidSurfacePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LiquidConfig>()
            .init_resource::<LiquidTextures>()
            .init_resource::<LiquidContent>()
            .add_event::<LiquidSurfaceFailed>()
            .add_systems(Startup, init_liquid_surface)
            .add_systems(
                Update,
                (
                    track_pointer,
                    handle_resize,
                    step_liquid_surface,
                    present_liquid_surface,
                    sync_output_sprite,
                )
                    .chain()
                    .in_set(LiquidSurfaceSet),
            )
            .add_systems(Last, teardown_on_exit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with_windows() -> (App, Entity, Entity) {
        let mut app = App::new();
        app.add_event::<CursorEntered>()
            .add_event::<CursorLeft>()
            .add_event::<CursorMoved>()
            .add_event::<TouchInput>()
            .add_event::<WindowResized>()
            .add_systems(Update, (track_pointer, handle_resize).chain());
        let surface = LiquidSurface::new(LiquidConfig::default(), 200.0, 100.0).unwrap();
        app.insert_resource(surface);

        let primary = app.world_mut().spawn((Window::default(), PrimaryWindow)).id();
        let other = app.world_mut().spawn(Window::default()).id();
        (app, primary, other)
    }

    fn surface(app: &App) -> &LiquidSurface {
        app.world().resource::<LiquidSurface>()
    }

    fn set_cursor(app: &mut App, window: Entity, position: Option<Vec2>) {
        let mut entity = app.world_mut().entity_mut(window);
        let mut window = entity.get_mut::<Window>().unwrap();
        window.set_cursor_position(position);
    }

    #[test]
    fn leave_then_enter_in_one_frame_stays_active() {
        let (mut app, primary, _) = app_with_windows();
        set_cursor(&mut app, primary, Some(Vec2::new(20.0, 20.0)));

        app.world_mut().send_event(CursorLeft { window: primary });
        app.world_mut().send_event(CursorEntered { window: primary });
        app.update();
        assert!(surface(&app).pointer().active);

        set_cursor(&mut app, primary, None);
        app.world_mut().send_event(CursorEntered { window: primary });
        app.world_mut().send_event(CursorLeft { window: primary });
        app.update();
        assert!(!surface(&app).pointer().active);
    }

    #[test]
    fn other_windows_are_ignored() {
        let (mut app, primary, other) = app_with_windows();

        app.world_mut().send_event(CursorMoved {
            window: other,
            position: Vec2::new(50.0, 20.0),
            delta: None,
        });
        app.world_mut().send_event(WindowResized {
            window: other,
            width: 40.0,
            height: 40.0,
        });
        app.update();
        assert!(!surface(&app).pointer().active);
        assert_eq!(surface(&app).output().map(|o| o.width()), Some(200));

        app.world_mut().send_event(CursorMoved {
            window: primary,
            position: Vec2::new(50.0, 20.0),
            delta: None,
        });
        app.update();
        assert!(surface(&app).pointer().active);
    }
}
