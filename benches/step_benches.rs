use bevy_liquid_surface::config::LiquidConfig;
use bevy_liquid_surface::cpu::compositor::{composite, ContentImage, ContentSource, OutputSurface};
use bevy_liquid_surface::cpu::field::{GridSize, SimulationField, StepInput};
use criterion::{criterion_group, criterion_main, Criterion};
use glam::Vec2;

fn bench_step(c: &mut Criterion) {
    let config = LiquidConfig::default();
    let grid = GridSize::for_container(1280.0, 720.0, config.scale);
    let mut field = SimulationField::new(grid);
    let input = StepInput {
        pointer: Vec2::new(grid.width as f32 * 0.5, grid.height as f32 * 0.5),
        ripple: true,
        shockwave: true,
    };

    c.bench_function("step_768x432", |b| b.iter(|| field.advance(&input, &config)));
}

fn bench_composite(c: &mut Criterion) {
    let config = LiquidConfig::default();
    let grid = GridSize::for_container(1280.0, 720.0, config.scale);
    let mut field = SimulationField::new(grid);
    let input = StepInput {
        pointer: Vec2::new(100.0, 100.0),
        ripple: true,
        shockwave: false,
    };
    for _ in 0..10 {
        field.advance(&input, &config);
    }
    let content = ContentImage::filled(1280, 720, [102, 126, 234, 255]);
    let mut output = OutputSurface::new(1280, 720);

    c.bench_function("composite_1280x720", |b| {
        b.iter(|| composite(field.current(), content.current_frame(), &config.compositor, &mut output))
    });
}

criterion_group!(benches, bench_step, bench_composite);
criterion_main!(benches);
