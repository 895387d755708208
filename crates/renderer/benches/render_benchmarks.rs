//! Benchmarks for the renderer crate - plot rendering and PNG encoding.
//!
//! Run with: cargo bench --package renderer --bench render_benchmarks

use cloud_common::Grid;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use renderer::{png, render_cluster_plot, PlotOptions};

/// BT field in Kelvin with a band of cold cloud and some noise.
fn generate_bt_grid(width: usize, height: usize) -> Grid<f32> {
    let mut rng = rand::thread_rng();
    Grid::from_fn(height, width, |row, col| {
        let band = ((row as f32 / height as f32) * std::f32::consts::PI * 3.0).sin() * 40.0;
        let wave = ((col as f32 / width as f32) * std::f32::consts::PI * 5.0).cos() * 5.0;
        let noise: f32 = rng.gen_range(-2.0..2.0);
        260.0 + band + wave + noise
    })
}

fn bench_cluster_plot(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_plot");
    group.sample_size(20);

    let sizes = [("small", 500, 500), ("full_disk", 2816, 2805)];

    for (name, width, height) in sizes {
        let bt = generate_bt_grid(width, height);
        let mask = bt.map(|&v| u8::from(v < 218.0));

        group.throughput(Throughput::Elements((width * height) as u64));
        group.bench_with_input(BenchmarkId::new("render", name), &(bt, mask), |b, (bt, mask)| {
            b.iter(|| {
                render_cluster_plot(
                    black_box(bt),
                    black_box(mask),
                    [70.0, 90.0, 5.0, 25.0],
                    &PlotOptions::default(),
                )
            })
        });
    }

    group.finish();
}

fn bench_png_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("png_encoding");
    let mut rng = rand::thread_rng();

    for (width, height) in [(256usize, 256usize), (1812, 924)] {
        let pixels: Vec<u8> = (0..width * height * 4).map(|_| rng.gen()).collect();
        group.throughput(Throughput::Bytes((width * height * 4) as u64));
        group.bench_with_input(
            BenchmarkId::new("rgba", format!("{}x{}", width, height)),
            &pixels,
            |b, pixels| b.iter(|| png::create_png(black_box(pixels), width, height)),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_cluster_plot, bench_png_encoding);
criterion_main!(benches);
