//! Criterion micro-benchmarks for grid perception sampling.

use criterion::{criterion_group, criterion_main, Criterion};
use realm_core::compression::PngEncoder;
use realm_core::geometry::{Rect, Vec2};
use realm_core::grid::{GridEncoding, GridSensor, GridSpec};
use realm_core::spatial::{BoxQuery, Collider, EntityId, SpatialQuery};
use realm_core::CompressionType;

const AGENT: EntityId = EntityId(0);

#[derive(Debug, Clone)]
struct Tile {
    owner: EntityId,
    tag: &'static str,
    bounds: Rect,
}

impl Collider for Tile {
    fn owner(&self) -> EntityId {
        self.owner
    }

    fn tag(&self) -> &str {
        self.tag
    }

    fn closest_point(&self, point: Vec2) -> Vec2 {
        self.bounds.closest_point(point)
    }
}

/// Brute-force world of unit tiles laid out on a checker pattern.
struct TileWorld {
    tiles: Vec<Tile>,
}

impl TileWorld {
    fn checkerboard(extent: i32) -> Self {
        let tags = ["wall", "coin", "lava"];
        let mut tiles = Vec::new();
        for y in -extent..extent {
            for x in -extent..extent {
                if (x + y) % 2 != 0 {
                    continue;
                }
                let index = tiles.len();
                tiles.push(Tile {
                    owner: EntityId(index as u64 + 1),
                    tag: tags[index % tags.len()],
                    bounds: Rect::new(x as f32, y as f32, 0.8, 0.8),
                });
            }
        }
        Self { tiles }
    }
}

impl SpatialQuery for TileWorld {
    type Shape = Tile;

    fn overlap_box(&self, query: &BoxQuery, limit: usize, out: &mut Vec<Tile>) -> usize {
        let area = Rect::from_center(query.center, query.half_extent);
        let before = out.len();
        out.extend(
            self.tiles
                .iter()
                .filter(|tile| tile.bounds.overlaps(&area))
                .take(limit)
                .cloned(),
        );
        out.len() - before
    }
}

fn grid_spec(size: usize, encoding: GridEncoding) -> GridSpec {
    GridSpec::new(size, size, Vec2::new(1.0, 1.0))
        .with_tags(["wall", "coin", "lava"])
        .with_encoding(encoding)
}

/// Benchmark: Sample a 16x16 scalar-index grid over a dense world.
fn bench_sample_scalar_16(c: &mut Criterion) {
    let world = TileWorld::checkerboard(20);
    let mut sensor: GridSensor<Tile> =
        GridSensor::new(grid_spec(16, GridEncoding::ScalarIndex)).unwrap();

    c.bench_function("grid_sample_scalar_16", |b| {
        b.iter(|| {
            let buffer = sensor.sample(&world, AGENT, Vec2::new(0.5, 0.5)).unwrap();
            std::hint::black_box(buffer);
        });
    });
}

/// Benchmark: Sample a 32x32 one-hot grid over a dense world.
fn bench_sample_one_hot_32(c: &mut Criterion) {
    let world = TileWorld::checkerboard(24);
    let mut sensor: GridSensor<Tile> = GridSensor::new(grid_spec(32, GridEncoding::OneHot)).unwrap();

    c.bench_function("grid_sample_one_hot_32", |b| {
        b.iter(|| {
            let buffer = sensor.sample(&world, AGENT, Vec2::ZERO).unwrap();
            std::hint::black_box(buffer);
        });
    });
}

/// Benchmark: Pack a sampled 32x32 one-hot grid into PNG planes.
fn bench_png_pack_32(c: &mut Criterion) {
    let world = TileWorld::checkerboard(24);
    let spec = grid_spec(32, GridEncoding::OneHot).with_compression(CompressionType::Png);
    let mut sensor: GridSensor<Tile> = GridSensor::new(spec).unwrap();
    sensor.sample(&world, AGENT, Vec2::ZERO).unwrap();

    c.bench_function("grid_png_pack_32", |b| {
        b.iter(|| {
            let images = sensor.compressed_images(&PngEncoder).unwrap();
            std::hint::black_box(images);
        });
    });
}

criterion_group!(
    benches,
    bench_sample_scalar_16,
    bench_sample_one_hot_32,
    bench_png_pack_32
);
criterion_main!(benches);
