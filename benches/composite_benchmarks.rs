use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use remote_bgremove::{CompositeColor, CompositeRenderer, Session, SourceImage};
use std::io::Cursor;

const SIZES: [u32; 3] = [256, 1024, 2048];

/// Half-transparent gradient resembling a cut-out result
fn cutout(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        let alpha = if (x + y) % 3 == 0 { 0 } else { ((x * 255) / size) as u8 };
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, alpha])
    })
}

fn encoded(image: &RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .expect("PNG encoding should succeed");
    out.into_inner()
}

fn benchmark_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_render");
    let renderer = CompositeRenderer::new();

    for size in SIZES {
        let image = DynamicImage::ImageRgba8(cutout(size));

        group.bench_with_input(BenchmarkId::new("solid", size), &image, |b, image| {
            b.iter(|| renderer.render(black_box(image), Some(CompositeColor::WHITE)));
        });
        group.bench_with_input(BenchmarkId::new("checkerboard", size), &image, |b, image| {
            b.iter(|| renderer.render(black_box(image), None));
        });
    }

    group.finish();
}

fn benchmark_render_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_render_bytes");
    group.sample_size(20);
    let renderer = CompositeRenderer::new();

    for size in SIZES {
        let bytes = encoded(&cutout(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bytes, |b, bytes| {
            b.iter(|| {
                renderer
                    .render_bytes(black_box(bytes), Some(CompositeColor::rgb(0, 128, 255)))
                    .expect("render should succeed")
            });
        });
    }

    group.finish();
}

fn benchmark_session_cycle(c: &mut Criterion) {
    let result = Bytes::from(encoded(&cutout(256)));
    let source = SourceImage::new(vec![0xffu8; 64 * 1024], "image/jpeg", "portrait.jpg");

    c.bench_function("session_select_complete_reset", |b| {
        let mut session = Session::new();
        session.set_api_key("bench-key");
        b.iter(|| {
            session
                .select_image(source.clone())
                .expect("select should succeed");
            let request = session.begin_removal().expect("begin should succeed");
            session.complete_removal(request.ticket(), Ok(result.clone()));
            black_box(session.download().expect("download should succeed"));
            session.reset();
        });
    });
}

criterion_group!(
    benches,
    benchmark_render,
    benchmark_render_bytes,
    benchmark_session_cycle
);
criterion_main!(benches);
