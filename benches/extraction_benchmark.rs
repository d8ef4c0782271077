use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use facesift::config::CropSize;
use facesift::crop::{FaceBox, calculate_crop_area};
use facesift::writer::create_face_crop;
use image::RgbImage;

fn create_test_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, (x ^ y) as u8]))
}

fn benchmark_crop_area(c: &mut Criterion) {
    let faces = [
        FaceBox::new(400, 200, 180, 220),
        FaceBox::new(-25, -10, 160, 200),
        FaceBox::new(1800, 1000, 300, 300),
    ];

    c.bench_function("calculate_crop_area", |b| {
        b.iter(|| {
            for face in &faces {
                black_box(calculate_crop_area(black_box(*face), 1920, 1080).ok());
            }
        })
    });
}

fn benchmark_face_crop(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_face_crop");
    let frame = create_test_frame(1920, 1080);

    // Box side lengths typical for 1080p interview footage
    for side in [96u32, 224, 480].iter() {
        let face = FaceBox::new(700, 300, *side as i32, *side as i32);
        let area = calculate_crop_area(face, frame.width(), frame.height()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(side), &area, |b, area| {
            b.iter(|| black_box(create_face_crop(&frame, area, CropSize::square(224))))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_crop_area, benchmark_face_crop);
criterion_main!(benches);
