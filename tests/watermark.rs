//! Integration tests for the watermark pipeline: files on disk in, files on disk out.
//!
//! Everything runs locally against images generated in a temp directory.
//!
//! Run with:
//!   cargo test --test watermark -- --nocapture

use image::{Rgba, RgbaImage};
use social_postkit::{
    export_images, watermark_files, LogoPlacement, LogoPosition, OutputFormat, PostkitError,
    WatermarkConfig, WatermarkController, WatermarkInputs, ImageAsset,
};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn write_png(dir: &Path, name: &str, w: u32, h: u32, colour: [u8; 4]) -> String {
    let path = dir.join(name);
    RgbaImage::from_pixel(w, h, Rgba(colour))
        .save(&path)
        .expect("write test image");
    path.to_string_lossy().into_owned()
}

fn png_config(position: LogoPosition) -> WatermarkConfig {
    WatermarkConfig::builder()
        .placement(LogoPlacement::new(position, 20.0, 100.0))
        .output_format(OutputFormat::Png)
        .build()
        .unwrap()
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn watermark_and_export_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = vec![
        write_png(dir.path(), "wide.png", 500, 200, [0, 0, 255, 255]),
        write_png(dir.path(), "tall.png", 100, 300, [0, 255, 0, 255]),
    ];
    let logo = write_png(dir.path(), "logo.png", 50, 50, [255, 0, 0, 255]);

    let out = watermark_files(&inputs, Some(&logo), &png_config(LogoPosition::TopLeft))
        .await
        .unwrap();
    assert_eq!(out.len(), 2);
    assert!(out.failures.is_empty());

    let out_dir = dir.path().join("out");
    let paths = export_images(&out.images, &out_dir).await.unwrap();
    assert_eq!(file_names(&paths), ["watermarked_image_1.png", "watermarked_image_2.png"]);

    // 500 px wide, 20 % → 100 px logo at margin 10.
    let first = image::open(&paths[0]).unwrap().to_rgba8();
    assert_eq!(first.dimensions(), (500, 200));
    assert_eq!(first.get_pixel(50, 50).0, [255, 0, 0, 255]);
    assert_eq!(first.get_pixel(5, 5).0, [0, 0, 255, 255]);
    assert_eq!(first.get_pixel(300, 150).0, [0, 0, 255, 255]);

    let second = image::open(&paths[1]).unwrap();
    assert_eq!((second.width(), second.height()), (100, 300));
}

#[tokio::test]
async fn sixty_inputs_produce_fifty_outputs_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let inputs: Vec<String> = (0..60)
        .map(|i| write_png(dir.path(), &format!("img{i:02}.png"), 10 + i, 10, [0, 0, 0, 255]))
        .collect();
    let logo = write_png(dir.path(), "logo.png", 4, 4, [255, 255, 255, 255]);

    let out = watermark_files(&inputs, Some(&logo), &png_config(LogoPosition::Center))
        .await
        .unwrap();

    assert_eq!(out.len(), 50);
    assert_eq!(out.stats.submitted, 60);
    assert_eq!(out.stats.truncated, 10);
    for (pos, img) in out.images.iter().enumerate() {
        assert_eq!(img.source_index, pos);
        assert_eq!(img.width, 10 + pos as u32);
    }
}

#[tokio::test]
async fn no_logo_produces_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = vec![write_png(dir.path(), "a.png", 8, 8, [0, 0, 0, 255])];
    let out = watermark_files(&inputs, None, &WatermarkConfig::default())
        .await
        .unwrap();
    assert!(out.is_empty());

    let paths = export_images(&out.images, dir.path().join("out")).await.unwrap();
    assert!(paths.is_empty());
}

#[tokio::test]
async fn undecodable_image_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.jpg");
    std::fs::write(&broken, b"\xff\xd8 not really a jpeg").unwrap();
    let inputs = vec![
        write_png(dir.path(), "a.png", 8, 8, [0, 0, 0, 255]),
        broken.to_string_lossy().into_owned(),
        write_png(dir.path(), "c.png", 8, 8, [0, 0, 0, 255]),
    ];
    let logo = write_png(dir.path(), "logo.png", 2, 2, [255, 0, 0, 255]);

    let out = watermark_files(&inputs, Some(&logo), &WatermarkConfig::default())
        .await
        .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out.failures.len(), 1);
    assert_eq!(out.failures[0].index(), 1);
    assert_eq!(out.images[1].source_name, "c.png");

    // Default output is JPEG.
    let paths = export_images(&out.images, dir.path().join("out")).await.unwrap();
    assert_eq!(file_names(&paths), ["watermarked_image_1.jpg", "watermarked_image_2.jpg"]);
}

#[tokio::test]
async fn missing_input_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let logo = write_png(dir.path(), "logo.png", 2, 2, [255, 0, 0, 255]);
    let inputs = vec![dir.path().join("nope.png").to_string_lossy().into_owned()];

    let err = watermark_files(&inputs, Some(&logo), &WatermarkConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PostkitError::FileNotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn controller_keeps_newest_placement() {
    let dir = tempfile::tempdir().unwrap();
    let base = std::fs::read(write_png(dir.path(), "a.png", 100, 100, [0, 0, 255, 255])).unwrap();
    let logo = std::fs::read(write_png(dir.path(), "l.png", 10, 10, [255, 0, 0, 255])).unwrap();

    let controller = WatermarkController::new();
    let inputs = |position| WatermarkInputs {
        images: vec![ImageAsset::new("a.png", base.clone())],
        logo: Some(ImageAsset::new("l.png", logo.clone())),
        config: png_config(position),
    };

    controller.refresh(inputs(LogoPosition::TopLeft)).await.unwrap();
    controller.refresh(inputs(LogoPosition::BottomRight)).await.unwrap();

    let current = controller.current().unwrap();
    let img = image::load_from_memory(&current.images[0].bytes).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(5, 5).0, [0, 0, 255, 255]);
    assert_eq!(img.get_pixel(85, 85).0, [255, 0, 0, 255]);
}
