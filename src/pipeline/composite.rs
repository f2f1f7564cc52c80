//! Logo compositing: draw a scaled, alpha-blended logo onto a base image.
//!
//! The output canvas always has the base image's exact dimensions; the base
//! is copied at full opacity and the logo is blended on top. Geometry is
//! computed in `f64` by [`logo_rect`] and rounded to whole pixels only when
//! the logo is resized and placed.
//!
//! Only the part of the logo rectangle that intersects the canvas is ever
//! sampled: each visible canvas pixel pulls its colour straight from the
//! source logo, so no intermediate buffer can outgrow the base image however
//! extreme the logo's aspect ratio. Opacity is applied per sample and no blend
//! state survives the call.

use crate::config::{LogoPlacement, LogoPosition};
use image::{DynamicImage, Pixel, Rgba, RgbaImage};
use std::ops::Range;
use tracing::debug;

/// Margin between the logo and the image edge, as a fraction of base width.
pub const MARGIN_FRACTION: f64 = 0.02;

/// Target rectangle of the logo on the base image, in pixels.
///
/// `x`/`y` are offsets from the left/top edge of the base image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Compute where a `logo_w × logo_h` logo lands on a `base_w × base_h` image.
///
/// The logo's aspect ratio is always preserved; only its width is derived
/// from the placement's scale.
pub fn logo_rect(
    base_w: u32,
    base_h: u32,
    logo_w: u32,
    logo_h: u32,
    placement: &LogoPlacement,
) -> LogoRect {
    let placement = placement.clamped();
    let base_w = f64::from(base_w);
    let base_h = f64::from(base_h);

    let width = base_w * placement.scale_percent / 100.0;
    let height = if logo_w == 0 {
        0.0
    } else {
        f64::from(logo_h) / f64::from(logo_w) * width
    };
    let margin = base_w * MARGIN_FRACTION;

    let (x, y) = match placement.position {
        LogoPosition::TopLeft => (margin, margin),
        LogoPosition::TopRight => (base_w - width - margin, margin),
        LogoPosition::BottomLeft => (margin, base_h - height - margin),
        LogoPosition::Center => ((base_w - width) / 2.0, (base_h - height) / 2.0),
        LogoPosition::BottomRight => (base_w - width - margin, base_h - height - margin),
    };

    LogoRect {
        x,
        y,
        width,
        height,
    }
}

/// Decode an encoded asset into a raster image.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory(bytes)
}

/// Composite `logo` onto `base` according to `placement`.
///
/// Returns a new RGBA canvas with the base image's dimensions. Parts of the
/// logo that fall outside the canvas are clipped before any pixel is sampled.
pub fn composite(base: &DynamicImage, logo: &DynamicImage, placement: &LogoPlacement) -> RgbaImage {
    let mut canvas = base.to_rgba8();
    let (base_w, base_h) = canvas.dimensions();

    if logo.width() == 0 || logo.height() == 0 {
        return canvas;
    }

    let rect = logo_rect(base_w, base_h, logo.width(), logo.height(), placement);
    let target_w = rect.width.round().max(1.0) as i64;
    let target_h = rect.height.round().max(1.0) as i64;
    let (x, y) = (rect.x.round() as i64, rect.y.round() as i64);

    let (Some(cols), Some(rows)) = (
        visible_span(x, target_w, base_w),
        visible_span(y, target_h, base_h),
    ) else {
        debug!("Logo at ({}, {}) lies entirely outside the {}x{} base", x, y, base_w, base_h);
        return canvas;
    };
    debug!(
        "Compositing {}x{} logo at ({}, {}) on {}x{} base, visible {:?} x {:?}",
        target_w, target_h, x, y, base_w, base_h, cols, rows
    );

    let source = logo.to_rgba8();
    let x_taps: Vec<Vec<Tap>> = cols
        .clone()
        .map(|cx| taps(cx - x, target_w, source.width()))
        .collect();
    let y_taps: Vec<Vec<Tap>> = rows
        .clone()
        .map(|cy| taps(cy - y, target_h, source.height()))
        .collect();
    let opacity = placement.alpha();

    for (cy, ys) in rows.zip(&y_taps) {
        for (cx, xs) in cols.clone().zip(&x_taps) {
            let px = sample(&source, xs, ys, opacity);
            if px[3] > 0 {
                canvas.get_pixel_mut(cx as u32, cy as u32).blend(&px);
            }
        }
    }

    canvas
}

/// Source pixel index and its weight along one axis.
type Tap = (u32, f32);

/// Canvas pixels covered by `[start, start + len)` along an axis of `limit` pixels.
fn visible_span(start: i64, len: i64, limit: u32) -> Option<Range<i64>> {
    let lo = start.max(0);
    let hi = start.saturating_add(len).min(i64::from(limit));
    (lo < hi).then_some(lo..hi)
}

/// Filter taps for target pixel `t` when `src_len` source pixels are
/// stretched over `target_len` target pixels.
///
/// Upscaling interpolates linearly between the two nearest source pixels;
/// downscaling averages every source pixel the target pixel covers.
fn taps(t: i64, target_len: i64, src_len: u32) -> Vec<Tap> {
    let ratio = f64::from(src_len) / target_len as f64;
    let t = t as f64;
    let last = src_len - 1;

    if ratio <= 1.0 {
        let c = ((t + 0.5) * ratio - 0.5).max(0.0);
        let i0 = (c.floor() as u32).min(last);
        let i1 = (i0 + 1).min(last);
        let f = (c - f64::from(i0)).clamp(0.0, 1.0) as f32;
        if i0 == i1 || f == 0.0 {
            vec![(i0, 1.0)]
        } else {
            vec![(i0, 1.0 - f), (i1, f)]
        }
    } else {
        let lo = t * ratio;
        let hi = (t + 1.0) * ratio;
        let first = (lo.floor() as u32).min(last);
        let end = (hi.ceil() as u32).clamp(first + 1, src_len);
        (first..end)
            .filter_map(|i| {
                let w = (hi.min(f64::from(i) + 1.0) - lo.max(f64::from(i))) / ratio;
                (w > 0.0).then_some((i, w as f32))
            })
            .collect()
    }
}

/// Weighted, alpha-aware sample of `source` with `opacity` folded into alpha.
fn sample(source: &RgbaImage, xs: &[Tap], ys: &[Tap], opacity: f32) -> Rgba<u8> {
    let mut acc = [0f32; 4];
    for &(sy, wy) in ys {
        for &(sx, wx) in xs {
            let p = source.get_pixel(sx, sy).0;
            let a = f32::from(p[3]) * wx * wy;
            acc[0] += f32::from(p[0]) * a;
            acc[1] += f32::from(p[1]) * a;
            acc[2] += f32::from(p[2]) * a;
            acc[3] += a;
        }
    }
    if acc[3] <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |c: f32| (c / acc[3]).round().clamp(0.0, 255.0) as u8;
    Rgba([
        channel(acc[0]),
        channel(acc[1]),
        channel(acc[2]),
        (acc[3] * opacity).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(w: u32, h: u32, c: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(c)))
    }

    fn placement(position: LogoPosition, scale: f64, opacity: f64) -> LogoPlacement {
        LogoPlacement::new(position, scale, opacity)
    }

    #[test]
    fn scale_twenty_on_thousand_wide_base_is_two_hundred() {
        let r = logo_rect(1000, 800, 50, 50, &placement(LogoPosition::TopLeft, 20.0, 100.0));
        assert_eq!(r.width, 200.0);
        assert_eq!(r.height, 200.0);
    }

    #[test]
    fn aspect_ratio_comes_from_logo() {
        let r = logo_rect(1000, 1000, 400, 100, &placement(LogoPosition::TopLeft, 20.0, 100.0));
        assert_eq!(r.width, 200.0);
        assert_eq!(r.height, 50.0);
    }

    #[test]
    fn corner_coordinates() {
        // 1000x500 base, 10 % scale, square logo → 100x100, margin 20.
        let cases = [
            (LogoPosition::TopLeft, 20.0, 20.0),
            (LogoPosition::TopRight, 880.0, 20.0),
            (LogoPosition::BottomLeft, 20.0, 380.0),
            (LogoPosition::BottomRight, 880.0, 380.0),
            (LogoPosition::Center, 450.0, 200.0),
        ];
        for (pos, x, y) in cases {
            let r = logo_rect(1000, 500, 10, 10, &placement(pos, 10.0, 100.0));
            assert!((r.x - x).abs() < 1e-9, "{pos}: x={} want {x}", r.x);
            assert!((r.y - y).abs() < 1e-9, "{pos}: y={} want {y}", r.y);
        }
    }

    #[test]
    fn center_is_centered() {
        let r = logo_rect(640, 480, 300, 120, &placement(LogoPosition::Center, 33.0, 100.0));
        let left = r.x;
        let right = 640.0 - (r.x + r.width);
        let top = r.y;
        let bottom = 480.0 - (r.y + r.height);
        assert!((left - right).abs() < 1e-9);
        assert!((top - bottom).abs() < 1e-9);
    }

    #[test]
    fn output_keeps_base_dimensions_for_every_position() {
        let base = solid(321, 123, [0, 0, 255, 255]);
        let logo = solid(64, 48, [255, 0, 0, 255]);
        for pos in [
            LogoPosition::TopLeft,
            LogoPosition::TopRight,
            LogoPosition::BottomLeft,
            LogoPosition::BottomRight,
            LogoPosition::Center,
        ] {
            for scale in [5.0, 27.5, 50.0] {
                let out = composite(&base, &logo, &placement(pos, scale, 60.0));
                assert_eq!(out.dimensions(), (321, 123), "{pos} @ {scale}%");
            }
        }
    }

    #[test]
    fn opaque_logo_replaces_base_pixels_inside_rect_only() {
        // 400x300 base, 25 % → 100x50 logo centred at (150, 125).
        let base = solid(400, 300, [0, 0, 255, 255]);
        let logo = solid(200, 100, [255, 0, 0, 255]);
        let out = composite(&base, &logo, &placement(LogoPosition::Center, 25.0, 100.0));

        assert_eq!(out.get_pixel(200, 150).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(151, 126).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(10, 10).0, [0, 0, 255, 255]);
        assert_eq!(out.get_pixel(149, 150).0, [0, 0, 255, 255]);
        assert_eq!(out.get_pixel(250, 150).0, [0, 0, 255, 255]);
    }

    #[test]
    fn opacity_blends_uniformly() {
        let base = solid(400, 300, [0, 0, 255, 255]);
        let logo = solid(200, 100, [255, 0, 0, 255]);
        let out = composite(&base, &logo, &placement(LogoPosition::Center, 25.0, 50.0));

        let px = out.get_pixel(200, 150).0;
        assert!((i32::from(px[0]) - 128).abs() <= 2, "got {px:?}");
        assert!((i32::from(px[2]) - 127).abs() <= 2, "got {px:?}");
        assert_eq!(px[3], 255);
    }

    #[test]
    fn logo_alpha_channel_is_respected() {
        let base = solid(400, 300, [0, 0, 255, 255]);
        let logo = solid(200, 100, [255, 0, 0, 0]);
        let out = composite(&base, &logo, &placement(LogoPosition::Center, 25.0, 100.0));
        assert_eq!(out.get_pixel(200, 150).0, [0, 0, 255, 255]);
    }

    #[test]
    fn tall_logo_is_clipped_not_panicking() {
        let base = solid(200, 50, [0, 0, 0, 255]);
        let logo = solid(10, 100, [255, 255, 255, 255]);
        let out = composite(&base, &logo, &placement(LogoPosition::BottomRight, 50.0, 100.0));
        assert_eq!(out.dimensions(), (200, 50));
    }

    #[test]
    fn tall_logo_on_banner_only_samples_visible_rows() {
        // 2000 px wide logo would be two million rows tall; only ten are visible.
        let base = solid(4000, 10, [0, 0, 255, 255]);
        let logo = solid(2, 2000, [255, 0, 0, 255]);
        let out = composite(&base, &logo, &placement(LogoPosition::Center, 50.0, 100.0));
        assert_eq!(out.dimensions(), (4000, 10));
        assert_eq!(out.get_pixel(2000, 5).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(1000, 0).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(999, 5).0, [0, 0, 255, 255]);
        assert_eq!(out.get_pixel(3000, 5).0, [0, 0, 255, 255]);
    }

    #[test]
    fn clipped_tall_logo_only_covers_its_column() {
        let base = solid(100, 10, [0, 0, 255, 255]);
        let logo = solid(1, 1000, [255, 0, 0, 255]);
        let out = composite(&base, &logo, &placement(LogoPosition::TopLeft, 50.0, 100.0));
        // 50x50000 logo at (2, 2).
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(out.get_pixel(60, 5).0, [0, 0, 255, 255]);
        assert_eq!(out.get_pixel(10, 5).0, [255, 0, 0, 255]);
    }

    #[test]
    fn two_tone_logo_keeps_its_halves_when_scaled() {
        let mut logo = RgbaImage::from_pixel(2, 1, Rgba([255, 0, 0, 255]));
        logo.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        let logo = DynamicImage::ImageRgba8(logo);
        let base = solid(1000, 1000, [0, 0, 0, 255]);
        // 200x100 at (20, 20).
        let out = composite(&base, &logo, &placement(LogoPosition::TopLeft, 20.0, 100.0));
        assert_eq!(out.get_pixel(25, 70).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(215, 70).0, [0, 255, 0, 255]);
    }

    #[test]
    fn downscaled_logo_averages_source_pixels() {
        // 4x1 logo alternating opaque white / transparent, squeezed into 1 px wide.
        let mut logo = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        for y in 0..4 {
            logo.put_pixel(1, y, Rgba([0, 0, 0, 0]));
            logo.put_pixel(3, y, Rgba([0, 0, 0, 0]));
        }
        let logo = DynamicImage::ImageRgba8(logo);
        let base = solid(10, 10, [0, 0, 0, 255]);
        let out = composite(&base, &logo, &placement(LogoPosition::Center, 10.0, 100.0));
        // 1x1 logo at (5, 5) after rounding 4.5.
        let px = out.get_pixel(5, 5).0;
        assert!((i32::from(px[0]) - 128).abs() <= 2, "got {px:?}");
    }

    #[test]
    fn repeated_composites_do_not_share_blend_state() {
        let base = solid(100, 100, [0, 0, 255, 255]);
        let logo = solid(10, 10, [255, 0, 0, 255]);
        let faint = placement(LogoPosition::Center, 50.0, 10.0);
        let full = placement(LogoPosition::Center, 50.0, 100.0);

        let _ = composite(&base, &logo, &faint);
        let out = composite(&base, &logo, &full);
        assert_eq!(out.get_pixel(50, 50).0, [255, 0, 0, 255]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode(b"definitely not an image").is_err());
    }
}
