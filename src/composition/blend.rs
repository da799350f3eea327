//! Per-pixel blending of sprite layers

use image::Luma;

use crate::sprite::{Bpp, Layers};

/// Blend a source pixel over a destination pixel ("source over").
///
/// Alphas are 0-255. Returns the blended colour and alpha.
pub(crate) fn blend_pixel(src: [u8; 3], src_alpha: u8, dst: [u8; 3], dst_alpha: u8) -> ([u8; 3], u8) {
    let src_a = src_alpha as f32 / 255.0;
    let dst_a = dst_alpha as f32 / 255.0;

    // out_alpha = src_alpha + dst_alpha * (1 - src_alpha)
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a == 0.0 {
        return ([0, 0, 0], 0);
    }

    // out_color = (src_color * src_alpha + dst_color * dst_alpha * (1 - src_alpha)) / out_alpha
    let composite = |s: u8, d: u8| -> u8 {
        let s = s as f32 / 255.0;
        let d = d as f32 / 255.0;
        let result = (s * src_a + d * dst_a * (1.0 - src_a)) / out_a;
        (result.clamp(0.0, 1.0) * 255.0).round() as u8
    };

    (
        [composite(src[0], dst[0]), composite(src[1], dst[1]), composite(src[2], dst[2])],
        (out_a * 255.0).round() as u8,
    )
}

/// Merge `layer` onto `acc`, back to front. Both must have the same size.
pub(crate) fn merge_onto(acc: &mut Layers, layer: &Layers) {
    match &layer.alpha {
        // Opaque data replaces whatever was below.
        None => {
            acc.rgb = layer.rgb.clone();
            acc.alpha = None;
            acc.bpp = layer.bpp;
        }
        Some(alpha) => {
            for (x, y, a) in alpha.enumerate_pixels() {
                let src_a = a[0];
                if src_a == 0 {
                    continue;
                }
                let src = layer.rgb.get_pixel(x, y).0;
                if src_a == 255 {
                    acc.rgb.get_pixel_mut(x, y).0 = src;
                    if let Some(dst_alpha) = acc.alpha.as_mut() {
                        dst_alpha.put_pixel(x, y, Luma([255]));
                    }
                    continue;
                }

                let (rgb, out_a) = blend_pixel(src, src_a, acc.rgb.get_pixel(x, y).0, acc.alpha_at(x, y));
                acc.rgb.get_pixel_mut(x, y).0 = rgb;
                if let Some(dst_alpha) = acc.alpha.as_mut() {
                    dst_alpha.put_pixel(x, y, Luma([out_a]));
                }
            }
            if acc.alpha.is_some() {
                acc.bpp = Bpp::Bpp32;
            }
        }
    }

    if let Some(mask) = &layer.mask {
        match acc.mask.as_mut() {
            None => acc.mask = Some(mask.clone()),
            Some(dst) => {
                for (x, y, m) in mask.enumerate_pixels() {
                    if m[0] != 0 {
                        dst.put_pixel(x, y, *m);
                    }
                }
            }
        }
    }
}
