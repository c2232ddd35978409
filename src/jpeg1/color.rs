//! Conversion of decoded sample planes to RGBA pixels.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::jpeg1::planes::PlaneSet;
use crate::pixel_sink::FromRgba;

/// How the components of a frame are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Grayscale,
    YCbCr,
    Rgb,
    Cmyk,
    Ycck,
}

impl ColorModel {
    pub fn component_count(self) -> usize {
        match self {
            Self::Grayscale => 1,
            Self::YCbCr | Self::Rgb => 3,
            Self::Cmyk | Self::Ycck => 4,
        }
    }
}

#[inline]
fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// JFIF YCbCr to RGB (ITU-R BT.601, full range).
#[inline]
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = f32::from(y);
    let cb = f32::from(cb) - 128.0;
    let cr = f32::from(cr) - 128.0;
    [
        clamp_to_u8(y + 1.402 * cr),
        clamp_to_u8(y - 0.344136 * cb - 0.714136 * cr),
        clamp_to_u8(y + 1.772 * cb),
    ]
}

/// Darkens `channel` by the black plane sample, where 255 means no black at all.
#[inline]
fn apply_black(channel: u8, black: u8) -> u8 {
    let (channel, black) = (u32::from(channel), 255 - u32::from(black));
    ((channel * black + 127) / 255) as u8
}

/// Adobe CMYK planes hold the inverted inks, so the first three are already RGB.
#[inline]
fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    [apply_black(c, k), apply_black(m, k), apply_black(y, k)]
}

#[inline]
fn ycck_to_rgb(y: u8, cb: u8, cr: u8, k: u8) -> [u8; 3] {
    let [r, g, b] = ycbcr_to_rgb(y, cb, cr);
    cmyk_to_rgb(r, g, b, k)
}

fn convert_row<P: FromRgba>(model: ColorModel, planes: &PlaneSet, y: usize, row: &mut [P]) {
    let component_rows: Vec<&[u8]> = (0..planes.len())
        .map(|c| planes.upsampled_row(c, y))
        .collect();
    let sample = |c: usize, x: usize| component_rows[c][planes.upsampled_column(c, x)];

    for (x, pixel) in row.iter_mut().enumerate() {
        let [r, g, b] = match model {
            ColorModel::Grayscale => {
                let luma = sample(0, x);
                [luma, luma, luma]
            }
            ColorModel::YCbCr => ycbcr_to_rgb(sample(0, x), sample(1, x), sample(2, x)),
            ColorModel::Rgb => [sample(0, x), sample(1, x), sample(2, x)],
            ColorModel::Cmyk => cmyk_to_rgb(sample(0, x), sample(1, x), sample(2, x), sample(3, x)),
            ColorModel::Ycck => ycck_to_rgb(sample(0, x), sample(1, x), sample(2, x), sample(3, x)),
        };
        *pixel = P::from_rgba([r, g, b, 255]);
    }
}

/// Writes `width` x `height` pixels into `pixels`, upsampling chroma as required.
pub fn convert_planes<P: FromRgba + Send>(
    model: ColorModel,
    planes: &PlaneSet,
    width: usize,
    pixels: &mut [P],
) {
    debug_assert_eq!(planes.len(), model.component_count());
    if width == 0 {
        return;
    }

    #[cfg(feature = "parallel")]
    pixels
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| convert_row(model, planes, y, row));

    #[cfg(not(feature = "parallel"))]
    pixels
        .chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| convert_row(model, planes, y, row));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg_stream_reader::{Frame, JpegComponent};

    #[test]
    fn test_ycbcr_reference_colors() {
        assert_eq!(ycbcr_to_rgb(128, 128, 128), [128, 128, 128]);
        assert_eq!(ycbcr_to_rgb(0, 128, 128), [0, 0, 0]);
        assert_eq!(ycbcr_to_rgb(255, 128, 128), [255, 255, 255]);
        // Pure red in JFIF YCbCr.
        assert_eq!(ycbcr_to_rgb(76, 85, 255), [254, 0, 0]);
    }

    #[test]
    fn test_ycbcr_clamps() {
        assert_eq!(ycbcr_to_rgb(255, 255, 255), [255, 121, 255]);
        assert_eq!(ycbcr_to_rgb(0, 0, 0), [0, 135, 0]);
    }

    #[test]
    fn test_cmyk_and_ycck() {
        assert_eq!(cmyk_to_rgb(255, 255, 255, 0), [255, 255, 255]);
        assert_eq!(cmyk_to_rgb(0, 0, 0, 0), [0, 0, 0]);
        assert_eq!(cmyk_to_rgb(0, 255, 128, 0), [0, 255, 128]);
        assert_eq!(cmyk_to_rgb(255, 255, 200, 128), [127, 127, 100]);
        assert_eq!(cmyk_to_rgb(20, 20, 20, 255), [0, 0, 0]);
        // Both four-component models darken the same way.
        assert_eq!(ycck_to_rgb(255, 128, 128, 128), cmyk_to_rgb(255, 255, 255, 128));
        assert_eq!(ycck_to_rgb(200, 128, 128, 0), [200, 200, 200]);
        assert_eq!(ycck_to_rgb(200, 128, 128, 255), [0, 0, 0]);
    }

    #[test]
    fn test_convert_grayscale_planes() {
        let frame = Frame::new(10, 3, true, false, vec![JpegComponent::new(1, 1, 1, 0)]);
        let mut planes = PlaneSet::new(&frame);
        for (i, sample) in planes.plane_mut(0).block_mut(1, 0)[..8].iter_mut().enumerate() {
            *sample = i as u8 * 10;
        }

        let mut pixels = vec![[0u8; 4]; 10 * 3];
        convert_planes(ColorModel::Grayscale, &planes, 10, &mut pixels);
        assert_eq!(pixels[0], [0, 0, 0, 255]);
        assert_eq!(pixels[9], [10, 10, 10, 255]);
        assert_eq!(pixels[10], [0, 0, 0, 255]);
    }
}
