//! Destinations for decoded pixels.

/// A pixel type the color converter can produce from 8-bit RGBA.
pub trait FromRgba: Copy {
    fn from_rgba(rgba: [u8; 4]) -> Self;
}

impl FromRgba for [u8; 4] {
    #[inline]
    fn from_rgba(rgba: [u8; 4]) -> Self {
        rgba
    }
}

impl FromRgba for [u8; 3] {
    #[inline]
    fn from_rgba([r, g, b, _]: [u8; 4]) -> Self {
        [r, g, b]
    }
}

/// Luma, Rec. 601 weights.
impl FromRgba for u8 {
    #[inline]
    fn from_rgba([r, g, b, _]: [u8; 4]) -> Self {
        ((299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b) + 500) / 1000) as u8
    }
}

/// Receives the decoded image and its metadata.
pub trait PixelSink {
    type Pixel: FromRgba + Send;

    /// Sizes the pixel storage. Called once, after the last scan has been decoded.
    fn init_pixels(&mut self, width: usize, height: usize);

    /// Row-major pixel storage of exactly `width * height` pixels.
    fn pixels_mut(&mut self) -> &mut [Self::Pixel];

    /// Resolution in dots per inch, from the JFIF header.
    fn set_resolution(&mut self, _horizontal: f64, _vertical: f64) {}

    /// Raw Exif payload (TIFF header onwards) from an APP1 segment.
    fn set_exif_profile(&mut self, _exif: Vec<u8>) {}
}

/// An owned, row-major image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageBuffer<P> {
    width: usize,
    height: usize,
    pixels: Vec<P>,
    resolution: Option<(f64, f64)>,
    exif_profile: Option<Vec<u8>>,
}

impl<P: FromRgba + Default> ImageBuffer<P> {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
            resolution: None,
            exif_profile: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<P> {
        self.pixels
    }

    pub fn row(&self, y: usize) -> &[P] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<P> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    pub fn resolution(&self) -> Option<(f64, f64)> {
        self.resolution
    }

    pub fn exif_profile(&self) -> Option<&[u8]> {
        self.exif_profile.as_deref()
    }
}

impl<P: FromRgba + Default + Send> PixelSink for ImageBuffer<P> {
    type Pixel = P;

    fn init_pixels(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width * height, P::default());
    }

    fn pixels_mut(&mut self) -> &mut [P] {
        &mut self.pixels
    }

    fn set_resolution(&mut self, horizontal: f64, vertical: f64) {
        self.resolution = Some((horizontal, vertical));
    }

    fn set_exif_profile(&mut self, exif: Vec<u8>) {
        self.exif_profile = Some(exif);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_conversions() {
        assert_eq!(<[u8; 3]>::from_rgba([1, 2, 3, 255]), [1, 2, 3]);
        assert_eq!(u8::from_rgba([200, 200, 200, 255]), 200);
        assert_eq!(u8::from_rgba([255, 0, 0, 255]), 76);
    }

    #[test]
    fn test_image_buffer() {
        let mut image = ImageBuffer::<[u8; 4]>::new();
        image.init_pixels(3, 2);
        image.pixels_mut()[4] = [9, 9, 9, 255];
        assert_eq!(image.get(1, 1), Some([9, 9, 9, 255]));
        assert_eq!(image.get(3, 0), None);
        assert_eq!(image.row(1).len(), 3);
        image.set_resolution(72.0, 72.0);
        assert_eq!(image.resolution(), Some((72.0, 72.0)));
    }
}
