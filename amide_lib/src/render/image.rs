use crate::{
    color::{self, RGBA},
    error::{alloc_vec, Result},
};

/// Rendered image before quantization, premultiplied colors, y=0 is the top row
#[derive(Debug, Clone, PartialEq)]
pub struct FloatImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<RGBA>,
}

impl FloatImage {
    pub fn new(width: usize, height: usize) -> Result<FloatImage> {
        let pixels = alloc_vec("float image", width * height, color::zero())?;
        Ok(FloatImage {
            width,
            height,
            pixels,
        })
    }

    pub fn get(&self, x: usize, y: usize) -> Option<RGBA> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(x + y * self.width).copied()
    }

    /// Composite `front` over this image, pixel by pixel. Sizes must match.
    pub fn under(&mut self, front: &FloatImage) {
        debug_assert_eq!((self.width, self.height), (front.width, front.height));
        self.pixels
            .iter_mut()
            .zip(front.pixels.iter())
            .for_each(|(back, &f)| *back = color::over(f, *back));
    }
}

/// 8-bit RGBA raster, the final output of a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: usize,
    pub height: usize,
    /// Row major, 4 bytes per pixel
    pub pixels: Vec<u8>,
}

impl RasterImage {
    /// Black, transparent image
    pub fn new(width: usize, height: usize) -> Result<RasterImage> {
        let pixels = alloc_vec("raster image", width * height * 4, 0u8)?;
        Ok(RasterImage {
            width,
            height,
            pixels,
        })
    }

    pub fn from_float(image: &FloatImage) -> Result<RasterImage> {
        let mut raster = RasterImage::new(image.width, image.height)?;
        raster
            .pixels
            .chunks_exact_mut(4)
            .zip(image.pixels.iter())
            .for_each(|(dst, src)| {
                dst.iter_mut()
                    .zip(src.iter())
                    .for_each(|(d, &s)| *d = color::to_byte(s));
            });
        Ok(raster)
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = 4 * (x + y * self.width);
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Copy `src` with its top left corner at `(x0, y0)`, cropping what falls outside
    pub fn blit(&mut self, src: &RasterImage, x0: usize, y0: usize) {
        if x0 >= self.width || y0 >= self.height {
            return;
        }
        let w = src.width.min(self.width - x0);
        let h = src.height.min(self.height - y0);
        for y in 0..h {
            let from = 4 * y * src.width;
            let to = 4 * ((y0 + y) * self.width + x0);
            self.pixels[to..to + 4 * w].copy_from_slice(&src.pixels[from..from + 4 * w]);
        }
    }

    /// Copy `src` centered inside the `width` wide column starting at `x0`.
    /// Larger images are cropped around their center.
    pub fn blit_centered(&mut self, src: &RasterImage, x0: usize, width: usize) {
        let cropped = src.crop_centered(width, self.height);
        let x = x0 + (width - cropped.width) / 2;
        let y = (self.height - cropped.height) / 2;
        self.blit(&cropped, x, y);
    }

    fn crop_centered(&self, width: usize, height: usize) -> RasterImage {
        let w = self.width.min(width);
        let h = self.height.min(height);
        let sx = (self.width - w) / 2;
        let sy = (self.height - h) / 2;
        let mut pixels = Vec::with_capacity(4 * w * h);
        for y in sy..sy + h {
            let from = 4 * (y * self.width + sx);
            pixels.extend_from_slice(&self.pixels[from..from + 4 * w]);
        }
        RasterImage {
            width: w,
            height: h,
            pixels,
        }
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn float_to_raster() {
        let mut image = FloatImage::new(2, 1).unwrap();
        image.pixels[1] = color::mono(1.0, 0.5);
        let raster = RasterImage::from_float(&image).unwrap();
        assert_eq!(raster.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(raster.pixel(1, 0), Some([255, 255, 255, 128]));
        assert_eq!(raster.pixel(2, 0), None);
    }

    #[test]
    fn centered_blit() {
        let mut src = RasterImage::new(2, 2).unwrap();
        src.pixels.iter_mut().for_each(|p| *p = 9);
        let mut dst = RasterImage::new(8, 4).unwrap();
        dst.blit_centered(&src, 4, 4);
        assert_eq!(dst.pixel(5, 1), Some([9; 4]));
        assert_eq!(dst.pixel(6, 2), Some([9; 4]));
        assert_eq!(dst.pixel(4, 1), Some([0; 4]));
        assert_eq!(dst.pixel(1, 1), Some([0; 4]));
    }

    #[test]
    fn oversized_blit_is_cropped() {
        let mut src = RasterImage::new(6, 6).unwrap();
        src.pixels.iter_mut().for_each(|p| *p = 1);
        let mut dst = RasterImage::new(4, 4).unwrap();
        dst.blit_centered(&src, 0, 4);
        assert!(dst.pixels.iter().all(|&p| p == 1));
    }

    #[test]
    fn under_composites_in_front() {
        let mut back = FloatImage::new(1, 1).unwrap();
        back.pixels[0] = color::mono(0.2, 1.0);
        let mut front = FloatImage::new(1, 1).unwrap();
        front.pixels[0] = color::mono(0.5, 0.5);
        back.under(&front);
        assert_relative_eq!(back.pixels[0], color::mono(0.6, 1.0));
    }
}
