//! 1-bit bitmaps

use core::convert::Infallible;

use embedded_graphics::{
    geometry::{OriginDimensions, Point, Size},
    pixelcolor::BinaryColor,
    prelude::*,
};
use heapless::Vec;

use crate::Error;

/// Largest bitmap, the full watchface scene
pub const MAX_SIZE: Size = Size::new(144, 168);

/// Bytes needed for the largest bitmap
pub const BITMAP_CAPACITY: usize = (MAX_SIZE.width as usize).div_ceil(8) * MAX_SIZE.height as usize;

/// Packed 1-bit image, rows padded to whole bytes, MSB first
pub struct Bitmap {
    size: Size,
    stride: usize,
    data: Vec<u8, BITMAP_CAPACITY>,
}

impl Bitmap {
    /// Create a bitmap with all pixels off
    pub fn new(size: Size) -> Result<Self, Error> {
        let stride = (size.width as usize).div_ceil(8);
        let mut data = Vec::new();
        data.resize(stride * size.height as usize, 0)
            .map_err(|_| Error::BitmapCapacity)?;
        Ok(Self { size, stride, data })
    }

    fn index(&self, point: Point) -> Option<(usize, u8)> {
        let (x, y) = (usize::try_from(point.x).ok()?, usize::try_from(point.y).ok()?);
        if x >= self.size.width as usize || y >= self.size.height as usize {
            return None;
        }
        Some((y * self.stride + x / 8, 0x80 >> (x % 8)))
    }

    /// Colour at `point`, off outside the bitmap
    pub fn pixel(&self, point: Point) -> BinaryColor {
        match self.index(point) {
            Some((byte, mask)) => BinaryColor::from(self.data[byte] & mask != 0),
            None => BinaryColor::Off,
        }
    }

    /// Set the colour at `point`, ignored outside the bitmap
    pub fn set_pixel(&mut self, point: Point, color: BinaryColor) {
        if let Some((byte, mask)) = self.index(point) {
            match color {
                BinaryColor::On => self.data[byte] |= mask,
                BinaryColor::Off => self.data[byte] &= !mask,
            }
        }
    }

    /// All pixels in row-major order
    pub fn pixels(&self) -> impl Iterator<Item = BinaryColor> + '_ {
        let width = self.size.width as i32;
        let height = self.size.height as i32;
        (0..height).flat_map(move |y| (0..width).map(move |x| self.pixel(Point::new(x, y))))
    }

    /// Number of pixels that are on
    pub fn lit_pixels(&self) -> u32 {
        self.pixels().filter(|c| c.is_on()).count() as u32
    }
}

impl OriginDimensions for Bitmap {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for Bitmap {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point, color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let fill = if color.is_on() { 0xff } else { 0x00 };
        self.data.iter_mut().for_each(|byte| *byte = fill);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    use super::*;

    #[test]
    fn starts_blank() {
        let bitmap = Bitmap::new(Size::new(83, 15)).unwrap();
        assert_eq!(bitmap.size(), Size::new(83, 15));
        assert_eq!(bitmap.lit_pixels(), 0);
    }

    #[test]
    fn rejects_oversized() {
        assert!(matches!(
            Bitmap::new(Size::new(240, 240)),
            Err(Error::BitmapCapacity)
        ));
        assert!(Bitmap::new(MAX_SIZE).is_ok());
    }

    #[test]
    fn set_and_read_pixels() {
        let mut bitmap = Bitmap::new(Size::new(10, 3)).unwrap();
        bitmap.set_pixel(Point::new(9, 2), BinaryColor::On);
        bitmap.set_pixel(Point::new(0, 0), BinaryColor::On);
        bitmap.set_pixel(Point::new(10, 0), BinaryColor::On);
        bitmap.set_pixel(Point::new(-1, 0), BinaryColor::On);

        assert_eq!(bitmap.pixel(Point::new(9, 2)), BinaryColor::On);
        assert_eq!(bitmap.pixel(Point::new(0, 0)), BinaryColor::On);
        assert_eq!(bitmap.pixel(Point::new(8, 2)), BinaryColor::Off);
        assert_eq!(bitmap.lit_pixels(), 2);

        bitmap.set_pixel(Point::new(9, 2), BinaryColor::Off);
        assert_eq!(bitmap.lit_pixels(), 1);
    }

    #[test]
    fn draws_primitives() {
        let mut bitmap = Bitmap::new(Size::new(16, 16)).unwrap();
        Rectangle::new(Point::new(-4, 2), Size::new(8, 4))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut bitmap)
            .unwrap();
        // Clipped to the four visible columns
        assert_eq!(bitmap.lit_pixels(), 16);

        bitmap.clear(BinaryColor::On).unwrap();
        assert_eq!(bitmap.lit_pixels(), 256);
    }
}
