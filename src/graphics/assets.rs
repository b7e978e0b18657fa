//! Watchface artwork
//!
//! The images are drawn with primitives when loaded instead of being stored
//! in flash. White pixels are set, black pixels are clear.

use core::convert::Infallible;

use embedded_graphics::{
    mono_font::MonoFont,
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{
        Line, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, RoundedRectangle, Triangle,
    },
};
use profont::PROFONT_24_POINT;

use super::bitmap::Bitmap;
use crate::{
    ui::host::{FontId, ResourceId},
    Error,
};

/// Source of images and fonts
pub trait Bundle {
    fn image(&self, id: ResourceId) -> Result<Bitmap, Error>;
    fn font(&self, id: FontId) -> Result<&'static MonoFont<'static>, Error>;
}

/// Size of each image
pub fn image_size(id: ResourceId) -> Size {
    match id {
        ResourceId::Face => Size::new(144, 143),
        ResourceId::LipWhite | ResourceId::LipBlack => Size::new(144, 23),
        ResourceId::EyesWhite | ResourceId::EyesBlack => Size::new(83, 15),
    }
}

/// Artwork drawn on the fly
#[derive(Debug, Clone, Copy, Default)]
pub struct ProceduralBundle;

impl Bundle for ProceduralBundle {
    fn image(&self, id: ResourceId) -> Result<Bitmap, Error> {
        let mut bitmap =
            Bitmap::new(image_size(id)).map_err(|_| Error::ResourceLoadFailure(id))?;
        let drawn = match id {
            ResourceId::Face => draw_face(&mut bitmap),
            ResourceId::LipWhite => draw_lip_white(&mut bitmap),
            ResourceId::LipBlack => draw_lip_black(&mut bitmap),
            ResourceId::EyesWhite => draw_eyes_white(&mut bitmap),
            ResourceId::EyesBlack => draw_eyes_black(&mut bitmap),
        };
        if let Err(never) = drawn {
            match never {}
        }
        trace!("Loaded image {}", id);
        Ok(bitmap)
    }

    fn font(&self, id: FontId) -> Result<&'static MonoFont<'static>, Error> {
        match id {
            FontId::Clock => Ok(&PROFONT_24_POINT),
        }
    }
}

fn fill() -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyle::with_fill(BinaryColor::On)
}

fn cut() -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyle::with_fill(BinaryColor::Off)
}

fn line(width: u32, color: BinaryColor) -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyleBuilder::new()
        .stroke_color(color)
        .stroke_width(width)
        .build()
}

/// Helmet plate with eye sockets, cheek lines and a mouth slit
fn draw_face(bitmap: &mut Bitmap) -> Result<(), Infallible> {
    RoundedRectangle::with_equal_corners(
        Rectangle::new(Point::new(8, 0), Size::new(128, 140)),
        Size::new(28, 28),
    )
    .into_styled(fill())
    .draw(bitmap)?;

    // Brow
    Line::new(Point::new(22, 64), Point::new(122, 64))
        .into_styled(line(2, BinaryColor::Off))
        .draw(bitmap)?;

    // Eye sockets, lined up with the eyes overlay
    for x in [34, 80] {
        Triangle::new(
            Point::new(x, 75),
            Point::new(x + 30, 75),
            Point::new(x + if x < 72 { 30 } else { 0 }, 86),
        )
        .into_styled(cut())
        .draw(bitmap)?;
        Rectangle::new(Point::new(x, 75), Size::new(31, 5))
            .into_styled(cut())
            .draw(bitmap)?;
    }

    // Cheeks
    Line::new(Point::new(30, 94), Point::new(46, 128))
        .into_styled(line(2, BinaryColor::Off))
        .draw(bitmap)?;
    Line::new(Point::new(114, 94), Point::new(98, 128))
        .into_styled(line(2, BinaryColor::Off))
        .draw(bitmap)?;

    // Mouth
    Rectangle::new(Point::new(52, 116), Size::new(40, 3))
        .into_styled(cut())
        .draw(bitmap)
}

/// Chin edge, OR-ed over whatever is beneath
fn draw_lip_white(bitmap: &mut Bitmap) -> Result<(), Infallible> {
    RoundedRectangle::with_equal_corners(
        Rectangle::new(Point::new(16, 0), Size::new(112, 12)),
        Size::new(10, 10),
    )
    .into_styled(fill())
    .draw(bitmap)
}

/// Groove along the chin edge, cleared out of whatever is beneath
fn draw_lip_black(bitmap: &mut Bitmap) -> Result<(), Infallible> {
    Line::new(Point::new(28, 5), Point::new(116, 5))
        .into_styled(line(2, BinaryColor::On))
        .draw(bitmap)?;
    Rectangle::new(Point::new(0, 12), Size::new(144, 11))
        .into_styled(fill())
        .draw(bitmap)
}

/// Two glowing slits
fn draw_eyes_white(bitmap: &mut Bitmap) -> Result<(), Infallible> {
    for x in [4, 50] {
        Rectangle::new(Point::new(x, 3), Size::new(29, 9))
            .into_styled(fill())
            .draw(bitmap)?;
    }
    Ok(())
}

/// Pupils, cleared out of the glowing slits
fn draw_eyes_black(bitmap: &mut Bitmap) -> Result<(), Infallible> {
    for x in [16, 62] {
        Rectangle::new(Point::new(x, 5), Size::new(5, 5))
            .into_styled(fill())
            .draw(bitmap)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use embedded_graphics::primitives::PointsIter;

    use super::*;

    const ALL: [ResourceId; 5] = [
        ResourceId::Face,
        ResourceId::LipWhite,
        ResourceId::LipBlack,
        ResourceId::EyesWhite,
        ResourceId::EyesBlack,
    ];

    #[test]
    fn every_image_loads_at_its_size() {
        for id in ALL {
            let bitmap = ProceduralBundle.image(id).unwrap();
            assert_eq!(bitmap.size(), image_size(id));
            let lit = bitmap.lit_pixels();
            assert!(lit > 0, "{id:?} is blank");
            assert!(lit < image_size(id).width * image_size(id).height, "{id:?} is solid");
        }
    }

    #[test]
    fn face_has_dark_eye_sockets() {
        let face = ProceduralBundle.image(ResourceId::Face).unwrap();
        assert_eq!(face.pixel(Point::new(40, 77)), BinaryColor::Off);
        assert_eq!(face.pixel(Point::new(90, 77)), BinaryColor::Off);
        assert_eq!(face.pixel(Point::new(72, 40)), BinaryColor::On);
    }

    #[test]
    fn pupils_sit_inside_the_slits() {
        let white = ProceduralBundle.image(ResourceId::EyesWhite).unwrap();
        let black = ProceduralBundle.image(ResourceId::EyesBlack).unwrap();
        let outside = Rectangle::new(Point::zero(), image_size(ResourceId::EyesBlack))
            .points()
            .filter(|&p| black.pixel(p).is_on() && white.pixel(p).is_off())
            .count();
        assert_eq!(outside, 0);
    }

    #[test]
    fn clock_font_is_available() {
        assert!(ProceduralBundle.font(FontId::Clock).is_ok());
    }
}
