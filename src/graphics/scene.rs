//! Layer tree of the software host

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PointsIter, PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use heapless::{String, Vec};

use super::bitmap::Bitmap;
use crate::{
    ui::host::{CompositingMode, TextStyle},
    Error,
};

/// Layer slots in a scene
pub const MAX_LAYERS: usize = 8;
/// Bitmap slots in a scene
pub const MAX_BITMAPS: usize = 6;
/// Longest text a text layer keeps
pub const MAX_TEXT: usize = 16;

/// Owning handle to a layer in a [`Scene`]
#[derive(Debug, PartialEq, Eq)]
pub struct LayerHandle {
    slot: u8,
}

impl LayerHandle {
    pub(crate) fn slot(&self) -> u8 {
        self.slot
    }
}

/// Owning handle to a bitmap in a [`Scene`]
#[derive(Debug, PartialEq, Eq)]
pub struct BitmapHandle {
    slot: u8,
}

enum Content {
    Empty,
    Image(u8),
    Text {
        font: &'static MonoFont<'static>,
        style: TextStyle,
        text: String<MAX_TEXT>,
    },
}

struct Node {
    frame: Rectangle,
    mode: CompositingMode,
    content: Content,
}

/// Layers composited bottom to top over a background colour
pub struct Scene {
    background: BinaryColor,
    bitmaps: Vec<Option<Bitmap>, MAX_BITMAPS>,
    layers: Vec<Option<Node>, MAX_LAYERS>,
    /// Attached layer slots, bottom first
    stack: Vec<u8, MAX_LAYERS>,
    dirty: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// Put `value` in the first free slot, growing the slot list if needed
fn insert<T, const N: usize>(
    slots: &mut Vec<Option<T>, N>,
    value: T,
    full: Error,
) -> Result<u8, Error> {
    if let Some(index) = slots.iter().position(Option::is_none) {
        slots[index] = Some(value);
        return Ok(index as u8);
    }
    slots.push(Some(value)).map_err(|_| full)?;
    Ok((slots.len() - 1) as u8)
}

impl Scene {
    pub const fn new() -> Self {
        Self {
            background: BinaryColor::Off,
            bitmaps: Vec::new(),
            layers: Vec::new(),
            stack: Vec::new(),
            dirty: true,
        }
    }

    fn node(&self, slot: u8) -> Option<&Node> {
        self.layers.get(slot as usize).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: u8) -> Option<&mut Node> {
        self.layers.get_mut(slot as usize).and_then(Option::as_mut)
    }

    fn is_attached(&self, slot: u8) -> bool {
        self.stack.contains(&slot)
    }

    /// Changes to attached layers need a redraw
    fn touch(&mut self, slot: u8) {
        if self.is_attached(slot) {
            self.dirty = true;
        }
    }

    pub fn set_background(&mut self, color: BinaryColor) {
        self.background = color;
        self.dirty = true;
    }

    pub fn add_bitmap(&mut self, bitmap: Bitmap) -> Result<BitmapHandle, Error> {
        let slot = insert(&mut self.bitmaps, bitmap, Error::BitmapCapacity)?;
        Ok(BitmapHandle { slot })
    }

    pub fn remove_bitmap(&mut self, bitmap: BitmapHandle) {
        for slot in 0..self.layers.len() as u8 {
            let uses = matches!(
                self.node(slot),
                Some(Node { content: Content::Image(b), .. }) if *b == bitmap.slot
            );
            if uses {
                warn!("Bitmap {} destroyed while layer {} shows it", bitmap.slot, slot);
                self.touch(slot);
                if let Some(node) = self.node_mut(slot) {
                    node.content = Content::Empty;
                }
            }
        }
        if let Some(entry) = self.bitmaps.get_mut(bitmap.slot as usize) {
            *entry = None;
        }
    }

    pub fn create_layer(&mut self, frame: Rectangle) -> Result<LayerHandle, Error> {
        let node = Node {
            frame,
            mode: CompositingMode::Assign,
            content: Content::Empty,
        };
        let slot = insert(&mut self.layers, node, Error::LayerCapacity)?;
        trace!("Created layer {}", slot);
        Ok(LayerHandle { slot })
    }

    pub fn create_text_layer(
        &mut self,
        frame: Rectangle,
        font: &'static MonoFont<'static>,
        style: TextStyle,
    ) -> Result<LayerHandle, Error> {
        let layer = self.create_layer(frame)?;
        if let Some(node) = self.node_mut(layer.slot) {
            node.content = Content::Text {
                font,
                style,
                text: String::new(),
            };
        }
        Ok(layer)
    }

    /// Destroy a layer, detaching it first if needed
    pub fn destroy_layer(&mut self, layer: LayerHandle) {
        if self.is_attached(layer.slot) {
            warn!("Layer {} destroyed while attached", layer.slot);
            self.detach(&layer);
        }
        if let Some(entry) = self.layers.get_mut(layer.slot as usize) {
            *entry = None;
        }
        trace!("Destroyed layer {}", layer.slot);
    }

    pub fn set_bitmap(&mut self, layer: &LayerHandle, bitmap: &BitmapHandle) {
        if let Some(node) = self.node_mut(layer.slot) {
            node.content = Content::Image(bitmap.slot);
        }
        self.touch(layer.slot);
    }

    pub fn set_compositing_mode(&mut self, layer: &LayerHandle, mode: CompositingMode) {
        if let Some(node) = self.node_mut(layer.slot) {
            node.mode = mode;
        }
        self.touch(layer.slot);
    }

    /// Replace the text of a text layer, cut off after [`MAX_TEXT`] bytes
    pub fn set_text(&mut self, layer: &LayerHandle, new_text: &str) {
        if let Some(Node { content: Content::Text { text, .. }, .. }) = self.node_mut(layer.slot) {
            text.clear();
            for c in new_text.chars() {
                if text.push(c).is_err() {
                    warn!("Text cut off at {} bytes", MAX_TEXT);
                    break;
                }
            }
        }
        self.touch(layer.slot);
    }

    pub fn attach(&mut self, layer: &LayerHandle) {
        if self.node(layer.slot).is_none() || self.is_attached(layer.slot) {
            return;
        }
        if self.stack.push(layer.slot).is_ok() {
            self.dirty = true;
        }
    }

    pub fn detach(&mut self, layer: &LayerHandle) {
        if let Some(index) = self.stack.iter().position(|&s| s == layer.slot) {
            self.stack.remove(index);
            self.dirty = true;
        }
    }

    pub fn frame(&self, layer: &LayerHandle) -> Rectangle {
        self.node(layer.slot).map_or(Rectangle::zero(), |node| node.frame)
    }

    pub(crate) fn set_frame(&mut self, slot: u8, frame: Rectangle) {
        if let Some(node) = self.node_mut(slot) {
            if node.frame != frame {
                node.frame = frame;
                self.touch(slot);
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of attached layers
    pub fn attached(&self) -> usize {
        self.stack.len()
    }

    /// Composite all attached layers onto `target` and mark the scene clean
    pub fn render<D>(&mut self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        target.clear(self.background)?;
        for &slot in &self.stack {
            let Some(node) = self.node(slot) else { continue };
            match &node.content {
                Content::Empty => {}
                Content::Image(bitmap) => {
                    if let Some(Some(bitmap)) = self.bitmaps.get(*bitmap as usize) {
                        composite(target, node.frame, bitmap, node.mode)?;
                    }
                }
                Content::Text { font, style, text } => {
                    draw_text(target, node.frame, *font, style, text)?;
                }
            }
        }
        self.dirty = false;
        Ok(())
    }
}

/// Draw `bitmap` at the top left of `frame`, clipped to the frame
fn composite<D>(
    target: &mut D,
    frame: Rectangle,
    bitmap: &Bitmap,
    mode: CompositingMode,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let size = frame.size.component_min(bitmap.size());
    let origin = frame.top_left;
    let pixels = Rectangle::new(Point::zero(), size)
        .points()
        .filter_map(move |p| {
            let color = match (mode, bitmap.pixel(p)) {
                (CompositingMode::Assign, color) => color,
                (CompositingMode::Or, BinaryColor::On) => BinaryColor::On,
                (CompositingMode::Clear, BinaryColor::On) => BinaryColor::Off,
                (_, BinaryColor::Off) => return None,
            };
            Some(Pixel(origin + p, color))
        });
    target.draw_iter(pixels)
}

fn draw_text<D>(
    target: &mut D,
    frame: Rectangle,
    font: &'static MonoFont<'static>,
    style: &TextStyle,
    text: &str,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let mut clipped = target.clipped(&frame);
    frame
        .into_styled(PrimitiveStyle::with_fill(style.background_color))
        .draw(&mut clipped)?;

    let character_style = MonoTextStyle::new(font, style.text_color);
    let text_style = TextStyleBuilder::new()
        .alignment(style.alignment)
        .baseline(Baseline::Middle)
        .build();
    let center = frame.center();
    let anchor = match style.alignment {
        Alignment::Left => Point::new(frame.top_left.x, center.y),
        Alignment::Center => center,
        Alignment::Right => {
            Point::new(frame.top_left.x + frame.size.width as i32 - 1, center.y)
        }
    };
    Text::with_text_style(text, anchor, character_style, text_style).draw(&mut clipped)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use profont::PROFONT_24_POINT;

    use super::*;
    use crate::ui::mask_watchface::rect;

    fn filled(size: Size) -> Bitmap {
        let mut bitmap = Bitmap::new(size).unwrap();
        bitmap.clear(BinaryColor::On).unwrap();
        bitmap
    }

    fn sprite(
        scene: &mut Scene,
        frame: Rectangle,
        bitmap: Bitmap,
        mode: CompositingMode,
    ) -> (LayerHandle, BitmapHandle) {
        let bitmap = scene.add_bitmap(bitmap).unwrap();
        let layer = scene.create_layer(frame).unwrap();
        scene.set_bitmap(&layer, &bitmap);
        scene.set_compositing_mode(&layer, mode);
        scene.attach(&layer);
        (layer, bitmap)
    }

    fn render(scene: &mut Scene) -> Bitmap {
        let mut frame = Bitmap::new(Size::new(20, 20)).unwrap();
        scene.render(&mut frame).unwrap();
        frame
    }

    #[test]
    fn composites_in_attach_order() {
        let mut scene = Scene::new();
        sprite(&mut scene, rect(0, 0, 10, 10), filled(Size::new(10, 10)), CompositingMode::Assign);
        // Clear punches a hole, Or fills part of it back in
        sprite(&mut scene, rect(2, 2, 4, 4), filled(Size::new(4, 4)), CompositingMode::Clear);
        sprite(&mut scene, rect(2, 2, 2, 2), filled(Size::new(2, 2)), CompositingMode::Or);

        let frame = render(&mut scene);
        assert_eq!(frame.lit_pixels(), 100 - 16 + 4);
        assert_eq!(frame.pixel(Point::new(3, 3)), BinaryColor::On);
        assert_eq!(frame.pixel(Point::new(5, 5)), BinaryColor::Off);
        assert!(!scene.is_dirty());
    }

    #[test]
    fn or_and_clear_ignore_unset_source_pixels() {
        let mut scene = Scene::new();
        sprite(&mut scene, rect(0, 0, 4, 4), filled(Size::new(4, 4)), CompositingMode::Assign);
        sprite(&mut scene, rect(0, 0, 4, 4), Bitmap::new(Size::new(4, 4)).unwrap(), CompositingMode::Clear);
        sprite(&mut scene, rect(8, 8, 4, 4), Bitmap::new(Size::new(4, 4)).unwrap(), CompositingMode::Or);
        assert_eq!(render(&mut scene).lit_pixels(), 16);
    }

    #[test]
    fn clips_to_frame_and_target() {
        let mut scene = Scene::new();
        // Bitmap larger than its frame, frame partly off screen
        sprite(&mut scene, rect(-2, -2, 4, 4), filled(Size::new(8, 8)), CompositingMode::Assign);
        assert_eq!(render(&mut scene).lit_pixels(), 4);
    }

    #[test]
    fn moving_an_attached_layer_dirties_the_scene() {
        let mut scene = Scene::new();
        let (layer, _) = sprite(&mut scene, rect(0, 0, 2, 2), filled(Size::new(2, 2)), CompositingMode::Assign);
        render(&mut scene);

        scene.set_frame(layer.slot(), rect(0, 0, 2, 2));
        assert!(!scene.is_dirty());
        scene.set_frame(layer.slot(), rect(5, 5, 2, 2));
        assert!(scene.is_dirty());
        assert_eq!(scene.frame(&layer), rect(5, 5, 2, 2));

        let frame = render(&mut scene);
        assert_eq!(frame.pixel(Point::new(5, 5)), BinaryColor::On);
        assert_eq!(frame.pixel(Point::new(0, 0)), BinaryColor::Off);
    }

    #[test]
    fn detached_layers_are_not_drawn() {
        let mut scene = Scene::new();
        let (layer, bitmap) = sprite(&mut scene, rect(0, 0, 3, 3), filled(Size::new(3, 3)), CompositingMode::Assign);
        scene.detach(&layer);
        assert_eq!(scene.attached(), 0);
        assert_eq!(render(&mut scene).lit_pixels(), 0);

        scene.destroy_layer(layer);
        scene.remove_bitmap(bitmap);
    }

    #[test]
    fn slots_are_reused() {
        let mut scene = Scene::new();
        let layers: std::vec::Vec<_> = (0..MAX_LAYERS)
            .map(|_| scene.create_layer(Rectangle::zero()).unwrap())
            .collect();
        assert_eq!(scene.create_layer(Rectangle::zero()), Err(Error::LayerCapacity));

        let mut layers = layers.into_iter();
        if let Some(first) = layers.next() {
            scene.destroy_layer(first);
        }
        assert!(scene.create_layer(Rectangle::zero()).is_ok());
    }

    #[test]
    fn text_layers_fill_their_background() {
        let mut scene = Scene::new();
        scene.set_background(BinaryColor::Off);
        let style = TextStyle {
            background_color: BinaryColor::On,
            text_color: BinaryColor::Off,
            ..TextStyle::default()
        };
        let layer = scene
            .create_text_layer(rect(0, 0, 20, 20), &PROFONT_24_POINT, style)
            .unwrap();
        scene.attach(&layer);
        assert_eq!(render(&mut scene).lit_pixels(), 400);

        scene.set_text(&layer, "8");
        let lit = render(&mut scene).lit_pixels();
        assert!(lit < 400 && lit > 200, "{lit}");
    }

    #[test]
    fn destroying_an_attached_layer_detaches_it() {
        let mut scene = Scene::new();
        let (layer, bitmap) = sprite(&mut scene, rect(0, 0, 3, 3), filled(Size::new(3, 3)), CompositingMode::Assign);
        scene.destroy_layer(layer);
        assert_eq!(scene.attached(), 0);
        scene.remove_bitmap(bitmap);
        assert_eq!(render(&mut scene).lit_pixels(), 0);
    }
}
