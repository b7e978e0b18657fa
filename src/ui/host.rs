//! Services a watchface consumes from its host
//!
//! The watchface never owns pixels itself. It asks the host for layers,
//! bitmaps, fonts and animations through these traits and gets handles back.
//! Every `destroy_*`/`unload_*` call takes its handle by value, so an object
//! can only be released once.

use chrono::NaiveDateTime;
use embassy_time::Duration;
use embedded_graphics::{pixelcolor::BinaryColor, primitives::Rectangle, text::Alignment};

use crate::Error;

/// Duration the host gives an animation unless told otherwise
pub const DEFAULT_ANIMATION_DURATION: Duration = Duration::from_millis(250);

/// Images in the resource bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResourceId {
    /// Face mask
    Face,
    /// Lip overlay, white half
    LipWhite,
    /// Lip overlay, black half
    LipBlack,
    /// Eyes overlay, white half
    EyesWhite,
    /// Eyes overlay, black half
    EyesBlack,
}

/// Fonts in the resource bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FontId {
    /// Large clock digits
    Clock,
}

/// How a layer's bitmap blends with what is beneath it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompositingMode {
    /// Copy the bitmap over the destination
    #[default]
    Assign,
    /// Set destination pixels where the bitmap is set
    Or,
    /// Clear destination pixels where the bitmap is set
    Clear,
}

/// Appearance of a text layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub text_color: BinaryColor,
    pub background_color: BinaryColor,
    pub alignment: Alignment,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            text_color: BinaryColor::On,
            background_color: BinaryColor::Off,
            alignment: Alignment::Center,
        }
    }
}

/// Timing of a frame animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Time spent moving
    pub duration: Duration,
    /// Time between scheduling and the first movement
    pub delay: Duration,
}

impl Timing {
    /// Move for `duration`, starting right away
    pub const fn new(duration: Duration) -> Self {
        Self {
            duration,
            delay: Duration::from_ticks(0),
        }
    }

    /// Wait `delay` before starting to move
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new(DEFAULT_ANIMATION_DURATION)
    }
}

/// Identifies an animation in the events the host reports back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnimationId(pub u16);

/// Layers, bitmaps and fonts
pub trait DisplayTree {
    type Layer;
    type Bitmap;
    type Font;

    /// Set the colour behind all layers
    fn set_background(&mut self, color: BinaryColor);

    /// Decode an image from the resource bundle
    fn load_bitmap(&mut self, id: ResourceId) -> Result<Self::Bitmap, Error>;
    fn destroy_bitmap(&mut self, bitmap: Self::Bitmap);

    /// Load a font from the resource bundle
    fn load_font(&mut self, id: FontId) -> Result<Self::Font, Error>;
    fn unload_font(&mut self, font: Self::Font);

    /// Create an empty, detached layer
    fn create_layer(&mut self, frame: Rectangle) -> Result<Self::Layer, Error>;
    /// Create a detached layer rendering text
    fn create_text_layer(
        &mut self,
        frame: Rectangle,
        font: &Self::Font,
        style: TextStyle,
    ) -> Result<Self::Layer, Error>;
    fn destroy_layer(&mut self, layer: Self::Layer);

    fn set_bitmap(&mut self, layer: &Self::Layer, bitmap: &Self::Bitmap);
    fn set_compositing_mode(&mut self, layer: &Self::Layer, mode: CompositingMode);
    fn set_text(&mut self, layer: &Self::Layer, text: &str);

    /// Attach a layer on top of the root layer's children
    fn add_to_root(&mut self, layer: &Self::Layer);
    /// Detach a layer, no-op when it is not attached
    fn remove_from_parent(&mut self, layer: &Self::Layer);

    /// Current frame of a layer
    fn frame(&self, layer: &Self::Layer) -> Rectangle;
}

/// Frame animations on layers of the display tree
///
/// The host reports progress as [`Event::AnimationStarted`] once the delay
/// has passed and [`Event::AnimationStopped`] when the animation ends.
/// Neither is reported after [`Animator::unschedule_all`].
///
/// [`Event::AnimationStarted`]: crate::ui::Event::AnimationStarted
/// [`Event::AnimationStopped`]: crate::ui::Event::AnimationStopped
pub trait Animator: DisplayTree {
    type Animation;

    /// Describe a move of `layer` from `from` to `to`
    fn create_frame_animation(
        &mut self,
        layer: &Self::Layer,
        from: Rectangle,
        to: Rectangle,
        timing: Timing,
    ) -> Result<Self::Animation, Error>;
    fn animation_id(&self, animation: &Self::Animation) -> AnimationId;
    fn schedule(&mut self, animation: &Self::Animation) -> Result<(), Error>;
    /// Stop every scheduled animation without reporting it
    fn unschedule_all(&mut self);
    /// Release an animation, unscheduling it if needed
    fn destroy_animation(&mut self, animation: Self::Animation);
}

/// Wall clock and display preferences
pub trait Clock {
    /// Current local time
    fn now(&self) -> NaiveDateTime;
    /// Whether the user prefers a 24 hour clock
    fn is_24h_style(&self) -> bool;
}

/// Everything a watchface needs from its host
pub trait Host: Animator + Clock {}

impl<T: Animator + Clock> Host for T {}
