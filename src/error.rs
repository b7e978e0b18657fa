//! Watchface errors

use core::fmt;

use crate::ui::host::{FontId, ResourceId};

/// Errors raised by the watchface and its host services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// An image could not be loaded from the resource bundle
    ResourceLoadFailure(ResourceId),
    /// A font could not be loaded from the resource bundle
    FontLoadFailure(FontId),
    /// No free layer slot left in the scene
    LayerCapacity,
    /// No free bitmap slot left in the scene
    BitmapCapacity,
    /// No free animation slot left in the animator
    AnimationCapacity,
    /// The animation slot already holds an animation
    AnimationInFlight,
    /// A handle does not refer to a live object
    UnknownHandle,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ResourceLoadFailure(id) => write!(f, "failed to load image resource {:?}", id),
            Error::FontLoadFailure(id) => write!(f, "failed to load font {:?}", id),
            Error::LayerCapacity => f.write_str("out of layer slots"),
            Error::BitmapCapacity => f.write_str("out of bitmap slots"),
            Error::AnimationCapacity => f.write_str("out of animation slots"),
            Error::AnimationInFlight => f.write_str("an animation is already in flight"),
            Error::UnknownHandle => f.write_str("handle does not refer to a live object"),
        }
    }
}
