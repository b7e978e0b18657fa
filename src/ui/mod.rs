//! UI definitions module
//! Based on: https://github.com/lupyuen/pinetime-watchface/blob/master/src/lib.rs

use chrono::NaiveDateTime;

use crate::Error;
use host::{AnimationId, Host};

pub mod clock;
pub mod host;
pub mod mask_watchface;

/// Things that happen to a watchface, delivered one at a time by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A new minute started
    MinuteTick(NaiveDateTime),
    /// A delayed animation began to move
    AnimationStarted(AnimationId),
    /// An animation ended, `finished` is false when it was interrupted
    AnimationStopped { id: AnimationId, finished: bool },
}

pub trait WatchFace<H: Host>: Sized {
    /// Build the watchface's layers and show the current time
    fn load(host: &mut H) -> Result<Self, Error>;

    /// React to a host event
    fn handle(&mut self, host: &mut H, event: Event);

    /// Release everything the watchface created
    fn unload(self, host: &mut H);
}
