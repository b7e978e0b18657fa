//! Mask watchface
//!
//! The time sits behind a face mask. Every minute the mask runs one cycle:
//!
//! 1. `Closing`: the mask slides down over the display.
//! 2. `ClosedTransition`: once fully closed, the eyes light up, the time is
//!    updated underneath the mask and the opening animation is scheduled.
//! 3. `Opening`: after a delay the eyes go dark and the mask slides back up.
//! 4. `Idle`: waiting for the next minute.
//!
//! The eyes overlay and the animation are transient, everything else lives
//! from [`WatchFace::load`] to [`WatchFace::unload`].

use chrono::Timelike;
use embassy_time::Duration;
use embedded_graphics::{
    geometry::{Point, Size},
    pixelcolor::BinaryColor,
    primitives::Rectangle,
};

use super::{
    clock::{format_clock, ClockString},
    host::{
        AnimationId, CompositingMode, DisplayTree, FontId, Host, ResourceId, TextStyle, Timing,
        DEFAULT_ANIMATION_DURATION,
    },
    Event, WatchFace,
};
use crate::Error;

/// Shorthand for a rectangle at `(x, y)` of `width` by `height`
pub const fn rect(x: i32, y: i32, width: u32, height: u32) -> Rectangle {
    Rectangle::new(Point::new(x, y), Size::new(width, height))
}

/// Geometry and timing of the watchface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskConfig {
    /// Mask frame while the face is visible
    pub open_frame: Rectangle,
    /// Mask frame while it covers the display
    pub closed_frame: Rectangle,
    /// Where the eyes light up on the closed mask
    pub eyes_frame: Rectangle,
    /// Lip overlay at the bottom edge
    pub lip_frame: Rectangle,
    /// Time text
    pub time_frame: Rectangle,
    pub close_duration: Duration,
    pub open_duration: Duration,
    /// How long the mask stays closed before opening
    pub open_delay: Duration,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            open_frame: rect(0, -80, 144, 143),
            closed_frame: rect(0, 0, 144, 143),
            eyes_frame: rect(30, 73, 83, 15),
            lip_frame: rect(0, 135, 144, 23),
            time_frame: rect(0, 60, 144, 60),
            close_duration: DEFAULT_ANIMATION_DURATION,
            open_duration: DEFAULT_ANIMATION_DURATION,
            open_delay: Duration::from_millis(2000),
        }
    }
}

/// Where the watchface is in its animation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Idle,
    Closing,
    ClosedTransition,
    Opening,
}

/// Holds at most one animation
pub struct AnimationSlot<A> {
    current: Option<A>,
}

impl<A> AnimationSlot<A> {
    pub const fn empty() -> Self {
        Self { current: None }
    }

    /// Store `animation` in the empty slot.
    ///
    /// Hands the animation back untouched if the slot is already occupied.
    pub fn fill(&mut self, animation: A) -> Result<&A, A> {
        if self.current.is_some() {
            return Err(animation);
        }
        Ok(self.current.insert(animation))
    }

    pub fn take(&mut self) -> Option<A> {
        self.current.take()
    }

    pub fn get(&self) -> Option<&A> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}

impl<A> Default for AnimationSlot<A> {
    fn default() -> Self {
        Self::empty()
    }
}

/// A layer showing a bitmap it owns
struct Sprite<H: DisplayTree> {
    layer: H::Layer,
    bitmap: H::Bitmap,
}

impl<H: DisplayTree> Sprite<H> {
    fn create(
        host: &mut H,
        resource: ResourceId,
        frame: Rectangle,
        mode: CompositingMode,
    ) -> Result<Self, Error> {
        let bitmap = host.load_bitmap(resource)?;
        let layer = match host.create_layer(frame) {
            Ok(layer) => layer,
            Err(e) => {
                host.destroy_bitmap(bitmap);
                return Err(e);
            }
        };
        host.set_bitmap(&layer, &bitmap);
        host.set_compositing_mode(&layer, mode);
        host.add_to_root(&layer);
        Ok(Self { layer, bitmap })
    }

    fn destroy(self, host: &mut H) {
        host.remove_from_parent(&self.layer);
        host.destroy_layer(self.layer);
        host.destroy_bitmap(self.bitmap);
    }
}

/// Two sprites over the same frame rendering a two-tone image: the white
/// half is OR-ed in, the black half clears.
struct TwoTone<H: DisplayTree> {
    white: Sprite<H>,
    black: Sprite<H>,
}

impl<H: DisplayTree> TwoTone<H> {
    fn show(
        host: &mut H,
        white: ResourceId,
        black: ResourceId,
        frame: Rectangle,
    ) -> Result<Self, Error> {
        let white = Sprite::create(host, white, frame, CompositingMode::Or)?;
        let black = match Sprite::create(host, black, frame, CompositingMode::Clear) {
            Ok(black) => black,
            Err(e) => {
                white.destroy(host);
                return Err(e);
            }
        };
        Ok(Self { white, black })
    }

    fn hide(self, host: &mut H) {
        let Self { white, black } = self;
        host.remove_from_parent(&white.layer);
        host.remove_from_parent(&black.layer);
        host.destroy_layer(black.layer);
        host.destroy_layer(white.layer);
        host.destroy_bitmap(white.bitmap);
        host.destroy_bitmap(black.bitmap);
    }
}

/// Text layer showing the time
struct TimeLabel<H: DisplayTree> {
    layer: H::Layer,
    font: H::Font,
}

impl<H: DisplayTree> TimeLabel<H> {
    fn create(host: &mut H, frame: Rectangle) -> Result<Self, Error> {
        let font = host.load_font(FontId::Clock)?;
        let layer = match host.create_text_layer(frame, &font, TextStyle::default()) {
            Ok(layer) => layer,
            Err(e) => {
                host.unload_font(font);
                return Err(e);
            }
        };
        host.add_to_root(&layer);
        Ok(Self { layer, font })
    }

    fn destroy(self, host: &mut H) {
        host.remove_from_parent(&self.layer);
        host.destroy_layer(self.layer);
        host.unload_font(self.font);
    }
}

/// Digital clock behind a face mask that blinks once a minute
pub struct MaskWatchface<H: Host> {
    config: MaskConfig,
    phase: Phase,
    time: TimeLabel<H>,
    face: Sprite<H>,
    lip: TwoTone<H>,
    eyes: Option<TwoTone<H>>,
    animation: AnimationSlot<H::Animation>,
    clock: ClockString,
    /// A tick arrived while a cycle was running
    tick_pending: bool,
}

impl<H: Host> MaskWatchface<H> {
    /// Build the persistent layers and show the current time.
    ///
    /// Fails if the resource bundle cannot supply an asset. Nothing created
    /// up to that point is left behind in the host.
    pub fn with_config(host: &mut H, config: MaskConfig) -> Result<Self, Error> {
        info!("Loading mask watchface");
        host.set_background(BinaryColor::Off);

        // Stacking order: time, then the mask over it, then the lip over both
        let time = TimeLabel::create(host, config.time_frame).map_err(|e| {
            error!("Failed to create time label: {}", e);
            e
        })?;
        let face = match Sprite::create(
            host,
            ResourceId::Face,
            config.open_frame,
            CompositingMode::Assign,
        ) {
            Ok(face) => face,
            Err(e) => {
                error!("Failed to create face: {}", e);
                time.destroy(host);
                return Err(e);
            }
        };
        let lip = match TwoTone::show(
            host,
            ResourceId::LipWhite,
            ResourceId::LipBlack,
            config.lip_frame,
        ) {
            Ok(lip) => lip,
            Err(e) => {
                error!("Failed to create lip: {}", e);
                face.destroy(host);
                time.destroy(host);
                return Err(e);
            }
        };

        let mut watchface = Self {
            config,
            phase: Phase::Idle,
            time,
            face,
            lip,
            eyes: None,
            animation: AnimationSlot::empty(),
            clock: ClockString::default(),
            tick_pending: false,
        };
        watchface.update_time(host);
        Ok(watchface)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Time currently shown
    pub fn clock(&self) -> &ClockString {
        &self.clock
    }

    pub fn eyes_visible(&self) -> bool {
        self.eyes.is_some()
    }

    pub fn config(&self) -> &MaskConfig {
        &self.config
    }

    fn is_current(&self, host: &H, id: AnimationId) -> bool {
        self.animation
            .get()
            .map_or(false, |animation| host.animation_id(animation) == id)
    }

    fn minute_tick(&mut self, host: &mut H) {
        match self.phase {
            Phase::Idle => self.close_mask(host),
            phase => {
                debug!("Tick during {}, queued", phase);
                self.tick_pending = true;
            }
        }
    }

    fn close_mask(&mut self, host: &mut H) {
        let from = host.frame(&self.face.layer);
        let to = self.config.closed_frame;
        match self.start_animation(host, from, to, Timing::new(self.config.close_duration)) {
            Ok(()) => {
                debug!("Closing mask");
                self.phase = Phase::Closing;
            }
            Err(e) => warn!("Failed to start closing the mask: {}", e),
        }
    }

    fn mask_closed(&mut self, host: &mut H) {
        self.phase = Phase::ClosedTransition;
        self.show_eyes(host);
        self.update_time(host);
        self.open_mask(host);
    }

    fn open_mask(&mut self, host: &mut H) {
        let from = host.frame(&self.face.layer);
        let to = self.config.open_frame;
        let timing = Timing::new(self.config.open_duration).with_delay(self.config.open_delay);
        match self.start_animation(host, from, to, timing) {
            Ok(()) => {
                debug!("Opening mask");
                self.phase = Phase::Opening;
            }
            Err(e) => {
                warn!("Failed to start opening the mask: {}", e);
                self.hide_eyes(host);
                self.phase = Phase::Idle;
            }
        }
    }

    fn start_animation(
        &mut self,
        host: &mut H,
        from: Rectangle,
        to: Rectangle,
        timing: Timing,
    ) -> Result<(), Error> {
        let animation = host.create_frame_animation(&self.face.layer, from, to, timing)?;
        let scheduled = match self.animation.fill(animation) {
            Ok(current) => host.schedule(current),
            Err(rejected) => {
                host.destroy_animation(rejected);
                return Err(Error::AnimationInFlight);
            }
        };
        if scheduled.is_err() {
            self.release_animation(host);
        }
        scheduled
    }

    fn release_animation(&mut self, host: &mut H) {
        if let Some(animation) = self.animation.take() {
            host.destroy_animation(animation);
        }
    }

    fn animation_started(&mut self, host: &mut H) {
        if self.phase == Phase::Opening {
            self.hide_eyes(host);
        }
    }

    fn animation_stopped(&mut self, host: &mut H, finished: bool) {
        self.release_animation(host);
        match self.phase {
            Phase::Closing if finished => self.mask_closed(host),
            Phase::Closing => {
                warn!("Closing the mask was interrupted");
                self.phase = Phase::Idle;
            }
            Phase::Opening => {
                if !finished {
                    warn!("Opening the mask was interrupted");
                }
                // Still shown when stopped before the delay ran out
                self.hide_eyes(host);
                self.phase = Phase::Idle;
            }
            Phase::Idle | Phase::ClosedTransition => {}
        }

        if self.phase == Phase::Idle && core::mem::take(&mut self.tick_pending) {
            debug!("Running queued tick");
            self.close_mask(host);
        }
    }

    fn show_eyes(&mut self, host: &mut H) {
        if self.eyes.is_some() {
            return;
        }
        match TwoTone::show(
            host,
            ResourceId::EyesWhite,
            ResourceId::EyesBlack,
            self.config.eyes_frame,
        ) {
            Ok(eyes) => {
                trace!("Eyes shown");
                self.eyes = Some(eyes);
            }
            Err(e) => warn!("Failed to show eyes: {}", e),
        }
    }

    fn hide_eyes(&mut self, host: &mut H) {
        if let Some(eyes) = self.eyes.take() {
            trace!("Eyes hidden");
            eyes.hide(host);
        }
    }

    fn update_time(&mut self, host: &mut H) {
        let now = host.now();
        self.clock = format_clock(&now, host.is_24h_style());
        host.set_text(&self.time.layer, self.clock.as_str());
        info!("Time updated: {}", self.clock);
    }
}

impl<H: Host> WatchFace<H> for MaskWatchface<H> {
    fn load(host: &mut H) -> Result<Self, Error> {
        Self::with_config(host, MaskConfig::default())
    }

    fn handle(&mut self, host: &mut H, event: Event) {
        match event {
            Event::MinuteTick(now) => {
                trace!("Minute tick at {=u32}:{=u32}", now.hour(), now.minute());
                self.minute_tick(host);
            }
            Event::AnimationStarted(id) if self.is_current(host, id) => {
                self.animation_started(host)
            }
            Event::AnimationStopped { id, finished } if self.is_current(host, id) => {
                self.animation_stopped(host, finished)
            }
            Event::AnimationStarted(id) | Event::AnimationStopped { id, .. } => {
                debug!("Ignoring event for stale animation {}", id);
            }
        }
    }

    /// Stops all animations before anything is destroyed, so no animation
    /// event can refer to a released layer afterwards.
    fn unload(mut self, host: &mut H) {
        info!("Unloading mask watchface");
        host.unschedule_all();
        self.release_animation(host);
        self.hide_eyes(host);

        let Self { time, face, lip, .. } = self;
        lip.hide(host);
        face.destroy(host);
        time.destroy(host);
    }
}
