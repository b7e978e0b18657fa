//! Property animations of layer frames
//!
//! Animations are advanced explicitly with the current time, which moves the
//! animated layers in the [`Scene`] and returns the started/stopped events the
//! watchface has to see.

use embassy_time::{Duration, Instant};
use embedded_graphics::{geometry::Point, geometry::Size, primitives::Rectangle};
use heapless::Vec;

use super::scene::Scene;
use crate::{
    ui::{
        host::{AnimationId, Timing},
        Event,
    },
    Error,
};

/// Animation slots
pub const MAX_ANIMATIONS: usize = 4;
/// Interruptions held until the next step
pub const MAX_PENDING: usize = 3 * MAX_ANIMATIONS;
/// Every pending interruption plus a start and a stop per animation
pub const MAX_EVENTS: usize = MAX_PENDING + 2 * MAX_ANIMATIONS;

/// Fixed point one for animation progress
const PROGRESS_ONE: u64 = 1 << 16;

pub type Events = Vec<Event, MAX_EVENTS>;

fn report<const N: usize>(events: &mut Vec<Event, N>, event: Event) {
    if events.push(event).is_err() {
        warn!("Animation event dropped");
    }
}

/// Owning handle to an animation in a [`PropertyAnimator`]
#[derive(Debug, PartialEq, Eq)]
pub struct AnimationHandle {
    slot: u8,
    id: AnimationId,
}

impl AnimationHandle {
    pub fn id(&self) -> AnimationId {
        self.id
    }
}

/// Speed profile of an animation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Curve {
    Linear,
    /// Accelerate, then decelerate
    #[default]
    EaseInOut,
}

impl Curve {
    /// Map linear progress to eased progress, both in `0..=PROGRESS_ONE`
    fn apply(self, progress: u64) -> u64 {
        let progress = progress.min(PROGRESS_ONE);
        match self {
            Curve::Linear => progress,
            Curve::EaseInOut if progress < PROGRESS_ONE / 2 => {
                2 * progress * progress / PROGRESS_ONE
            }
            Curve::EaseInOut => {
                let rest = PROGRESS_ONE - progress;
                PROGRESS_ONE - 2 * rest * rest / PROGRESS_ONE
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Scheduled { at: Instant },
    Running { at: Instant },
    Done,
}

struct FrameAnimation {
    id: AnimationId,
    layer: u8,
    from: Rectangle,
    to: Rectangle,
    timing: Timing,
    state: State,
}

/// Linear interpolation between two values at fixed point `eased`
fn lerp(from: i32, to: i32, eased: u64) -> i32 {
    let delta = i64::from(to) - i64::from(from);
    (i64::from(from) + delta * eased as i64 / PROGRESS_ONE as i64) as i32
}

fn interpolate(from: Rectangle, to: Rectangle, eased: u64) -> Rectangle {
    Rectangle::new(
        Point::new(
            lerp(from.top_left.x, to.top_left.x, eased),
            lerp(from.top_left.y, to.top_left.y, eased),
        ),
        Size::new(
            lerp(from.size.width as i32, to.size.width as i32, eased) as u32,
            lerp(from.size.height as i32, to.size.height as i32, eased) as u32,
        ),
    )
}

/// Runs frame animations on scene layers
pub struct PropertyAnimator {
    curve: Curve,
    animations: Vec<Option<FrameAnimation>, MAX_ANIMATIONS>,
    /// Interruptions waiting to be reported
    pending: Vec<Event, MAX_PENDING>,
    next_id: u16,
    /// Time of the last step
    now: Instant,
}

impl Default for PropertyAnimator {
    fn default() -> Self {
        Self::new(Curve::default())
    }
}

impl PropertyAnimator {
    pub const fn new(curve: Curve) -> Self {
        Self {
            curve,
            animations: Vec::new(),
            pending: Vec::new(),
            next_id: 0,
            now: Instant::from_ticks(0),
        }
    }

    fn get_mut(&mut self, handle: &AnimationHandle) -> Option<&mut FrameAnimation> {
        self.animations
            .get_mut(handle.slot as usize)
            .and_then(Option::as_mut)
            .filter(|animation| animation.id == handle.id)
    }

    /// Describe a move of the layer in `layer_slot`
    pub fn create(
        &mut self,
        layer_slot: u8,
        from: Rectangle,
        to: Rectangle,
        timing: Timing,
    ) -> Result<AnimationHandle, Error> {
        self.next_id = self.next_id.wrapping_add(1);
        let id = AnimationId(self.next_id);
        let animation = FrameAnimation {
            id,
            layer: layer_slot,
            from,
            to,
            timing,
            state: State::Created,
        };

        let slot = match self.animations.iter().position(Option::is_none) {
            Some(slot) => {
                self.animations[slot] = Some(animation);
                slot
            }
            None => {
                self.animations
                    .push(Some(animation))
                    .map_err(|_| Error::AnimationCapacity)?;
                self.animations.len() - 1
            }
        };
        trace!("Created animation {}", id);
        Ok(AnimationHandle {
            slot: slot as u8,
            id,
        })
    }

    /// Start the clock of an animation at the time of the last step.
    ///
    /// An animation still moving the same layer is stopped and reported as
    /// not finished.
    pub fn schedule(&mut self, handle: &AnimationHandle) -> Result<(), Error> {
        let now = self.now;
        let layer = self.get_mut(handle).ok_or(Error::UnknownHandle)?.layer;

        for other in self.animations.iter_mut().flatten() {
            let active = matches!(other.state, State::Scheduled { .. } | State::Running { .. });
            if other.id != handle.id && other.layer == layer && active {
                debug!("Animation {} interrupted by {}", other.id, handle.id);
                other.state = State::Done;
                let stopped = Event::AnimationStopped {
                    id: other.id,
                    finished: false,
                };
                report(&mut self.pending, stopped);
            }
        }

        if let Some(animation) = self.get_mut(handle) {
            animation.state = State::Scheduled { at: now };
        }
        Ok(())
    }

    /// Stop all animations. Nothing is reported for them, not even the
    /// interruptions still pending.
    pub fn unschedule_all(&mut self) {
        for animation in self.animations.iter_mut().flatten() {
            if animation.state != State::Created {
                animation.state = State::Done;
            }
        }
        self.pending.clear();
    }

    pub fn destroy(&mut self, handle: AnimationHandle) {
        if self.get_mut(&handle).is_some() {
            self.animations[handle.slot as usize] = None;
            trace!("Destroyed animation {}", handle.id);
        }
    }

    /// Whether any animation still has to move
    pub fn is_animating(&self) -> bool {
        self.animations.iter().flatten().any(|animation| {
            matches!(animation.state, State::Scheduled { .. } | State::Running { .. })
        })
    }

    /// Move every animated layer to where it should be at `now`
    pub fn advance(&mut self, now: Instant, scene: &mut Scene) -> Events {
        self.now = now;
        let mut events = Events::new();
        for event in core::mem::take(&mut self.pending) {
            report(&mut events, event);
        }

        for animation in self.animations.iter_mut().flatten() {
            let at = match animation.state {
                State::Scheduled { at } | State::Running { at } => at,
                State::Created | State::Done => continue,
            };
            let elapsed = now.checked_duration_since(at).unwrap_or(Duration::from_ticks(0));
            if elapsed < animation.timing.delay {
                continue;
            }

            if let State::Scheduled { at } = animation.state {
                animation.state = State::Running { at };
                report(&mut events, Event::AnimationStarted(animation.id));
            }

            let moving = elapsed - animation.timing.delay;
            let progress = match animation.timing.duration.as_ticks() {
                0 => PROGRESS_ONE,
                duration => moving.as_ticks().saturating_mul(PROGRESS_ONE) / duration,
            };
            let eased = self.curve.apply(progress);
            scene.set_frame(animation.layer, interpolate(animation.from, animation.to, eased));

            if progress >= PROGRESS_ONE {
                animation.state = State::Done;
                report(
                    &mut events,
                    Event::AnimationStopped {
                        id: animation.id,
                        finished: true,
                    },
                );
            }
        }
        events
    }
}
