//! Software host for watchfaces
//!
//! Keeps a small layer tree, runs frame animations on it and composites it
//! into 1-bit framebuffers. The firmware drives it with the current time and
//! pushes rendered frames to the LCD.

use chrono::NaiveDateTime;
use embassy_time::Instant;
use embedded_graphics::{
    geometry::Size, mono_font::MonoFont, pixelcolor::BinaryColor, prelude::DrawTarget,
    primitives::Rectangle,
};

use crate::{
    ui::{
        host::{
            AnimationId, Animator, Clock, CompositingMode, DisplayTree, FontId, ResourceId,
            TextStyle, Timing,
        },
        Event, WatchFace,
    },
    Error,
};

pub mod animator;
pub mod assets;
pub mod bitmap;
pub mod scene;

pub use animator::{AnimationHandle, Curve, Events, PropertyAnimator};
pub use assets::{Bundle, ProceduralBundle};
pub use bitmap::Bitmap;
pub use scene::{BitmapHandle, LayerHandle, Scene};

/// Size of the watchface scene
pub const SCENE_SIZE: Size = bitmap::MAX_SIZE;

/// Display tree, animator, asset bundle and clock in one
pub struct SoftwareHost<C, B = ProceduralBundle> {
    scene: Scene,
    animator: PropertyAnimator,
    bundle: B,
    clock: C,
}

impl<C: Clock, B: Bundle> SoftwareHost<C, B> {
    pub fn new(clock: C, bundle: B) -> Self {
        Self {
            scene: Scene::new(),
            animator: PropertyAnimator::default(),
            bundle,
            clock,
        }
    }

    /// Step all animations to `now`, returning the events to hand to the
    /// watchface in order
    pub fn advance(&mut self, now: Instant) -> Events {
        self.animator.advance(now, &mut self.scene)
    }

    /// One pass of the watchface loop.
    ///
    /// Animations are brought up to `now` before `tick` is delivered, so an
    /// animation the tick starts is timed from `now` and not from the
    /// previous pass.
    pub fn step<W: WatchFace<Self>>(
        &mut self,
        face: &mut W,
        now: Instant,
        tick: Option<NaiveDateTime>,
    ) {
        for event in self.advance(now) {
            face.handle(self, event);
        }
        if let Some(time) = tick {
            face.handle(self, Event::MinuteTick(time));
        }
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_animating()
    }

    /// Whether the scene changed since it was last rendered
    pub fn is_dirty(&self) -> bool {
        self.scene.is_dirty()
    }

    pub fn render<D>(&mut self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        self.scene.render(target)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

impl<C, B: Bundle> DisplayTree for SoftwareHost<C, B> {
    type Layer = LayerHandle;
    type Bitmap = BitmapHandle;
    type Font = &'static MonoFont<'static>;

    fn set_background(&mut self, color: BinaryColor) {
        self.scene.set_background(color);
    }

    fn load_bitmap(&mut self, id: ResourceId) -> Result<BitmapHandle, Error> {
        let bitmap = self.bundle.image(id)?;
        self.scene.add_bitmap(bitmap)
    }

    fn destroy_bitmap(&mut self, bitmap: BitmapHandle) {
        self.scene.remove_bitmap(bitmap);
    }

    fn load_font(&mut self, id: FontId) -> Result<Self::Font, Error> {
        self.bundle.font(id)
    }

    fn unload_font(&mut self, _font: Self::Font) {}

    fn create_layer(&mut self, frame: Rectangle) -> Result<LayerHandle, Error> {
        self.scene.create_layer(frame)
    }

    fn create_text_layer(
        &mut self,
        frame: Rectangle,
        font: &Self::Font,
        style: TextStyle,
    ) -> Result<LayerHandle, Error> {
        self.scene.create_text_layer(frame, *font, style)
    }

    fn destroy_layer(&mut self, layer: LayerHandle) {
        self.scene.destroy_layer(layer);
    }

    fn set_bitmap(&mut self, layer: &LayerHandle, bitmap: &BitmapHandle) {
        self.scene.set_bitmap(layer, bitmap);
    }

    fn set_compositing_mode(&mut self, layer: &LayerHandle, mode: CompositingMode) {
        self.scene.set_compositing_mode(layer, mode);
    }

    fn set_text(&mut self, layer: &LayerHandle, text: &str) {
        self.scene.set_text(layer, text);
    }

    fn add_to_root(&mut self, layer: &LayerHandle) {
        self.scene.attach(layer);
    }

    fn remove_from_parent(&mut self, layer: &LayerHandle) {
        self.scene.detach(layer);
    }

    fn frame(&self, layer: &LayerHandle) -> Rectangle {
        self.scene.frame(layer)
    }
}

impl<C, B: Bundle> Animator for SoftwareHost<C, B> {
    type Animation = AnimationHandle;

    fn create_frame_animation(
        &mut self,
        layer: &LayerHandle,
        from: Rectangle,
        to: Rectangle,
        timing: Timing,
    ) -> Result<AnimationHandle, Error> {
        self.animator.create(layer.slot(), from, to, timing)
    }

    fn animation_id(&self, animation: &AnimationHandle) -> AnimationId {
        animation.id()
    }

    fn schedule(&mut self, animation: &AnimationHandle) -> Result<(), Error> {
        self.animator.schedule(animation)
    }

    fn unschedule_all(&mut self) {
        self.animator.unschedule_all();
    }

    fn destroy_animation(&mut self, animation: AnimationHandle) {
        self.animator.destroy(animation);
    }
}

impl<C: Clock, B> Clock for SoftwareHost<C, B> {
    fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    fn is_24h_style(&self) -> bool {
        self.clock.is_24h_style()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use embedded_graphics::geometry::Point;

    use super::*;
    use crate::ui::mask_watchface::{MaskWatchface, Phase};

    struct FixedClock(NaiveDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            self.0
        }

        fn is_24h_style(&self) -> bool {
            true
        }
    }

    struct MissingEyes;

    impl Bundle for MissingEyes {
        fn image(&self, id: ResourceId) -> Result<Bitmap, Error> {
            match id {
                ResourceId::EyesWhite | ResourceId::EyesBlack => {
                    Err(Error::ResourceLoadFailure(id))
                }
                _ => ProceduralBundle.image(id),
            }
        }

        fn font(&self, id: FontId) -> Result<&'static MonoFont<'static>, Error> {
            ProceduralBundle.font(id)
        }
    }

    fn ten_past_three() -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2024, 3, 3)
                .and_then(|d| d.and_hms_opt(10, 3, 0))
                .unwrap(),
        )
    }

    /// Step the host in frame sized increments, feeding events back
    fn run<B: Bundle>(
        host: &mut SoftwareHost<FixedClock, B>,
        face: &mut MaskWatchface<SoftwareHost<FixedClock, B>>,
        from: u64,
        until: u64,
    ) -> std::vec::Vec<Event> {
        let mut seen = std::vec::Vec::new();
        for millis in (from..=until).step_by(10) {
            for event in host.advance(Instant::from_millis(millis)) {
                face.handle(host, event);
                seen.push(event);
            }
        }
        seen
    }

    fn rendered(host: &mut SoftwareHost<FixedClock>) -> Bitmap {
        let mut frame = Bitmap::new(SCENE_SIZE).unwrap();
        host.render(&mut frame).unwrap();
        frame
    }

    #[test]
    fn watchface_cycle_on_the_software_host() {
        let mut host = SoftwareHost::new(ten_past_three(), ProceduralBundle);
        let mut face = MaskWatchface::load(&mut host).unwrap();
        assert_eq!(host.scene().attached(), 4);
        let idle = rendered(&mut host);

        let tick = host.clock_mut().0;
        face.handle(&mut host, Event::MinuteTick(tick));
        assert_eq!(face.phase(), Phase::Closing);

        // Close takes 250ms, the eyes show up once it is done
        run(&mut host, &mut face, 0, 300);
        assert_eq!(face.phase(), Phase::Opening);
        assert!(face.eyes_visible());
        assert_eq!(host.scene().attached(), 6);
        assert_eq!(face.clock(), "10:03");

        // Eyes light up inside the sockets of the closed mask
        let closed = rendered(&mut host);
        assert_eq!(closed.pixel(Point::new(30 + 10, 73 + 5)), BinaryColor::On);

        // The eyes go dark as soon as the delayed open starts
        run(&mut host, &mut face, 310, 2_310);
        assert!(!face.eyes_visible());
        assert_eq!(host.scene().attached(), 4);

        run(&mut host, &mut face, 2_320, 2_700);
        assert_eq!(face.phase(), Phase::Idle);
        assert!(!host.is_animating());
        let after: std::vec::Vec<_> = rendered(&mut host).pixels().collect();
        assert_eq!(after, idle.pixels().collect::<std::vec::Vec<_>>());

        face.unload(&mut host);
        assert_eq!(host.scene().attached(), 0);
    }

    #[test]
    fn tick_after_an_idle_wait_slides_the_mask() {
        let mut host = SoftwareHost::new(ten_past_three(), ProceduralBundle);
        let mut face = MaskWatchface::load(&mut host).unwrap();
        let tick = host.clock_mut().0;

        host.step(&mut face, Instant::from_millis(0), None);
        // Idle poll period, then the tick arrives
        host.step(&mut face, Instant::from_millis(250), Some(tick));
        assert_eq!(face.phase(), Phase::Closing);

        // First frame after the tick starts the close without finishing it
        host.step(&mut face, Instant::from_millis(283), None);
        assert_eq!(face.phase(), Phase::Closing);
        assert!(!face.eyes_visible());
        assert!(host.is_animating());

        host.step(&mut face, Instant::from_millis(500), None);
        assert_eq!(face.phase(), Phase::Opening);
        assert!(face.eyes_visible());
    }

    #[test]
    fn mask_covers_the_time_while_closed() {
        let mut host = SoftwareHost::new(ten_past_three(), ProceduralBundle);
        let mut face = MaskWatchface::load(&mut host).unwrap();
        let tick = host.clock_mut().0;
        face.handle(&mut host, Event::MinuteTick(tick));
        run(&mut host, &mut face, 0, 300);

        // Between the eyes and the lip only the face artwork shows
        let art = ProceduralBundle.image(ResourceId::Face).unwrap();
        let closed = rendered(&mut host);
        for y in 90..135 {
            for x in 0..144 {
                let p = Point::new(x, y);
                assert_eq!(closed.pixel(p), art.pixel(p), "{p:?}");
            }
        }
    }

    #[test]
    fn missing_eyes_do_not_stop_the_cycle() {
        let mut host = SoftwareHost::new(ten_past_three(), MissingEyes);
        let mut face = MaskWatchface::load(&mut host).unwrap();

        let tick = host.clock_mut().0;
        face.handle(&mut host, Event::MinuteTick(tick));
        let events = run(&mut host, &mut face, 0, 3_000);

        assert_eq!(face.phase(), Phase::Idle);
        assert!(!face.eyes_visible());
        assert_eq!(host.scene().attached(), 4);
        let stops = events
            .iter()
            .filter(|e| matches!(e, Event::AnimationStopped { finished: true, .. }))
            .count();
        assert_eq!(stops, 2);
    }
}
