#![no_std]
#![no_main]

// Panic handler and debugging
use defmt::unwrap;

use defmt_rtt as _;
use panic_probe as _;

// Device
use embassy_executor::Spawner;
use embassy_nrf::{
    bind_interrupts,
    gpio::{Level, Output, OutputDrive, Pin},
    peripherals::SPI2,
    spim,
};
use embassy_sync::{blocking_mutex::raw::ThreadModeRawMutex, signal::Signal};
use embassy_time::{Duration, Instant, Timer};
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<SPI2>;
});

// Crate
use pinetime_maskface::{
    graphics::{Bitmap, ProceduralBundle, SoftwareHost, SCENE_SIZE},
    peripherals::{backlight::Backlight, display::Display},
    system::{
        config::SystemConfig,
        time::{TimeManager, TimeReference, WallClock},
    },
    ui::{mask_watchface::MaskWatchface, WatchFace},
};

// Others
use chrono::{NaiveDateTime, Timelike};

// Include current UTC epoch at compile time
include!(concat!(env!("OUT_DIR"), "/utc.rs"));
const TIMEZONE: i32 = 1 * 3_600;
const CLOCK_24H: bool = true;
const BRIGHTNESS: u8 = 3;

/// Redraw period while something moves
const FRAME_PERIOD: Duration = Duration::from_millis(33);
/// Poll period while the watchface rests
const IDLE_PERIOD: Duration = Duration::from_millis(250);

type Host = SoftwareHost<WallClock, ProceduralBundle>;

// Communication channels
static MINUTE_TICK: Signal<ThreadModeRawMutex, NaiveDateTime> = Signal::new();

static HOST: StaticCell<Host> = StaticCell::new();
static FRAME: StaticCell<Bitmap> = StaticCell::new();
static BACKLIGHT: StaticCell<Backlight<'static>> = StaticCell::new();

/// Signal the local time at the start of every minute.
#[embassy_executor::task(pool_size = 1)]
async fn minute_ticker(time: TimeManager) {
    loop {
        Timer::after(time.until_next_minute(Instant::now())).await;

        let local = time.local(Instant::now());
        defmt::info!("Minute tick {}:{}", local.hour(), local.minute());
        MINUTE_TICK.signal(local);
    }
}

/// Drive the watchface and push changed frames to the LCD.
#[embassy_executor::task(pool_size = 1)]
async fn run_watchface(
    host: &'static mut Host,
    frame: &'static mut Bitmap,
    mut display: Display<'static, SPI2>,
) {
    let mut face = match MaskWatchface::load(host) {
        Ok(face) => face,
        Err(e) => defmt::panic!("Watchface failed to load: {}", e),
    };

    loop {
        host.step(&mut face, Instant::now(), MINUTE_TICK.try_take());

        if host.is_dirty() {
            if let Err(never) = host.render(frame) {
                match never {}
            }
            if let Err(e) = display.show(frame) {
                defmt::error!("Frame not shown: {}", e);
            }
        }

        // Re-schedule the timer interrupt
        let period = if host.is_animating() {
            FRAME_PERIOD
        } else {
            IDLE_PERIOD
        };
        Timer::after(period).await;
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(SystemConfig::new());
    defmt::info!("Initializing");

    // Initialize Backlight
    let mut backlight = Backlight::init(
        Output::new(p.P0_14.degrade(), Level::High, OutputDrive::Standard),
        Output::new(p.P0_22.degrade(), Level::High, OutputDrive::Standard),
        Output::new(p.P0_23.degrade(), Level::High, OutputDrive::Standard),
    );

    // Initialize SPI
    let mut spim_config = spim::Config::default();
    // Use SPI at 8MHz (the fastest clock available on the nRF52832),
    // otherwise refreshing will be super slow.
    spim_config.frequency = spim::Frequency::M8;
    // SPI must be used in mode 3. Mode 0 (the default) won't work.
    spim_config.mode = spim::MODE_3;

    let spim = spim::Spim::new(p.SPI2, Irqs, p.P0_02, p.P0_04, p.P0_03, spim_config);

    // Initialize LCD
    let display = unwrap!(Display::init(
        spim,
        Output::new(p.P0_25.degrade(), Level::Low, OutputDrive::Standard),
        Output::new(p.P0_18.degrade(), Level::Low, OutputDrive::Standard),
        Output::new(p.P0_26.degrade(), Level::Low, OutputDrive::Standard),
    ));
    unwrap!(backlight.set(BRIGHTNESS));
    // Dropping the pins would switch the backlight off
    BACKLIGHT.init(backlight);

    // Wall clock from the build time
    let time = TimeManager::init(TIMEZONE)
        .with_reference(TimeReference::from_timestamp(UTC_EPOCH, Instant::now()));
    let host = HOST.init(SoftwareHost::new(WallClock::new(time, CLOCK_24H), ProceduralBundle));
    let frame = FRAME.init(unwrap!(Bitmap::new(SCENE_SIZE)));

    defmt::info!("Initialization finished");

    // Schedule tasks
    unwrap!(spawner.spawn(minute_ticker(time)));
    unwrap!(spawner.spawn(run_watchface(host, frame, display)));
}
