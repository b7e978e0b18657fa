//! General system configuration

use embassy_nrf::{
    config::{Config, Debug, HfclkSource, LfclkSource},
    interrupt::Priority,
};

pub struct SystemConfig;

impl SystemConfig {
    /// Chip configuration for the watch
    pub fn new() -> Config {
        // `Config` is `non_exhaustive`
        let mut config = Config::default();

        // Both clocks from the external crystals
        config.hfclk_source = HfclkSource::ExternalXtal;
        config.lfclk_source = LfclkSource::ExternalXtal;

        // DC/DC regulator cuts the runtime current consumption
        config.dcdc.reg1 = true;

        // Animations run from the timer, keep it ahead of GPIO
        config.time_interrupt_priority = Priority::P2;
        config.gpiote_interrupt_priority = Priority::P3;

        config.debug = Debug::Allowed;

        config
    }
}
