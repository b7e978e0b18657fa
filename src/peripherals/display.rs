//! Display control module for PineTime

use display_interface_spi::SPIInterface;
use embassy_nrf::{
    gpio::{AnyPin, Output},
    spim::{self, Spim},
};
use embassy_time::Delay;
use embedded_graphics::{
    pixelcolor::{BinaryColor, Rgb565},
    prelude::*,
    primitives::Rectangle,
};
use mipidsi::{models::ST7789, Builder, Orientation};

use crate::graphics::{Bitmap, SCENE_SIZE};

const LCD_W: u16 = 240;
const LCD_H: u16 = 240;

/// Top left corner of the watchface scene, centred on the panel
const SCENE_ORIGIN: Point = Point::new(
    (LCD_W as i32 - SCENE_SIZE.width as i32) / 2,
    (LCD_H as i32 - SCENE_SIZE.height as i32) / 2,
);

type Lcd<'a, SPI> = mipidsi::Display<
    SPIInterface<Spim<'a, SPI>, Output<'a, AnyPin>, Output<'a, AnyPin>>,
    ST7789,
    Output<'a, AnyPin>,
>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Error {
    /// The controller did not take the init sequence
    Init,
    /// Writing pixels failed
    Write,
}

/// ST7789 LCD showing 1-bit frames
pub struct Display<'a, SPI>
where
    SPI: spim::Instance,
{
    lcd: Lcd<'a, SPI>,
}

impl<'a, SPI> Display<'a, SPI>
where
    SPI: spim::Instance,
{
    /// Configure the display on boot and blank it
    pub fn init(
        spim: Spim<'a, SPI>,
        cs_pin: Output<'a, AnyPin>,
        dc_pin: Output<'a, AnyPin>,
        rst_pin: Output<'a, AnyPin>,
    ) -> Result<Self, Error> {
        let lcd = Builder::st7789(SPIInterface::new(spim, dc_pin, cs_pin))
            .with_display_size(LCD_W, LCD_H)
            .with_orientation(Orientation::Portrait(false))
            .init(&mut Delay, Some(rst_pin))
            .map_err(|_| Error::Init)?;

        let mut display = Self { lcd };
        display.clear()?;
        Ok(display)
    }

    /// Fill the whole panel with black
    pub fn clear(&mut self) -> Result<(), Error> {
        self.lcd.clear(Rgb565::BLACK).map_err(|_| Error::Write)
    }

    /// Push a rendered watchface frame to the middle of the panel
    pub fn show(&mut self, frame: &Bitmap) -> Result<(), Error> {
        let area = Rectangle::new(SCENE_ORIGIN, frame.size());
        let colors = frame.pixels().map(|color| match color {
            BinaryColor::On => Rgb565::WHITE,
            BinaryColor::Off => Rgb565::BLACK,
        });
        self.lcd
            .fill_contiguous(&area, colors)
            .map_err(|_| Error::Write)
    }
}
