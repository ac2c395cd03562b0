//! SSD1306 status screen.

use core::fmt::Write;

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use heapless::String;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

use pad2hub::ble::PeripheralRecord;
use pad2hub::status::BridgeSnapshot;

/// Concrete 128x64 buffered driver over any I2C bus.
pub type Display<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// Initialise the panel and clear it.
pub fn init<I2C>(i2c: I2C) -> Display<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    let interface = I2CDisplayInterface::new(i2c);
    let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    let _ = display.init();
    display.clear_buffer();
    let _ = display.flush();
    display
}

fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::On)
        .build()
}

fn peripheral_line(tag: &str, record: &PeripheralRecord) -> String<32> {
    let mut line = String::new();
    if record.found {
        let _ = write!(line, "{} {} {}", tag, record.state, record.rssi);
    } else {
        let _ = write!(line, "{} {}", tag, record.state);
    }
    line
}

/// Render the whole snapshot:
///
/// ```text
/// pad2hub     ACTIVE
/// C connected -61
/// H connected -48
/// T+75 S-20 lights on
/// frames 1234
/// ```
pub fn draw_status<I2C>(display: &mut Display<I2C>, snapshot: &BridgeSnapshot)
where
    I2C: embedded_hal::i2c::I2c,
{
    display.clear_buffer();
    let style = text_style();

    let mut header: String<32> = String::new();
    let _ = write!(header, "pad2hub {:>10}", snapshot.state.label());
    let _ = Text::new(&header, Point::new(0, 10), style).draw(display);

    let line = peripheral_line("C", &snapshot.controller);
    let _ = Text::new(&line, Point::new(0, 22), style).draw(display);
    let line = peripheral_line("H", &snapshot.hub);
    let _ = Text::new(&line, Point::new(0, 34), style).draw(display);

    let mut detail: String<32> = String::new();
    match (snapshot.last_error, snapshot.last_command) {
        (Some(err), _) => {
            let _ = write!(detail, "{}", err);
        }
        (None, Some(cmd)) => {
            let _ = write!(detail, "T{:+} S{:+} {}", cmd.throttle, cmd.steering, cmd.lights);
        }
        (None, None) => {}
    }
    let _ = Text::new(&detail, Point::new(0, 46), style).draw(display);

    let mut counters: String<32> = String::new();
    let _ = write!(counters, "frames {}", snapshot.frames_sent);
    if snapshot.send_failures > 0 {
        let _ = write!(counters, " !{}", snapshot.send_failures);
    }
    let _ = Text::new(&counters, Point::new(0, 58), style).draw(display);

    let _ = display.flush();
}
