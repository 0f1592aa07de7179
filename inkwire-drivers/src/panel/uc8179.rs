//! UC8179 e-paper controller (7.5" 800×480, 4-gray mode)
//!
//! The controller has two 1-bit RAM planes. In 4-gray mode the pair of bits
//! a pixel has across the planes selects its gray level:
//!
//! | level | gray       | `0x10` (old) | `0x13` (new) |
//! |-------|------------|--------------|--------------|
//! | 3     | white      | 0            | 0            |
//! | 2     | light gray | 1            | 0            |
//! | 1     | dark gray  | 0            | 1            |
//! | 0     | black      | 1            | 1            |
//!
//! # Wiring
//!
//! SPI mode 0 with chip select handled by the [`SpiDevice`], plus DC
//! (low = command), RST (active low) and BUSY (low while busy).

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use inkwire_core::traits::{PanelDriver, PanelError};
use inkwire_protocol::frame::level_at;
use inkwire_protocol::{FRAME_SIZE, PANEL_HEIGHT, PANEL_WIDTH};

/// UC8179 command codes
pub mod cmd {
    /// Panel setting
    pub const PANEL_SETTING: u8 = 0x00;
    /// Power off
    pub const POWER_OFF: u8 = 0x02;
    /// Power on
    pub const POWER_ON: u8 = 0x04;
    /// Booster soft start
    pub const BOOSTER_SOFT_START: u8 = 0x06;
    /// Deep sleep (data 0xA5)
    pub const DEEP_SLEEP: u8 = 0x07;
    /// Write old-data RAM plane
    pub const DATA_START_OLD: u8 = 0x10;
    /// Display refresh
    pub const DISPLAY_REFRESH: u8 = 0x12;
    /// Write new-data RAM plane
    pub const DATA_START_NEW: u8 = 0x13;
    /// VCOM and data interval setting
    pub const VCOM_DATA_INTERVAL: u8 = 0x50;
    /// Resolution setting
    pub const RESOLUTION: u8 = 0x61;
    /// Get status; refreshes the BUSY line
    pub const GET_STATUS: u8 = 0x71;
    /// Cascade setting
    pub const CASCADE: u8 = 0xE0;
    /// Force temperature
    pub const FORCE_TEMPERATURE: u8 = 0xE5;
}

/// Deep sleep check code
const DEEP_SLEEP_CHECK: u8 = 0xA5;

/// Bytes in one row of a 1-bit plane
const PLANE_ROW_BYTES: usize = PANEL_WIDTH / 8;

/// UC8179 driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Uc8179Config {
    /// Give up on BUSY after this long (ms); a full 4-gray refresh takes
    /// several seconds
    pub busy_timeout_ms: u32,
    /// Interval between BUSY polls (ms)
    pub busy_poll_ms: u32,
}

impl Default for Uc8179Config {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 30_000,
            busy_poll_ms: 10,
        }
    }
}

/// Plane bit for `level` in the old (`0x10`) and new (`0x13`) planes
fn plane_bits(level: u8) -> (u8, u8) {
    match level {
        3 => (0, 0),
        2 => (1, 0),
        1 => (0, 1),
        _ => (1, 1),
    }
}

/// Build one byte of the old or new plane from eight packed pixels
fn plane_byte(frame: &[u8], first_pixel: usize, new_plane: bool) -> u8 {
    (0..8).fold(0u8, |byte, k| {
        let (old, new) = plane_bits(level_at(frame, first_pixel + k));
        let bit = if new_plane { new } else { old };
        byte | (bit << (7 - k))
    })
}

/// UC8179 panel driver
pub struct Uc8179<SPI, DC, RST, BUSY, D> {
    spi: SPI,
    dc: DC,
    rst: RST,
    busy: BUSY,
    delay: D,
    config: Uc8179Config,
}

impl<SPI, DC, RST, BUSY, D> Uc8179<SPI, DC, RST, BUSY, D>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    D: DelayNs,
{
    /// Create a driver; the panel is not touched until [`PanelDriver::init`]
    pub fn new(spi: SPI, dc: DC, rst: RST, busy: BUSY, delay: D, config: Uc8179Config) -> Self {
        Self {
            spi,
            dc,
            rst,
            busy,
            delay,
            config,
        }
    }

    /// Release the bus and pins
    pub fn release(self) -> (SPI, DC, RST, BUSY, D) {
        (self.spi, self.dc, self.rst, self.busy, self.delay)
    }

    fn reset(&mut self) -> Result<(), PanelError> {
        self.rst.set_high().map_err(|_| PanelError::Pin)?;
        self.delay.delay_ms(20);
        self.rst.set_low().map_err(|_| PanelError::Pin)?;
        self.delay.delay_ms(2);
        self.rst.set_high().map_err(|_| PanelError::Pin)?;
        self.delay.delay_ms(20);
        Ok(())
    }

    fn command(&mut self, command: u8) -> Result<(), PanelError> {
        self.dc.set_low().map_err(|_| PanelError::Pin)?;
        self.spi.write(&[command]).map_err(|_| PanelError::Bus)
    }

    fn data(&mut self, data: &[u8]) -> Result<(), PanelError> {
        self.dc.set_high().map_err(|_| PanelError::Pin)?;
        self.spi.write(data).map_err(|_| PanelError::Bus)
    }

    fn command_with_data(&mut self, command: u8, data: &[u8]) -> Result<(), PanelError> {
        self.command(command)?;
        self.data(data)
    }

    /// Wait for BUSY to go high, polling the controller status
    fn wait_idle(&mut self) -> Result<(), PanelError> {
        let mut waited_ms = 0u32;
        loop {
            self.command(cmd::GET_STATUS)?;
            if self.busy.is_high().map_err(|_| PanelError::Pin)? {
                break;
            }
            if waited_ms >= self.config.busy_timeout_ms {
                return Err(PanelError::BusyTimeout);
            }
            self.delay.delay_ms(self.config.busy_poll_ms);
            waited_ms = waited_ms.saturating_add(self.config.busy_poll_ms.max(1));
        }
        self.delay.delay_ms(20);
        Ok(())
    }

    fn write_plane(&mut self, command: u8, frame: &[u8], new_plane: bool) -> Result<(), PanelError> {
        self.command(command)?;
        let mut row = [0u8; PLANE_ROW_BYTES];
        for y in 0..PANEL_HEIGHT {
            for (x, byte) in row.iter_mut().enumerate() {
                *byte = plane_byte(frame, (y * PLANE_ROW_BYTES + x) * 8, new_plane);
            }
            self.data(&row)?;
        }
        Ok(())
    }
}

impl<SPI, DC, RST, BUSY, D> PanelDriver for Uc8179<SPI, DC, RST, BUSY, D>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    D: DelayNs,
{
    fn init(&mut self) -> Result<(), PanelError> {
        self.reset()?;

        self.command_with_data(cmd::PANEL_SETTING, &[0x1F])?;
        self.command_with_data(cmd::VCOM_DATA_INTERVAL, &[0x10, 0x07])?;
        self.command(cmd::POWER_ON)?;
        self.delay.delay_ms(100);
        self.wait_idle()?;

        self.command_with_data(cmd::BOOSTER_SOFT_START, &[0x27, 0x27, 0x18, 0x17])?;
        self.command_with_data(cmd::CASCADE, &[0x02])?;
        self.command_with_data(cmd::FORCE_TEMPERATURE, &[0x5F])?;

        let [_, _, w_hi, w_lo] = (PANEL_WIDTH as u32).to_be_bytes();
        let [_, _, h_hi, h_lo] = (PANEL_HEIGHT as u32).to_be_bytes();
        self.command_with_data(cmd::RESOLUTION, &[w_hi, w_lo, h_hi, h_lo])
    }

    fn display(&mut self, frame: &[u8]) -> Result<(), PanelError> {
        if frame.len() != FRAME_SIZE {
            return Err(PanelError::FrameSize);
        }

        self.write_plane(cmd::DATA_START_OLD, frame, false)?;
        self.write_plane(cmd::DATA_START_NEW, frame, true)?;

        self.command(cmd::DISPLAY_REFRESH)?;
        self.delay.delay_ms(100);
        self.wait_idle()
    }

    fn sleep(&mut self) -> Result<(), PanelError> {
        self.command_with_data(cmd::VCOM_DATA_INTERVAL, &[0xF7])?;
        self.command(cmd::POWER_OFF)?;
        self.wait_idle()?;
        self.command_with_data(cmd::DEEP_SLEEP, &[DEEP_SLEEP_CHECK])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType as PinErrorType;
    use embedded_hal::spi::{ErrorKind, ErrorType as SpiErrorType, Operation};
    use inkwire_protocol::frame::pack;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Commands seen on the bus, each with the data that followed it
    #[derive(Default)]
    struct Bus {
        dc_high: bool,
        commands: Vec<(u8, Vec<u8>)>,
        fail: bool,
    }

    type SharedBus = Rc<RefCell<Bus>>;

    struct MockSpi(SharedBus);

    impl SpiErrorType for MockSpi {
        type Error = ErrorKind;
    }

    impl SpiDevice for MockSpi {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), ErrorKind> {
            let mut bus = self.0.borrow_mut();
            if bus.fail {
                return Err(ErrorKind::Other);
            }
            for op in operations {
                if let Operation::Write(bytes) = op {
                    if bus.dc_high {
                        if let Some((_, data)) = bus.commands.last_mut() {
                            data.extend_from_slice(bytes);
                        }
                    } else {
                        for &b in bytes.iter() {
                            bus.commands.push((b, Vec::new()));
                        }
                    }
                }
            }
            Ok(())
        }
    }

    struct DcPin(SharedBus);

    impl PinErrorType for DcPin {
        type Error = Infallible;
    }

    impl OutputPin for DcPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().dc_high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().dc_high = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RstPin {
        levels: Vec<bool>,
    }

    impl PinErrorType for RstPin {
        type Error = Infallible;
    }

    impl OutputPin for RstPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.levels.push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.levels.push(true);
            Ok(())
        }
    }

    /// Reads busy (low) `busy_reads` times, then idle
    struct BusyPin {
        busy_reads: usize,
    }

    impl PinErrorType for BusyPin {
        type Error = Infallible;
    }

    impl InputPin for BusyPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            if self.busy_reads > 0 {
                self.busy_reads -= 1;
                return Ok(false);
            }
            Ok(true)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    type TestPanel = Uc8179<MockSpi, DcPin, RstPin, BusyPin, NoDelay>;

    fn panel(busy_reads: usize) -> (TestPanel, SharedBus) {
        let bus = SharedBus::default();
        let panel = Uc8179::new(
            MockSpi(bus.clone()),
            DcPin(bus.clone()),
            RstPin::default(),
            BusyPin { busy_reads },
            NoDelay,
            Uc8179Config::default(),
        );
        (panel, bus)
    }

    fn command_codes(bus: &SharedBus) -> Vec<u8> {
        bus.borrow()
            .commands
            .iter()
            .map(|(c, _)| *c)
            .filter(|&c| c != cmd::GET_STATUS)
            .collect()
    }

    fn data_for(bus: &SharedBus, command: u8) -> Vec<u8> {
        bus.borrow()
            .commands
            .iter()
            .find(|(c, _)| *c == command)
            .map(|(_, d)| d.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_plane_bits() {
        assert_eq!(plane_bits(3), (0, 0));
        assert_eq!(plane_bits(2), (1, 0));
        assert_eq!(plane_bits(1), (0, 1));
        assert_eq!(plane_bits(0), (1, 1));
    }

    #[test]
    fn test_plane_byte_msb_first() {
        // Pixels: 0 1 2 3 3 3 3 3
        let frame = [pack([0, 1, 2, 3]), pack([3, 3, 3, 3])];
        assert_eq!(plane_byte(&frame, 0, false), 0b1010_0000);
        assert_eq!(plane_byte(&frame, 0, true), 0b1100_0000);
    }

    #[test]
    fn test_init_sequence() {
        let (mut panel, bus) = panel(2);
        panel.init().unwrap();

        assert_eq!(
            command_codes(&bus),
            [
                cmd::PANEL_SETTING,
                cmd::VCOM_DATA_INTERVAL,
                cmd::POWER_ON,
                cmd::BOOSTER_SOFT_START,
                cmd::CASCADE,
                cmd::FORCE_TEMPERATURE,
                cmd::RESOLUTION,
            ]
        );
        assert_eq!(data_for(&bus, cmd::RESOLUTION), [0x03, 0x20, 0x01, 0xE0]);

        let (_, _, rst, _, _) = panel.release();
        assert_eq!(rst.levels, [true, false, true]);
    }

    #[test]
    fn test_display_writes_both_planes() {
        let (mut panel, bus) = panel(0);
        let mut frame = vec![pack([3, 3, 3, 3]); FRAME_SIZE];
        frame[0] = pack([0, 0, 0, 0]);
        panel.display(&frame).unwrap();

        assert_eq!(
            command_codes(&bus),
            [cmd::DATA_START_OLD, cmd::DATA_START_NEW, cmd::DISPLAY_REFRESH]
        );

        let old = data_for(&bus, cmd::DATA_START_OLD);
        let new = data_for(&bus, cmd::DATA_START_NEW);
        assert_eq!(old.len(), FRAME_SIZE / 2);
        assert_eq!(new.len(), FRAME_SIZE / 2);
        // First four pixels black, rest white
        assert_eq!(old[0], 0xF0);
        assert_eq!(new[0], 0xF0);
        assert!(old[1..].iter().all(|&b| b == 0));
        assert!(new[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_display_rejects_wrong_size() {
        let (mut panel, bus) = panel(0);
        assert_eq!(panel.display(&[0; 10]), Err(PanelError::FrameSize));
        assert!(bus.borrow().commands.is_empty());
    }

    #[test]
    fn test_sleep_sequence() {
        let (mut panel, bus) = panel(1);
        panel.sleep().unwrap();

        assert_eq!(
            command_codes(&bus),
            [cmd::VCOM_DATA_INTERVAL, cmd::POWER_OFF, cmd::DEEP_SLEEP]
        );
        assert_eq!(data_for(&bus, cmd::DEEP_SLEEP), [DEEP_SLEEP_CHECK]);
    }

    #[test]
    fn test_busy_timeout() {
        let (mut panel, _bus) = panel(usize::MAX);
        assert_eq!(panel.sleep(), Err(PanelError::BusyTimeout));
    }

    #[test]
    fn test_bus_error() {
        let (mut panel, bus) = panel(0);
        bus.borrow_mut().fail = true;
        assert_eq!(panel.init(), Err(PanelError::Bus));
    }

    #[test]
    fn test_refresh_runs_full_sequence() {
        let (mut panel, bus) = panel(0);
        panel.refresh(&vec![0u8; FRAME_SIZE]).unwrap();

        let codes = command_codes(&bus);
        assert_eq!(codes.first(), Some(&cmd::PANEL_SETTING));
        assert_eq!(codes.last(), Some(&cmd::DEEP_SLEEP));
        assert!(codes.contains(&cmd::DISPLAY_REFRESH));
    }
}
