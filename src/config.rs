//! Platform description and pin direction settings.

use crate::registers::{valid_pin, Pin, GPIO_OFFSET, MAX_PINS};

/// Size of the register window mapped for a session: one page.
pub const WINDOW_LEN: usize = 4096;

/// The two pin functions this driver can select.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Logic input.
    Input,
    /// Push-pull logic output.
    Output,
}

impl From<Direction> for u32 {
    /// The 3-bit function select code for the direction.
    fn from(dir: Direction) -> u32 {
        match dir {
            Direction::Input => 0b000,
            Direction::Output => 0b001,
        }
    }
}

/// How a function select field is written.
///
/// Each select register holds the fields of 10 pins. `Overwrite` stores only the new field and
/// zeroes every other field in that register, which turns its sibling pins into inputs.
/// `ReadModify` reads the register first and replaces only the target field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectWrite {
    Overwrite,
    ReadModify,
}

/// Describes the SoC a driver runs on: where its peripherals live, how many GPIO pins it has,
/// and how the select registers are written.
///
/// ```
/// use bcmgpio::config::{Platform, SelectWrite};
///
/// let platform = Platform::BCM2711.with_select_write(SelectWrite::ReadModify);
/// assert_eq!(platform.gpio_base(), 0xFE20_0000);
/// assert!(platform.pin(57).is_ok());
/// assert_eq!(platform.pin(58), Err(58));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Platform {
    peripheral_base: usize,
    pin_count: u32,
    select_write: SelectWrite,
}

impl Platform {
    /// BCM2835 (Raspberry Pi 1, Zero).
    pub const BCM2835: Platform = Platform::new(0x2000_0000);
    /// BCM2836 (Raspberry Pi 2).
    pub const BCM2836: Platform = Platform::new(0x3F00_0000);
    /// BCM2837 (Raspberry Pi 3).
    pub const BCM2837: Platform = Platform::new(0x3F00_0000);
    /// BCM2711 (Raspberry Pi 4), which has 58 GPIO pins.
    pub const BCM2711: Platform = Platform {
        pin_count: 58,
        ..Platform::new(0xFE00_0000)
    };

    /// A platform whose peripherals start at `peripheral_base`, with 54 GPIO pins and the
    /// overwriting select policy.
    pub const fn new(peripheral_base: usize) -> Self {
        Self {
            peripheral_base,
            pin_count: 54,
            select_write: SelectWrite::Overwrite,
        }
    }

    #[must_use]
    pub fn with_peripheral_base(mut self, peripheral_base: usize) -> Self {
        self.peripheral_base = peripheral_base;
        self
    }

    /// Set the number of GPIO pins. Clamped to `1..=64`.
    #[must_use]
    pub fn with_pin_count(mut self, pin_count: u32) -> Self {
        self.pin_count = pin_count.max(1).min(MAX_PINS);
        self
    }

    #[must_use]
    pub fn with_select_write(mut self, select_write: SelectWrite) -> Self {
        self.select_write = select_write;
        self
    }

    pub fn peripheral_base(&self) -> usize {
        self.peripheral_base
    }

    /// Physical address of the GPIO register block.
    pub fn gpio_base(&self) -> usize {
        self.peripheral_base + GPIO_OFFSET
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    pub fn select_write(&self) -> SelectWrite {
        self.select_write
    }

    pub fn window_len(&self) -> usize {
        WINDOW_LEN
    }

    /// Check `pin` against this platform's pin count. Returns the rejected number on failure.
    pub fn pin(&self, pin: u32) -> Result<Pin, u32> {
        valid_pin(pin, self.pin_count)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::BCM2837
    }
}
