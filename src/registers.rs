//! The register layout of the BCM283x GPIO block.
//!
//! Four register families are used by this driver. Each family is a run of 32-bit registers
//! spaced 4 bytes apart, starting at a fixed offset from the GPIO base. The function-select family
//! packs a 3-bit field for each of 10 pins into every register (the top 2 bits are unused); the
//! set, clear and level families hold one bit for each of 32 pins.

/// Byte distance between consecutive registers of a family.
pub const REGISTER_STRIDE: usize = 4;

/// Offset of the GPIO block from the start of the peripheral address space.
pub const GPIO_OFFSET: usize = 0x0020_0000;

/// The largest pin count any platform may declare. Two set/clear/level registers cover 64 pins,
/// and the select registers for pins below 64 end before the set family begins.
pub const MAX_PINS: u32 = 64;

/// One of the register families used to drive a pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    /// Function select (`GPFSELn`). 3-bit field per pin, 10 pins per register.
    Select,
    /// Output set (`GPSETn`). Writing 1 to a bit drives that pin high.
    Set,
    /// Output clear (`GPCLRn`). Writing 1 to a bit drives that pin low.
    Clear,
    /// Pin level (`GPLEVn`). Read-only, reflects the live state of each pin.
    Level,
}

impl Family {
    /// Byte offset of the family's first register from the GPIO base.
    pub const fn offset(self) -> usize {
        match self {
            Family::Select => 0x0000,
            Family::Set => 0x001C,
            Family::Clear => 0x0028,
            Family::Level => 0x0034,
        }
    }

    /// How many pins share one register of this family.
    pub const fn pins_per_register(self) -> u32 {
        match self {
            Family::Select => 10,
            Family::Set | Family::Clear | Family::Level => 32,
        }
    }

    /// Width in bits of the field describing a single pin.
    pub const fn field_width(self) -> u32 {
        match self {
            Family::Select => 3,
            Family::Set | Family::Clear | Family::Level => 1,
        }
    }
}

/// Where a pin's field lives: the absolute register address, the register's index within its
/// family, and the bit position of the field's least significant bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    pub address: usize,
    pub index: u32,
    pub bit: u32,
}

/// Compute the location of `pin`'s field within `family`, for a GPIO block starting at `base`.
///
/// This is pure arithmetic and accepts any pin number. Validating the pin against the platform is
/// the caller's job; see [`Pin`].
///
/// ```
/// use bcmgpio::registers::{locate, Family};
///
/// let loc = locate(0x3F20_0000, Family::Select, 12);
/// assert_eq!(loc.index, 1);
/// assert_eq!(loc.bit, 6);
/// assert_eq!(loc.address, 0x3F20_0004);
/// ```
pub fn locate(base: usize, family: Family, pin: u32) -> Location {
    let index = pin / family.pins_per_register();
    let field = pin % family.pins_per_register();
    Location {
        address: base + family.offset() + index as usize * REGISTER_STRIDE,
        index,
        bit: field * family.field_width(),
    }
}

/// A pin number that has been checked against a platform's pin count. Only `config::Platform`
/// creates these, so any register address derived from a `Pin` is inside the mapped window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pin(pub(crate) u32);

impl Pin {
    /// The pin number.
    pub fn number(self) -> u32 {
        self.0
    }

    /// Bit position of this pin's field in `family`.
    pub fn bit(self, family: Family) -> u32 {
        locate(0, family, self.0).bit
    }

    /// Mask selecting this pin's field in a register of `family`.
    pub fn mask(self, family: Family) -> u32 {
        ((1u32 << family.field_width()) - 1) << self.bit(family)
    }
}

pub(crate) fn valid_pin(pin: u32, pin_count: u32) -> Result<Pin, u32> {
    if pin < pin_count.min(MAX_PINS) {
        Ok(Pin(pin))
    } else {
        Err(pin)
    }
}

/// A byte offset of a register from the start of the mapped GPIO window. These are created by
/// conversion from `Register` only, so that arbitrary offsets cannot be forged and handed to a
/// `RegisterWindow`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterAddress(pub(crate) usize);

impl From<RegisterAddress> for usize {
    fn from(addr: RegisterAddress) -> usize {
        addr.0
    }
}

/// The register holding a given pin's field in each family.
#[derive(Clone, Copy, Debug)]
pub enum Register {
    Select(Pin),
    Set(Pin),
    Clear(Pin),
    Level(Pin),
}

impl Register {
    pub fn family(self) -> Family {
        match self {
            Register::Select(_) => Family::Select,
            Register::Set(_) => Family::Set,
            Register::Clear(_) => Family::Clear,
            Register::Level(_) => Family::Level,
        }
    }

    pub fn pin(self) -> Pin {
        match self {
            Register::Select(p) | Register::Set(p) | Register::Clear(p) | Register::Level(p) => p,
        }
    }
}

impl From<Register> for RegisterAddress {
    fn from(reg: Register) -> RegisterAddress {
        RegisterAddress(locate(0, reg.family(), reg.pin().0).address)
    }
}
