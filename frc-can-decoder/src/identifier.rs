//! 29-bit FRC CAN identifier codec
//!
//! Layout, most significant bit first:
//!
//! ```text
//!  28      24 23             16 15                6 5          0
//! +----------+-----------------+------------------+------------+
//! | dev type |  manufacturer   |       api        | dev number |
//! |  5 bits  |     8 bits      |     10 bits      |   6 bits   |
//! +----------+-----------------+------------------+------------+
//! ```

use crate::types::{DecoderError, GlobalAddress, Result};

/// Largest value that fits in an extended CAN identifier
pub const MAX_IDENTIFIER: u32 = 0x1FFF_FFFF;

/// Largest API code
pub const MAX_API: u16 = 0x3FF;

const DEVICE_TYPE_SHIFT: u32 = 24;
const MANUFACTURER_SHIFT: u32 = 16;
const API_SHIFT: u32 = 6;

/// Split an identifier into its global address and API code
pub fn decode(identifier: u32) -> Result<(GlobalAddress, u16)> {
    if identifier > MAX_IDENTIFIER {
        return Err(DecoderError::MalformedIdentifier(format!(
            "0x{:X} does not fit in 29 bits",
            identifier
        )));
    }

    let address = GlobalAddress {
        device_type: ((identifier >> DEVICE_TYPE_SHIFT) & 0x1F) as u8,
        manufacturer: ((identifier >> MANUFACTURER_SHIFT) & 0xFF) as u8,
        device_number: (identifier & 0x3F) as u8,
    };
    let api = ((identifier >> API_SHIFT) & 0x3FF) as u16;

    Ok((address, api))
}

/// Build an identifier from its parts (exact inverse of [`decode`])
pub fn encode(address: GlobalAddress, api: u16) -> Result<u32> {
    // Re-validate: the fields are public and may have been set directly
    let address = GlobalAddress::new(
        address.device_type,
        address.manufacturer,
        address.device_number,
    )?;
    if api > MAX_API {
        return Err(DecoderError::InvalidField {
            field: "api",
            value: api as u32,
            max: MAX_API as u32,
        });
    }

    Ok(((address.device_type as u32) << DEVICE_TYPE_SHIFT)
        | ((address.manufacturer as u32) << MANUFACTURER_SHIFT)
        | ((api as u32) << API_SHIFT)
        | address.device_number as u32)
}
