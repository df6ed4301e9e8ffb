//! Name tables for the FRC CAN identifier fields
//!
//! Device types and manufacturers are assigned by the FRC CAN device conventions.
//! The 10-bit API field is further split into a 6-bit API class and a 4-bit
//! API index.

const DEVICE_TYPES: [&str; 14] = [
    "Broadcast Messages",
    "Robot Controller",
    "Motor Controller",
    "Relay Controller",
    "Gyro Sensor",
    "Accelerometer",
    "Distance Sensor",
    "Encoder",
    "Power Distribution Module",
    "Pneumatics Controller",
    "Miscellaneous",
    "IO Breakout",
    "Servo Controller",
    "Color Sensor",
];

const MANUFACTURERS: [&str; 21] = [
    "Broadcast",
    "NI",
    "Luminary Micro",
    "DEKA",
    "CTRE",
    "REV Robotics",
    "Grapple",
    "MindSensors",
    "Team Use",
    "Kauai Labs",
    "Copperforge",
    "Playing With Fusion",
    "Studica",
    "The Thrifty Bot",
    "Redux Robotics",
    "AndyMark",
    "Vivid Hosting",
    "Vertos Robotics",
    "SWYFT Robotics",
    "Lumyn Labs",
    "Brushland Labs",
];

const RESERVED: &str = "Reserved";
const FIRMWARE_UPDATE: u8 = 31;

/// Name of a 5-bit device type
pub fn device_type_name(device_type: u8) -> &'static str {
    match device_type {
        FIRMWARE_UPDATE => "Firmware Update",
        t => DEVICE_TYPES.get(t as usize).copied().unwrap_or(RESERVED),
    }
}

/// Name of a manufacturer code
pub fn manufacturer_name(manufacturer: u8) -> &'static str {
    MANUFACTURERS
        .get(manufacturer as usize)
        .copied()
        .unwrap_or(RESERVED)
}

/// Reverse lookup of a device type name (case-insensitive).
///
/// "Reserved" is ambiguous and never resolves.
pub fn device_type_by_name(name: &str) -> Option<u8> {
    if name.eq_ignore_ascii_case("Firmware Update") {
        return Some(FIRMWARE_UPDATE);
    }
    DEVICE_TYPES
        .iter()
        .position(|n| n.eq_ignore_ascii_case(name))
        .map(|i| i as u8)
}

/// Reverse lookup of a manufacturer name (case-insensitive)
pub fn manufacturer_by_name(name: &str) -> Option<u8> {
    MANUFACTURERS
        .iter()
        .position(|n| n.eq_ignore_ascii_case(name))
        .map(|i| i as u8)
}

/// Upper 6 bits of the API field
pub fn api_class(api: u16) -> u8 {
    ((api >> 4) & 0x3F) as u8
}

/// Lower 4 bits of the API field
pub fn api_index(api: u16) -> u8 {
    (api & 0x0F) as u8
}

/// Name of a standard API class, if it has one
pub fn api_class_name(class: u8) -> Option<&'static str> {
    match class {
        0 => Some("Voltage Control Mode"),
        1 => Some("Speed Control Mode"),
        2 => Some("Voltage Compensation Mode"),
        3 => Some("Position Control Mode"),
        4 => Some("Current Control Mode"),
        5 => Some("Status"),
        6 => Some("Periodic Status"),
        7 => Some("Configuration"),
        8 => Some("Ack"),
        _ => None,
    }
}

/// Name of a standard API index, if it has one
pub fn api_index_name(index: u8) -> Option<&'static str> {
    match index {
        0 => Some("Enable Control"),
        1 => Some("Disable Control"),
        2 => Some("Set Setpoint"),
        3 => Some("P Constant"),
        4 => Some("I Constant"),
        5 => Some("D Constant"),
        6 => Some("Set Reference"),
        7 => Some("Trusted Enable"),
        8 => Some("Trusted Set No Ack"),
        10 => Some("Trusted Set Setpoint No Ack"),
        11 => Some("Set Setpoint No Ack"),
        _ => None,
    }
}
