//! Single-slot command mailbox polled by the robot's microcontroller.
//!
//! The slot holds at most one pending [`DeviceCommand`]. Writers overwrite
//! whatever is pending; a drain hands the pending command to exactly one
//! caller and leaves [`DeviceCommand::None`] behind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use utoipa::ToSchema;

/// An actuation instruction for the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DeviceCommand {
    None,
    LedOn,
    LedOff,
    ServoWave,
}

impl DeviceCommand {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => DeviceCommand::LedOn,
            2 => DeviceCommand::LedOff,
            3 => DeviceCommand::ServoWave,
            _ => DeviceCommand::None,
        }
    }

    /// The wire name the device firmware matches on.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCommand::None => "none",
            DeviceCommand::LedOn => "led_on",
            DeviceCommand::LedOff => "led_off",
            DeviceCommand::ServoWave => "servo_wave",
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The shared mailbox. Create one at startup and hand it out behind an `Arc`.
#[derive(Debug, Default)]
pub struct CommandSignal {
    slot: AtomicU8,
}

impl CommandSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the pending command. Last writer wins.
    pub fn set(&self, command: DeviceCommand) {
        self.slot.store(command as u8, Ordering::Release);
    }

    /// Takes the pending command, resetting the slot to `None`.
    ///
    /// The swap is a single atomic step, so when several pollers race only
    /// one of them receives a given command.
    pub fn drain(&self) -> DeviceCommand {
        DeviceCommand::from_u8(self.slot.swap(DeviceCommand::None as u8, Ordering::AcqRel))
    }

    /// Reads the pending command without consuming it.
    pub fn peek(&self) -> DeviceCommand {
        DeviceCommand::from_u8(self.slot.load(Ordering::Acquire))
    }
}
