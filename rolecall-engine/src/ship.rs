//! Ship systems mirrored from the host: sabotages, lights and doors.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::constants::ELECTRICAL_SWITCH_MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SystemType {
    Electrical,
    Reactor,
    Laboratory,
    LifeSupp,
    Comms,
    HeliSabotage,
    Doors,
    /// Pseudo-system whose updates carry the id of the system being sabotaged.
    Sabotage,
}

impl SystemType {
    pub const ALL: [Self; 8] = [
        Self::Electrical,
        Self::Reactor,
        Self::Laboratory,
        Self::LifeSupp,
        Self::Comms,
        Self::HeliSabotage,
        Self::Doors,
        Self::Sabotage,
    ];

    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Electrical => 7,
            Self::Reactor => 3,
            Self::Laboratory => 21,
            Self::LifeSupp => 8,
            Self::Comms => 14,
            Self::HeliSabotage => 28,
            Self::Doors => 16,
            Self::Sabotage => 17,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|system| system.code() == code)
    }

    /// Sabotages that end the round if left unrepaired.
    #[must_use]
    pub const fn is_critical(self) -> bool {
        matches!(
            self,
            Self::Reactor | Self::Laboratory | Self::LifeSupp | Self::HeliSabotage
        )
    }

    /// Systems a Fool may not touch.
    #[must_use]
    pub const fn is_fool_blocked(self) -> bool {
        matches!(
            self,
            Self::Reactor
                | Self::Laboratory
                | Self::HeliSabotage
                | Self::LifeSupp
                | Self::Comms
                | Self::Electrical
        )
    }

    /// Systems that can be placed into a sabotaged state.
    #[must_use]
    pub const fn is_sabotageable(self) -> bool {
        !matches!(self, Self::Doors | Self::Sabotage)
    }
}

/// The five light switches of the electrical panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SwitchSystem {
    pub expected_switches: u8,
    pub actual_switches: u8,
}

impl SwitchSystem {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.expected_switches != self.actual_switches
    }

    /// Flip switch `index`; indices above the panel width are ignored.
    pub fn flip(&mut self, index: u8) {
        if index <= ELECTRICAL_SWITCH_MAX {
            self.actual_switches ^= 1 << index;
        }
    }

    /// Knock the lights out by scrambling the expected pattern.
    pub fn sabotage(&mut self, pattern: u8) {
        let mask = (1u8 << (ELECTRICAL_SWITCH_MAX + 1)) - 1;
        let mut scrambled = pattern & mask;
        if scrambled == self.actual_switches {
            scrambled ^= 1;
        }
        self.expected_switches = scrambled;
    }

    pub fn fix(&mut self) {
        self.actual_switches = self.expected_switches;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipState {
    sabotaged: BTreeSet<SystemType>,
    closed_doors: BTreeSet<u8>,
    pub switches: SwitchSystem,
}

impl ShipState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_sabotaged(&self, system: SystemType) -> bool {
        match system {
            SystemType::Electrical => self.switches.is_active(),
            other => self.sabotaged.contains(&other),
        }
    }

    #[must_use]
    pub fn any_sabotage_active(&self) -> bool {
        self.switches.is_active() || !self.sabotaged.is_empty()
    }

    pub fn sabotage(&mut self, system: SystemType) {
        match system {
            SystemType::Electrical => self.switches.sabotage(0b1_0110),
            other if other.is_sabotageable() => {
                self.sabotaged.insert(other);
            }
            _ => {}
        }
    }

    pub fn repair(&mut self, system: SystemType) {
        match system {
            SystemType::Electrical => self.switches.fix(),
            other => {
                self.sabotaged.remove(&other);
            }
        }
    }

    pub fn close_door(&mut self, door: u8) {
        self.closed_doors.insert(door);
    }

    #[must_use]
    pub fn is_door_closed(&self, door: u8) -> bool {
        self.closed_doors.contains(&door)
    }

    /// Apply a host system update the way the host would.
    ///
    /// Electrical amounts flip a switch, door amounts open that door, the
    /// sabotage pseudo-system starts the sabotage named by `amount`, and any
    /// other update completes the repair of that system.
    pub fn apply_update(&mut self, system: SystemType, amount: u8) {
        match system {
            SystemType::Electrical => self.switches.flip(amount),
            SystemType::Doors => {
                self.closed_doors.remove(&amount);
            }
            SystemType::Sabotage => {
                if let Some(target) = SystemType::from_code(amount) {
                    self.sabotage(target);
                }
            }
            other => self.repair(other),
        }
    }
}
