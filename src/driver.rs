//! Driver abstraction for machine identity.
//!
//! A driver is whatever created the machine (a cloud API, a local
//! hypervisor, bare metal). From this crate's perspective it is read-only:
//! it supplies the machine name used for the remote hostname and the driver
//! name recorded as the `provider=<driver>` engine label.

use crate::config::MachineConfig;

/// Read-only machine identity supplied by the creating driver.
pub trait Driver: Send + Sync {
    /// Name of the machine, used as the remote hostname.
    fn machine_name(&self) -> &str;

    /// Name of the driver that created the machine.
    fn driver_name(&self) -> &str;
}

/// Driver backed by the machine section of a YAML profile.
#[derive(Debug, Clone)]
pub struct ProfileDriver {
    machine_name: String,
    driver_name: String,
}

impl ProfileDriver {
    pub fn new(machine: &MachineConfig) -> Self {
        Self {
            machine_name: machine.name.clone(),
            driver_name: machine.driver.clone(),
        }
    }
}

impl Driver for ProfileDriver {
    fn machine_name(&self) -> &str {
        &self.machine_name
    }

    fn driver_name(&self) -> &str {
        &self.driver_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_driver_exposes_machine_identity() {
        let machine = MachineConfig {
            name: "devbox".to_string(),
            driver: "virtualbox".to_string(),
        };
        let driver = ProfileDriver::new(&machine);
        assert_eq!(driver.machine_name(), "devbox");
        assert_eq!(driver.driver_name(), "virtualbox");
    }
}
