// Command-based actuator for the physical link.

use std::process::Command;
use tracing::{debug, warn};

/// Brings the physical link up and down.
///
/// Every operation wraps one opaque external command. The commands are
/// required to return promptly; `dial` and `hangup` are fire-and-forget
/// (exit status ignored), while `probe` reports "link up" on a zero exit
/// status.
pub trait LinkDriver: Send + Sync {
    fn dial(&self);
    fn hangup(&self);
    fn probe(&self) -> bool;
}

/// Runs the three configured shell commands through `/bin/sh -c`.
pub struct CommandDriver {
    dial_cmd: String,
    hangup_cmd: String,
    probe_cmd: String,
}

impl CommandDriver {
    pub fn new(
        dial_cmd: impl Into<String>,
        hangup_cmd: impl Into<String>,
        probe_cmd: impl Into<String>,
    ) -> Self {
        Self {
            dial_cmd: dial_cmd.into(),
            hangup_cmd: hangup_cmd.into(),
            probe_cmd: probe_cmd.into(),
        }
    }

    fn run(command: &str) -> Option<std::process::ExitStatus> {
        debug!(command, "running link command");
        match Command::new("/bin/sh").arg("-c").arg(command).status() {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(command, error = %e, "link command failed to run");
                None
            }
        }
    }
}

impl LinkDriver for CommandDriver {
    fn dial(&self) {
        Self::run(&self.dial_cmd);
    }

    fn hangup(&self) {
        Self::run(&self.hangup_cmd);
    }

    fn probe(&self) -> bool {
        Self::run(&self.probe_cmd).is_some_and(|status| status.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_zero_exit_means_up() {
        let driver = CommandDriver::new("true", "true", "exit 0");
        assert!(driver.probe());
    }

    #[test]
    fn test_probe_nonzero_exit_means_down() {
        let driver = CommandDriver::new("true", "true", "exit 3");
        assert!(!driver.probe());
    }

    #[test]
    fn test_dial_ignores_failing_command() {
        let driver = CommandDriver::new("exit 1", "exit 1", "exit 1");
        driver.dial();
        driver.hangup();
    }
}
