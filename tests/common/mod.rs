//! Scripted device double shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use actuator_demos::error::DeviceError;
use actuator_demos::{ControlMode, DeviceHandle, DeviceOpener, GainSet, Telemetry};

/// Everything the devices were asked to do, in order.
#[derive(Debug, Default)]
pub struct Journal {
    pub opened: Vec<String>,
    pub closed: Vec<String>,
    pub commands: Vec<(String, ControlMode, f64)>,
    pub gains: Vec<(String, GainSet)>,
    pub activations: Vec<(String, u8)>,
    pub events: Vec<String>,
}

impl Journal {
    pub fn close_count(&self, port: &str) -> usize {
        self.closed.iter().filter(|p| p.as_str() == port).count()
    }

    pub fn commands_for(&self, port: &str) -> Vec<(ControlMode, f64)> {
        self.commands
            .iter()
            .filter(|(p, _, _)| p == port)
            .map(|(_, m, v)| (*m, *v))
            .collect()
    }

    pub fn gains_for(&self, port: &str) -> Vec<GainSet> {
        self.gains
            .iter()
            .filter(|(p, _)| p == port)
            .map(|(_, g)| *g)
            .collect()
    }
}

pub type SharedJournal = Rc<RefCell<Journal>>;

/// Behavior of one port.
#[derive(Debug, Clone, Default)]
pub struct PortScript {
    /// Angles returned by successive reads; the last one repeats.
    pub angles: Vec<i32>,
    /// Read indices (0 is the read made at open) that fail.
    pub failing_reads: Vec<usize>,
    /// Every read from this index on fails.
    pub fail_reads_from: Option<usize>,
    /// Read index that panics.
    pub panic_on_read: Option<usize>,
    /// Read index that raises the interrupt flag.
    pub interrupt_on_read: Option<(usize, &'static AtomicBool)>,
    /// Reject every gain change.
    pub fail_gains: bool,
    /// Refuse to open.
    pub fail_open: bool,
    /// Application type code reported.
    pub app_type: i32,
    /// Status polls until an activated bootloader reports active.
    pub bootloader_after_polls: Option<u32>,
}

impl PortScript {
    pub fn angles(angles: &[i32]) -> Self {
        Self {
            angles: angles.to_vec(),
            ..Self::default()
        }
    }
}

/// Opener over scripted ports.
pub struct ScriptedBus {
    pub journal: SharedJournal,
    scripts: HashMap<String, PortScript>,
}

impl ScriptedBus {
    pub fn new() -> Self {
        Self {
            journal: Rc::new(RefCell::new(Journal::default())),
            scripts: HashMap::new(),
        }
    }

    pub fn with_port(mut self, port: &str, script: PortScript) -> Self {
        self.scripts.insert(port.to_string(), script);
        self
    }
}

impl DeviceOpener for ScriptedBus {
    type Handle = ScriptedDevice;

    fn open(&mut self, port: &str, _baud_rate: u32) -> Result<ScriptedDevice, DeviceError> {
        let script = self.scripts.get(port).cloned().unwrap_or_default();
        if script.fail_open {
            return Err(DeviceError::Disconnected);
        }
        {
            let mut journal = self.journal.borrow_mut();
            journal.opened.push(port.to_string());
            journal.events.push(format!("open {}", port));
        }
        Ok(ScriptedDevice {
            port: port.to_string(),
            script,
            reads: 0,
            polls: 0,
            activated: false,
            journal: Rc::clone(&self.journal),
        })
    }
}

pub struct ScriptedDevice {
    port: String,
    script: PortScript,
    reads: usize,
    polls: u32,
    activated: bool,
    journal: SharedJournal,
}

impl ScriptedDevice {
    fn log(&self, event: String) {
        self.journal.borrow_mut().events.push(event);
    }
}

impl DeviceHandle for ScriptedDevice {
    fn app_type(&mut self) -> Result<i32, DeviceError> {
        Ok(self.script.app_type)
    }

    fn read(&mut self) -> Result<Telemetry, DeviceError> {
        let index = self.reads;
        self.reads += 1;

        if self.script.panic_on_read == Some(index) {
            panic!("scripted panic on read {}", index);
        }
        if let Some((at, flag)) = self.script.interrupt_on_read {
            if at == index {
                flag.store(true, Ordering::Relaxed);
            }
        }
        let failing = self.script.failing_reads.contains(&index)
            || self.script.fail_reads_from.map_or(false, |from| index >= from);
        if failing {
            return Err(DeviceError::Timeout);
        }

        let angle = self
            .script
            .angles
            .get(index)
            .or_else(|| self.script.angles.last())
            .copied()
            .unwrap_or(0);
        Ok(Telemetry {
            motor_angle: angle,
            ..Telemetry::default()
        })
    }

    fn send_command(&mut self, mode: ControlMode, value: f64) -> Result<(), DeviceError> {
        self.log(format!("command {} {}", self.port, mode));
        self.journal
            .borrow_mut()
            .commands
            .push((self.port.clone(), mode, value));
        Ok(())
    }

    fn set_gains(&mut self, gains: &GainSet) -> Result<(), DeviceError> {
        if self.script.fail_gains {
            return Err(DeviceError::Timeout);
        }
        self.log(format!("gains {} {}", self.port, gains.proportional));
        self.journal.borrow_mut().gains.push((self.port.clone(), *gains));
        Ok(())
    }

    fn activate_bootloader(&mut self, target_id: u8) -> Result<(), DeviceError> {
        self.journal
            .borrow_mut()
            .activations
            .push((self.port.clone(), target_id));
        self.activated = true;
        Ok(())
    }

    fn is_bootloader_active(&mut self) -> Result<bool, DeviceError> {
        if !self.activated {
            return Ok(false);
        }
        self.polls += 1;
        Ok(self
            .script
            .bootloader_after_polls
            .map_or(false, |after| self.polls >= after))
    }

    fn find_poles(&mut self) -> Result<(), DeviceError> {
        self.log(format!("find_poles {}", self.port));
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.log(format!("close {}", self.port));
        self.journal.borrow_mut().closed.push(self.port.clone());
        Ok(())
    }
}

/// Run `kind` on `bus` with zero-time ticks and automatic confirmation.
pub fn run_demo<O: DeviceOpener>(
    bus: &mut O,
    kind: actuator_demos::DemoKind,
    params: &str,
) -> actuator_demos::Result<actuator_demos::DemoReport> {
    let params = actuator_demos::parse_parameters(params)?;
    let mut delay = embedded_hal_mock::eh1::delay::NoopDelay::new();
    let mut operator = actuator_demos::AutoConfirm;
    actuator_demos::DemoRunner::new(bus, &mut delay, &mut operator).run(kind, params)
}
