#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::digital::{Mock as PinMock, State as PinState, Transaction as PinTransaction};

use drv8825::protocol::{ETX, STX};
use drv8825::{Config, ControlPins, Motor, SerialLink};

pub type MockMotor =
    Motor<PinMock, PinMock, PinMock, PinMock, PinMock, PinMock, PinMock, PinMock, PinMock, NoopDelay>;

/// Per-pin expectations appended after the boot-level writes
#[derive(Default)]
pub struct Expect {
    pub step: Vec<PinTransaction>,
    pub dir: Vec<PinTransaction>,
    pub sleep: Vec<PinTransaction>,
    pub reset: Vec<PinTransaction>,
    pub enable: Vec<PinTransaction>,
    pub m0: Vec<PinTransaction>,
    pub m1: Vec<PinTransaction>,
    pub m2: Vec<PinTransaction>,
    pub fault: Vec<PinTransaction>,
}

pub fn new_motor(expect: Expect) -> MockMotor {
    new_motor_with_config(expect, Config::default())
}

pub fn new_motor_with_config(expect: Expect, config: Config) -> MockMotor {
    let boot = |level: PinState, extra: &[PinTransaction]| {
        let mut transactions = vec![PinTransaction::set(level)];
        transactions.extend_from_slice(extra);
        PinMock::new(&transactions)
    };

    let pins = ControlPins {
        step: boot(PinState::Low, &expect.step),
        dir: boot(PinState::Low, &expect.dir),
        sleep: boot(PinState::High, &expect.sleep),
        reset: boot(PinState::High, &expect.reset),
        enable: boot(PinState::High, &expect.enable),
        m0: boot(PinState::Low, &expect.m0),
        m1: boot(PinState::Low, &expect.m1),
        m2: boot(PinState::Low, &expect.m2),
        fault: PinMock::new(&expect.fault),
    };

    Motor::new(pins, NoopDelay::new(), config).unwrap()
}

/// Verify every pin expectation was consumed
pub fn finish(motor: MockMotor) {
    let mut pins = motor.destroy();
    pins.step.done();
    pins.dir.done();
    pins.sleep.done();
    pins.reset.done();
    pins.enable.done();
    pins.m0.done();
    pins.m1.done();
    pins.m2.done();
    pins.fault.done();
}

/// Expectations for a successful `start_job` with the given direction
/// and microstep mode levels
pub fn arm_expectations(expect: &mut Expect, forward: bool, modes: (bool, bool, bool)) {
    let level = |high| if high { PinState::High } else { PinState::Low };
    expect.fault.push(PinTransaction::get(PinState::High));
    expect.dir.push(PinTransaction::set(level(forward)));
    expect.step.push(PinTransaction::set(PinState::Low));
    expect.m0.push(PinTransaction::set(level(modes.0)));
    expect.m1.push(PinTransaction::set(level(modes.1)));
    expect.m2.push(PinTransaction::set(level(modes.2)));
}

/// Push `count` step pulses (rising then falling edge each)
pub fn pulse_expectations(expect: &mut Expect, count: usize) {
    for _ in 0..count {
        expect.step.push(PinTransaction::set(PinState::High));
        expect.step.push(PinTransaction::set(PinState::Low));
    }
}

#[derive(Default)]
struct SerialBuffers {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

/// In-memory serial transport.
///
/// Clones share the same buffers, so a test can keep one handle while
/// the controller owns another.
#[derive(Clone, Default)]
pub struct MockSerial {
    buffers: Rc<RefCell<SerialBuffers>>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes for the controller to read
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.buffers.borrow_mut().rx.extend(bytes);
    }

    /// Frame a payload and queue it
    pub fn push_frame(&self, payload: &[u8]) {
        self.push_bytes(&frame(payload));
    }

    pub fn pending_rx(&self) -> usize {
        self.buffers.borrow().rx.len()
    }

    /// Split everything the controller sent into frame payloads
    pub fn sent_payloads(&self) -> Vec<Vec<u8>> {
        let buffers = self.buffers.borrow();
        let tx = &buffers.tx;
        let mut payloads = Vec::new();
        let mut at = 0;
        while at + 2 < tx.len() {
            assert_eq!(tx[at], STX, "garbage between frames at {at}");
            let len = tx[at + 1] as usize;
            assert!(len >= 3 && at + len <= tx.len(), "truncated frame at {at}");
            assert_eq!(tx[at + len - 1], ETX, "missing ETX at {at}");
            payloads.push(tx[at + 2..at + len - 1].to_vec());
            at += len;
        }
        assert_eq!(at, tx.len(), "trailing bytes after last frame");
        payloads
    }

    pub fn clear_tx(&self) {
        self.buffers.borrow_mut().tx.clear();
    }
}

impl SerialLink for MockSerial {
    type Error = Infallible;

    fn available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.buffers.borrow().rx.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut buffers = self.buffers.borrow_mut();
        let mut read = 0;
        while read < buf.len() {
            match buffers.rx.pop_front() {
                Some(byte) => {
                    buf[read] = byte;
                    read += 1;
                }
                None => break,
            }
        }
        Ok(read)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.buffers.borrow_mut().tx.extend_from_slice(bytes);
        Ok(())
    }
}

/// Wrap a payload in STX-LEN-payload-ETX
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(payload.len() + 3);
    bytes.push(STX);
    bytes.push((payload.len() + 3) as u8);
    bytes.extend_from_slice(payload);
    bytes.push(ETX);
    bytes
}
