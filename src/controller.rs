//! Host dispatcher and main-loop body.
//!
//! [Controller] ties the motor, the scheduler and the framed host link
//! together. The application's main loop reduces to reading the
//! microsecond counter and calling [`poll`](Controller::poll).

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::codec::{CodecError, HostPort};
use crate::link::SerialLink;
use crate::protocol;
use crate::scheduler::Scheduler;
use crate::types::{Direction, Error, JobCommand, Microstep, Rejection};
use crate::Motor;

/// Scheduler slot polling the driver fault line
pub const FAULT_POLL_TASK: usize = 0;
/// Scheduler slot emitting MOTOR_STATUS
pub const STATUS_TASK: usize = 1;
/// Scheduler slot emitting MOTOR_FEEDBACK
pub const FEEDBACK_TASK: usize = 2;

/// Failures surfaced by [`Controller::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ControllerError<PinError, LinkError> {
    /// GPIO error from a driver control line
    Pin(PinError),
    /// Serial transport failure
    Link(LinkError),
}

/// One motor, one scheduler, one host port.
///
/// `poll` runs a single cooperative iteration in the mandated order:
/// pulse engine first (never gated by the scheduler), then the
/// housekeeping tasks, serial input last so a command takes effect at
/// most one iteration after it arrives.
pub struct Controller<L, STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT, D> {
    motor: Motor<STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT, D>,
    scheduler: Scheduler,
    host: HostPort<L>,
}

impl<L, STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT, D, E>
    Controller<L, STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT, D>
where
    L: SerialLink,
    STEP: OutputPin<Error = E>,
    DIR: OutputPin<Error = E>,
    SLP: OutputPin<Error = E>,
    RST: OutputPin<Error = E>,
    EN: OutputPin<Error = E>,
    M0: OutputPin<Error = E>,
    M1: OutputPin<Error = E>,
    M2: OutputPin<Error = E>,
    FLT: InputPin<Error = E>,
    D: DelayNs,
{
    /// Wire a motor to a host link. Task periods come from the motor's
    /// [Config](crate::Config).
    pub fn new(motor: Motor<STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT, D>, link: L) -> Self {
        let config = motor.config();
        let scheduler = Scheduler::new(&[
            config.fault_poll_period_us,
            config.status_period_us,
            config.feedback_period_us,
        ]);
        Controller {
            motor,
            scheduler,
            host: HostPort::new(link),
        }
    }

    /// Stamp the scheduler and enable the housekeeping tasks
    pub fn start(&mut self, now_us: u32) {
        self.scheduler.start(now_us);
        self.scheduler.enable_task(FAULT_POLL_TASK, now_us);
        self.scheduler.enable_task(STATUS_TASK, now_us);
        self.scheduler.enable_task(FEEDBACK_TASK, now_us);
    }

    /// Run one main-loop iteration
    pub fn poll(&mut self, now_us: u32) -> Result<(), ControllerError<E, L::Error>> {
        // Pulse engine before everything else: a slow task must never
        // delay a pending edge
        let job_done = match self.motor.update(now_us) {
            Ok(done) => done,
            Err(Error::Pin(e)) => return Err(ControllerError::Pin(e)),
            Err(Error::Rejected(_)) => false,
        };
        if job_done {
            let job_id = self.motor.status().job_id;
            self.send_job_complete(job_id)?;
            self.motor.reset_job_id();
        }

        self.scheduler.update(now_us);

        if self.scheduler.task_ready(FAULT_POLL_TASK) {
            let fault_edge = match self.motor.poll_fault() {
                Ok(edge) => edge,
                Err(Error::Pin(e)) => return Err(ControllerError::Pin(e)),
                Err(Error::Rejected(_)) => false,
            };
            if fault_edge {
                self.send_fault()?;
            }
        }

        if self.scheduler.task_ready(STATUS_TASK) {
            self.send_status()?;
        }

        if self.scheduler.task_ready(FEEDBACK_TASK) {
            self.send_feedback()?;
        }

        // Serial input last: command latency is bounded by one iteration
        let mut payload = [0u8; protocol::MAX_PAYLOAD_LEN];
        let received = self
            .host
            .poll_frame(&mut payload)
            .map_err(ControllerError::Link)?;
        if let Some(len) = received {
            self.handle_command(&payload[..len])?;
        }

        Ok(())
    }

    pub fn motor(&self) -> &Motor<STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT, D> {
        &self.motor
    }

    pub fn motor_mut(&mut self) -> &mut Motor<STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT, D> {
        &mut self.motor
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Release the motor and the link
    pub fn free(self) -> (Motor<STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT, D>, L) {
        (self.motor, self.host.free())
    }

    fn handle_command(&mut self, payload: &[u8]) -> Result<(), ControllerError<E, L::Error>> {
        let cmd = match payload.first() {
            Some(&cmd) => cmd,
            None => return Ok(()),
        };

        let mut cancelled_job = None;
        let result: Result<(), Error<E>> = match cmd {
            protocol::SEND_JOB => match parse_job(payload) {
                Some(command) => self.arm(command),
                None => Err(Rejection::BadJobCommand.into()),
            },
            protocol::SEND_JOB_WITH_RAMPING => match parse_job_with_ramping(payload) {
                Some(command) => self.arm(command),
                None => Err(Rejection::BadJobCommand.into()),
            },
            protocol::SEND_JOB_ALL_VARIABLES => match parse_job_all_variables(payload, false) {
                Some(command) => self.arm(command),
                None => Err(Rejection::BadJobCommand.into()),
            },
            protocol::SEND_JOB_ALL_VARIABLES_WITH_RAMPING => {
                match parse_job_all_variables(payload, true) {
                    Some(command) => self.arm(command),
                    None => Err(Rejection::BadJobCommand.into()),
                }
            }
            protocol::PAUSE_JOB => self.motor.pause_job(),
            protocol::RESUME_JOB => self.motor.resume_job(),
            protocol::CANCEL_JOB => self.motor.cancel_job().map(|job_id| {
                cancelled_job = Some(job_id);
            }),
            protocol::ENABLE_MOTOR => self.motor.enable(),
            protocol::DISABLE_MOTOR => self.motor.disable(),
            protocol::SLEEP_MOTOR => self.motor.sleep(),
            protocol::WAKE_MOTOR => self.motor.wake(),
            protocol::RESET_MOTOR => self.motor.reset(),
            _ => Err(Rejection::UnknownCommand.into()),
        };

        match result {
            Ok(()) => {
                if let Some(job_id) = cancelled_job {
                    self.send_job_cancelled(job_id)?;
                }
                Ok(())
            }
            Err(Error::Rejected(rejection)) => self.send_response(rejection.code(), cmd),
            Err(Error::Pin(e)) => Err(ControllerError::Pin(e)),
        }
    }

    fn arm(&mut self, command: JobCommand) -> Result<(), Error<E>> {
        if command.job_id == 0 {
            return Err(Rejection::BadJobCommand.into());
        }
        self.motor.set_command(command);
        self.motor.start_job()
    }

    fn send_status(&mut self) -> Result<(), ControllerError<E, L::Error>> {
        let status = self.motor.status();
        let mut payload = [0u8; protocol::MOTOR_STATUS_MESSAGE_LEN];
        payload[0] = protocol::MOTOR_STATUS_MESSAGE_ID;
        payload[1] = self.motor.config().motor_id;
        payload[2] = status.flags().bits();
        payload[3] = status.microstep.divisor();
        payload[4] = status.job_id;
        payload[5..9].copy_from_slice(&status.pulses_remaining.to_le_bytes());
        self.send(&payload)
    }

    fn send_feedback(&mut self) -> Result<(), ControllerError<E, L::Error>> {
        let encoder = *self.motor.encoder_status();
        let mut payload = [0u8; protocol::MOTOR_FEEDBACK_MESSAGE_LEN];
        payload[0] = protocol::MOTOR_FEEDBACK_MESSAGE_ID;
        payload[1] = self.motor.config().motor_id;
        payload[2..6].copy_from_slice(&encoder.count.to_le_bytes());
        payload[6..8].copy_from_slice(&(encoder.angle_count as u16).to_le_bytes());
        payload[8..12].copy_from_slice(&encoder.velocity_radians.to_le_bytes());
        self.send(&payload)
    }

    fn send_fault(&mut self) -> Result<(), ControllerError<E, L::Error>> {
        let payload = [
            protocol::MOTOR_FAULT_MESSAGE_ID,
            self.motor.config().motor_id,
        ];
        self.send(&payload)
    }

    fn send_response(&mut self, code: u8, cmd_echo: u8) -> Result<(), ControllerError<E, L::Error>> {
        let payload = [
            protocol::RESPONSE_MESSAGE_ID,
            code,
            self.motor.config().motor_id,
            cmd_echo,
            0,
        ];
        self.send(&payload)
    }

    fn send_job_complete(&mut self, job_id: u8) -> Result<(), ControllerError<E, L::Error>> {
        let payload = [
            protocol::JOB_COMPLETE_MESSAGE_ID,
            self.motor.config().motor_id,
            job_id,
        ];
        self.send(&payload)
    }

    fn send_job_cancelled(&mut self, job_id: u8) -> Result<(), ControllerError<E, L::Error>> {
        let payload = [
            protocol::JOB_CANCELLED_MESSAGE_ID,
            self.motor.config().motor_id,
            job_id,
        ];
        self.send(&payload)
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), ControllerError<E, L::Error>> {
        match self.host.send_frame(payload) {
            Ok(()) => Ok(()),
            Err(CodecError::Link(e)) => Err(ControllerError::Link(e)),
            // Outbound payloads are fixed-size and always fit a frame
            Err(CodecError::PayloadTooLong) => Ok(()),
        }
    }
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}

/// SEND_JOB: dir, microstep, job_id, pulses, interval, on-period
fn parse_job(payload: &[u8]) -> Option<JobCommand> {
    if payload.len() != protocol::SEND_JOB_LEN {
        return None;
    }
    Some(JobCommand {
        direction: Direction::from_bit(payload[1]),
        use_ramping: false,
        microstep: Microstep::from_divisor(payload[2]),
        job_id: payload[3],
        ramping_steps: 0,
        ramp_scaler: 0,
        pulses: le_u32(&payload[4..]),
        pulse_interval: le_u32(&payload[8..]),
        pulse_on_period: le_u32(&payload[12..]),
    })
}

/// SEND_JOB_WITH_RAMPING: SEND_JOB fields plus ramping_steps and scaler
fn parse_job_with_ramping(payload: &[u8]) -> Option<JobCommand> {
    if payload.len() != protocol::SEND_JOB_WITH_RAMPING_LEN {
        return None;
    }
    Some(JobCommand {
        direction: Direction::from_bit(payload[1]),
        use_ramping: true,
        microstep: Microstep::from_divisor(payload[2]),
        job_id: payload[3],
        pulses: le_u32(&payload[4..]),
        pulse_interval: le_u32(&payload[8..]),
        pulse_on_period: le_u32(&payload[12..]),
        ramping_steps: le_u32(&payload[16..]),
        ramp_scaler: payload[20],
    })
}

/// ALL_VARIABLES layout: every command field in record order; the
/// ramping flag comes from the command byte
fn parse_job_all_variables(payload: &[u8], use_ramping: bool) -> Option<JobCommand> {
    if payload.len() != protocol::SEND_JOB_ALL_VARIABLES_LEN {
        return None;
    }
    Some(JobCommand {
        direction: Direction::from_bit(payload[1]),
        use_ramping,
        microstep: Microstep::from_divisor(payload[2]),
        job_id: payload[3],
        ramp_scaler: payload[4],
        ramping_steps: le_u32(&payload[5..]),
        pulses: le_u32(&payload[9..]),
        pulse_interval: le_u32(&payload[13..]),
        pulse_on_period: le_u32(&payload[17..]),
    })
}
