//! Platform-agnostic driver for DRV8825-class stepper drivers with ABZ
//! quadrature encoder feedback and a framed binary host protocol.
//!
//! The crate is the core of a single-motor firmware: a [Motor] that owns
//! the driver control lines and arbitrates host commands, a
//! [PulseEngine] that must be serviced on every main-loop pass, a
//! [QuadratureEncoder] fed from edge interrupts, a microsecond
//! [Scheduler] for the housekeeping cadences, and a [Controller] that
//! ties them to a host serial link. Time is injected: every periodic
//! entry point takes the current microsecond counter value, so nothing
//! here touches a clock, a heap or an OS.
//!
//! Pin I/O goes through `embedded-hal` 1.0 digital traits. The encoder
//! edge path ([`Motor::on_encoder_edge`]) is constant-time and safe to
//! call from interrupt context; an application shares the motor with
//! its ISR behind a critical-section mutex.

#![no_std]

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

pub mod types;
pub use types::*;
mod config;
pub use config::{Config, ConfigBuilder};
pub mod encoder;
pub use encoder::QuadratureEncoder;
pub mod pulse;
pub use pulse::PulseEngine;
pub mod scheduler;
pub use scheduler::Scheduler;
pub mod codec;
pub use codec::{encode_frame, CodecError, HostPort};
pub mod link;
pub use link::SerialLink;
pub mod protocol;
mod controller;
pub use controller::{Controller, ControllerError};

/// The DRV8825 control lines.
///
/// ENABLE and FAULT are active-low on the reference hardware; SLEEP and
/// RESET are active-high ("asserted" = awake / running). The fault line
/// is expected to be pulled up and read through an [InputPin].
pub struct ControlPins<STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT> {
    pub step: STEP,
    pub dir: DIR,
    pub sleep: SLP,
    pub reset: RST,
    pub enable: EN,
    pub m0: M0,
    pub m1: M1,
    pub m2: M2,
    pub fault: FLT,
}

/// Motor controller: owns the control lines, the status/command
/// records, the quadrature decoder and the pulse engine, and arbitrates
/// every host command against the current motor state.
pub struct Motor<STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT, D> {
    pins: ControlPins<STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT>,
    delay: D,
    config: Config,
    status: MotorStatus,
    command: JobCommand,
    encoder: QuadratureEncoder,
    pulse: PulseEngine,
}

impl<STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT, D, E> Motor<STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT, D>
where
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
    /// Take ownership of the control lines and drive them to safe boot
    /// levels: STEP/DIR/mode low, driver awake and out of reset,
    /// outputs disabled.
    pub fn new(
        mut pins: ControlPins<STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT>,
        delay: D,
        config: Config,
    ) -> Result<Self, Error<E>> {
        pins.step.set_low().map_err(Error::Pin)?;
        pins.dir.set_low().map_err(Error::Pin)?;
        pins.sleep.set_high().map_err(Error::Pin)?;
        pins.reset.set_high().map_err(Error::Pin)?;
        pins.m0.set_low().map_err(Error::Pin)?;
        pins.m1.set_low().map_err(Error::Pin)?;
        pins.m2.set_low().map_err(Error::Pin)?;
        // ENABLE is active-low; boot disabled to match the status record
        pins.enable.set_high().map_err(Error::Pin)?;

        let status = MotorStatus {
            pulse_interval: config.default_pulse_interval,
            ramp_pulse_interval: config.default_pulse_interval,
            pulse_on_period: config.default_pulse_on_period,
            ramp_up_interval: config.default_pulse_interval,
            ramp_down_interval: config.default_pulse_interval,
            ..MotorStatus::default()
        };

        let encoder = QuadratureEncoder::new(
            config.encoder_ppr,
            config.encoder_update_period_us,
            config.velocity_filter,
        );

        Ok(Motor {
            pins,
            delay,
            config,
            status,
            command: JobCommand::default(),
            encoder,
            pulse: PulseEngine::new(),
        })
    }

    /// Assert the enable line (active-low) and power the outputs
    pub fn enable(&mut self) -> Result<(), Error<E>> {
        if self.status.enabled {
            return Err(Rejection::AlreadyEnabled.into());
        }
        self.pins.enable.set_low().map_err(Error::Pin)?;
        self.status.enabled = true;
        Ok(())
    }

    /// Deassert the enable line and cut the outputs
    pub fn disable(&mut self) -> Result<(), Error<E>> {
        if !self.status.enabled {
            return Err(Rejection::AlreadyDisabled.into());
        }
        self.pins.enable.set_high().map_err(Error::Pin)?;
        self.status.enabled = false;
        Ok(())
    }

    /// Put the driver into its low-power sleep state.
    ///
    /// Refused while a job is running.
    pub fn sleep(&mut self) -> Result<(), Error<E>> {
        if self.status.sleep {
            return Err(Rejection::AlreadySleeping.into());
        }
        if self.status.running {
            return Err(Rejection::SleepWithActiveJob.into());
        }
        self.pins.sleep.set_low().map_err(Error::Pin)?;
        self.status.sleep = true;
        Ok(())
    }

    /// Wake the driver from sleep.
    ///
    /// Refused while a job is running.
    pub fn wake(&mut self) -> Result<(), Error<E>> {
        if !self.status.sleep {
            return Err(Rejection::AlreadyAwake.into());
        }
        if self.status.running {
            return Err(Rejection::WakeWithActiveJob.into());
        }
        self.pins.sleep.set_high().map_err(Error::Pin)?;
        self.status.sleep = false;
        Ok(())
    }

    /// Pulse the reset line low for at least 1 ms.
    ///
    /// This is the one intentionally blocking operation in the crate.
    pub fn reset(&mut self) -> Result<(), Error<E>> {
        self.pins.reset.set_low().map_err(Error::Pin)?;
        self.delay.delay_ms(1);
        self.pins.reset.set_high().map_err(Error::Pin)?;
        Ok(())
    }

    /// Live-read the driver fault line (active-low)
    pub fn fault_line_active(&mut self) -> Result<bool, Error<E>> {
        self.pins.fault.is_low().map_err(Error::Pin)
    }

    /// Refresh the fault bit from the fault line.
    ///
    /// Returns true on the inactive-to-active edge, which is when a
    /// MOTOR_FAULT message is due. A fault does not cancel a running
    /// job; the pulse gate simply stops firing until the line clears.
    pub fn poll_fault(&mut self) -> Result<bool, Error<E>> {
        let was_faulted = self.status.fault;
        let faulted = self.fault_line_active()?;
        self.status.fault = faulted;
        Ok(faulted && !was_faulted)
    }

    /// Stage a host job request. The record is consumed and cleared by
    /// [`start_job`](Motor::start_job).
    pub fn set_command(&mut self, command: JobCommand) {
        self.command = command;
    }

    pub fn command(&self) -> &JobCommand {
        &self.command
    }

    /// Arm the staged job.
    ///
    /// A live fault on the driver refuses the job and puts the driver
    /// through the recovery sequence (sleep, disable, reset). Otherwise
    /// the job is refused unless the motor is idle, awake, enabled and
    /// unpaused. On success the command record is copied into the
    /// status record, the ramp geometry is computed, the pulse engine
    /// is cleared and the direction/microstep lines are driven.
    pub fn start_job(&mut self) -> Result<(), Error<E>> {
        if self.fault_line_active()? {
            self.status.fault = true;
            self.status.running = false;
            self.force_sleep()?;
            self.force_disable()?;
            self.reset()?;
            return Err(Rejection::MotorInFault.into());
        }

        if self.status.job_id != 0 {
            return Err(Rejection::MotorBusy.into());
        }
        if self.status.sleep {
            return Err(Rejection::MotorInSleep.into());
        }
        if !self.status.enabled {
            return Err(Rejection::MotorDisabled.into());
        }
        if self.status.paused {
            return Err(Rejection::MotorPaused.into());
        }

        let command = self.command;
        if command.job_id == 0 {
            return Err(Rejection::BadJobCommand.into());
        }

        self.status.fault = false;
        self.status.running = true;
        self.status.direction = command.direction;
        self.status.use_ramping = command.use_ramping;
        self.status.microstep = command.microstep;
        self.status.job_id = command.job_id;
        self.status.paused = false;

        self.pulse.clear();

        match command.direction {
            Direction::Forward => self.pins.dir.set_high().map_err(Error::Pin)?,
            Direction::Reverse => self.pins.dir.set_low().map_err(Error::Pin)?,
        }
        self.pins.step.set_low().map_err(Error::Pin)?;
        self.apply_microstep(command.microstep)?;

        let interval = if command.pulse_interval > self.config.min_pulse_interval
            && command.pulse_interval < self.config.max_pulse_interval
        {
            command.pulse_interval
        } else {
            self.config.default_pulse_interval
        };
        let on_period = if command.pulse_on_period != 0 && command.pulse_on_period < interval {
            command.pulse_on_period
        } else {
            interval / 2
        };

        self.status.pulse_interval = interval;
        self.status.pulse_on_period = on_period;
        self.status.pulses_remaining = command.pulses;

        if command.use_ramping {
            let ramp_steps = if command.ramping_steps == 0 {
                self.config.default_ramp_steps
            } else {
                command.ramping_steps
            }
            .max(1);
            let scaler = if command.ramp_scaler == 0 {
                self.config.default_ramp_scaler
            } else {
                command.ramp_scaler
            };

            if ramp_steps.saturating_mul(2) < command.pulses {
                self.status.ramp_up_stop = command.pulses - ramp_steps;
                self.status.ramp_down_start = ramp_steps;
            } else {
                // Short job: acceleration and deceleration meet in the
                // middle and there is no cruise phase
                self.status.ramp_up_stop = command.pulses / 2;
                self.status.ramp_down_start = self.status.ramp_up_stop.saturating_sub(1);
            }

            self.status.ramp_up_interval = interval.saturating_mul(scaler as u32);
            self.status.ramp_down_interval = interval;
            self.status.ramp_interval_step =
                (self.status.ramp_up_interval - self.status.ramp_down_interval) / ramp_steps;
            self.status.ramp_pulse_interval = self.status.ramp_up_interval;
        } else {
            self.status.ramp_up_stop = 0;
            self.status.ramp_down_start = 0;
            self.status.ramp_up_interval = 0;
            self.status.ramp_down_interval = 0;
            self.status.ramp_interval_step = 0;
            self.status.ramp_pulse_interval = 0;
        }

        self.command = JobCommand::default();
        Ok(())
    }

    /// Freeze the pulse train of the running job
    pub fn pause_job(&mut self) -> Result<(), Error<E>> {
        if !self.status.running {
            return Err(Rejection::NoActiveJob.into());
        }
        if self.status.paused {
            return Err(Rejection::JobAlreadyPaused.into());
        }
        self.status.paused = true;
        Ok(())
    }

    /// Resume a paused job. The edge timestamps are cleared so the next
    /// rising edge fires immediately instead of after a stale hold.
    pub fn resume_job(&mut self) -> Result<(), Error<E>> {
        if !self.status.running {
            return Err(Rejection::NoActiveJob.into());
        }
        if !self.status.paused {
            return Err(Rejection::JobAlreadyResumed.into());
        }
        self.status.paused = false;
        self.pulse.clear();
        Ok(())
    }

    /// Abort the running job, forcing the STEP line low.
    ///
    /// Returns the cancelled job id for the JOB_CANCELLED message.
    pub fn cancel_job(&mut self) -> Result<u8, Error<E>> {
        if !self.status.running {
            return Err(Rejection::NoActiveJob.into());
        }
        let job_id = self.status.job_id;
        self.status.running = false;
        self.status.paused = false;
        self.status.pulses_remaining = 0;
        self.status.job_id = 0;
        self.pulse.clear();
        self.pins.step.set_low().map_err(Error::Pin)?;
        Ok(job_id)
    }

    /// Clear the job id once its JOB_COMPLETE has been reported
    pub fn reset_job_id(&mut self) {
        self.status.job_id = 0;
    }

    /// One main-loop pass: refresh the encoder velocity estimate (self
    /// paced) and advance the pulse engine.
    ///
    /// Returns true exactly once per job, when it completes.
    pub fn update(&mut self, now_us: u32) -> Result<bool, Error<E>> {
        self.encoder.update_velocity(now_us);
        self.pulse
            .update(now_us, &mut self.status, &mut self.pins.step)
            .map_err(Error::Pin)
    }

    /// Forward an encoder edge event to the decoder.
    ///
    /// Safe to call from interrupt context.
    pub fn on_encoder_edge(&mut self, a: bool, b: bool, z: bool) {
        self.encoder.on_edge(a, b, z);
    }

    pub fn status(&self) -> &MotorStatus {
        &self.status
    }

    /// The packed status byte as reported in MOTOR_STATUS frames
    pub fn status_flags(&self) -> StatusFlags {
        self.status.flags()
    }

    pub fn encoder(&self) -> &QuadratureEncoder {
        &self.encoder
    }

    pub fn encoder_status(&self) -> &EncoderStatus {
        self.encoder.status()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Release the control lines
    pub fn destroy(self) -> ControlPins<STEP, DIR, SLP, RST, EN, M0, M1, M2, FLT> {
        self.pins
    }

    // Fault recovery writes the pins without the idempotence guards
    fn force_sleep(&mut self) -> Result<(), Error<E>> {
        self.pins.sleep.set_low().map_err(Error::Pin)?;
        self.status.sleep = true;
        Ok(())
    }

    fn force_disable(&mut self) -> Result<(), Error<E>> {
        self.pins.enable.set_high().map_err(Error::Pin)?;
        self.status.enabled = false;
        Ok(())
    }

    fn apply_microstep(&mut self, microstep: Microstep) -> Result<(), Error<E>> {
        let (m0, m1, m2) = microstep.mode_levels();
        set_level(&mut self.pins.m0, m0)?;
        set_level(&mut self.pins.m1, m1)?;
        set_level(&mut self.pins.m2, m2)?;
        Ok(())
    }
}

fn set_level<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), Error<P::Error>> {
    if high {
        pin.set_high().map_err(Error::Pin)
    } else {
        pin.set_low().map_err(Error::Pin)
    }
}
