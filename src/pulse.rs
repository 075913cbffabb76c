use embedded_hal::digital::OutputPin;

use crate::types::MotorStatus;

/// Two-phase step-pulse state machine.
///
/// Each [`update`](PulseEngine::update) call advances at most one half
/// transition (LOW to HIGH or HIGH to LOW) against the injected
/// timestamp, so the main loop must drive it on every pass. The engine
/// owns nothing but its edge timestamps; the job being executed lives
/// in the [MotorStatus] record.
///
/// Interval arithmetic is `now.wrapping_sub(reference)` on `u32`
/// throughout, which stays correct across the microsecond counter
/// wrapping.
pub struct PulseEngine {
    output_high: bool,
    last_pulse_on_us: u32,
    last_pulse_off_us: u32,
}

impl PulseEngine {
    pub fn new() -> Self {
        PulseEngine {
            output_high: false,
            last_pulse_on_us: 0,
            last_pulse_off_us: 0,
        }
    }

    /// Zero the edge timestamps so the next rising edge fires on the
    /// next update. Called on job start, resume and cancel.
    pub fn clear(&mut self) {
        self.output_high = false;
        self.last_pulse_on_us = 0;
        self.last_pulse_off_us = 0;
    }

    pub fn output_high(&self) -> bool {
        self.output_high
    }

    /// Advance the pulse train.
    ///
    /// Returns `Ok(true)` exactly once per job: on the call where
    /// `pulses_remaining` reaches 0 (immediately, for a job armed with
    /// no pulses). A pending HIGH half-cycle is always terminated after
    /// `pulse_on_period`, even when paused, so pausing never holds the
    /// STEP line high.
    pub fn update<P: OutputPin>(
        &mut self,
        now_us: u32,
        status: &mut MotorStatus,
        step: &mut P,
    ) -> Result<bool, P::Error> {
        if !status.enabled || !status.running || status.fault {
            return Ok(false);
        }

        if self.output_high {
            if now_us.wrapping_sub(self.last_pulse_off_us) >= status.pulse_on_period {
                step.set_low()?;
                self.output_high = false;
                status.pulses_remaining = status.pulses_remaining.saturating_sub(1);

                if status.pulses_remaining == 0 {
                    status.running = false;
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        if status.paused {
            return Ok(false);
        }

        if status.pulses_remaining == 0 {
            status.running = false;
            return Ok(true);
        }

        let rise_interval = if status.use_ramping {
            status.ramp_pulse_interval
        } else {
            status.pulse_interval
        };

        if now_us.wrapping_sub(self.last_pulse_on_us) >= rise_interval {
            step.set_high()?;
            self.last_pulse_on_us = now_us;
            self.last_pulse_off_us = now_us;
            self.output_high = true;

            if status.use_ramping {
                if status.pulses_remaining > status.ramp_up_stop {
                    // Still accelerating
                    status.ramp_up_interval = status
                        .ramp_up_interval
                        .saturating_sub(status.ramp_interval_step);
                    status.ramp_pulse_interval = status.ramp_up_interval;
                } else if status.pulses_remaining < status.ramp_down_start {
                    // Decelerating
                    status.ramp_down_interval = status
                        .ramp_down_interval
                        .saturating_add(status.ramp_interval_step);
                    status.ramp_pulse_interval = status.ramp_down_interval;
                } else {
                    // Cruise
                    status.ramp_pulse_interval = status.pulse_interval;
                }
            }
        }

        Ok(false)
    }
}

impl Default for PulseEngine {
    fn default() -> Self {
        Self::new()
    }
}
