/// Timing thresholds, defaults and identifiers for one motor.
///
/// Every value the firmware would otherwise hardcode lives here so an
/// application can retune a board without touching driver code. The
/// defaults match the reference hardware: a DRV8825 stepping a 200
/// step/rev motor with a 600-line (2400 count) encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Config {
    /// Identifier reported in every outbound message
    pub motor_id: u8,
    /// Commanded intervals at or below this are replaced by the default
    pub min_pulse_interval: u32,
    /// Commanded intervals at or above this are replaced by the default
    pub max_pulse_interval: u32,
    pub default_pulse_interval: u32,
    pub default_pulse_on_period: u32,
    /// Ramp length used when a ramped job requests 0 steps
    pub default_ramp_steps: u32,
    /// Starting-interval multiplier used when a ramped job requests 0
    pub default_ramp_scaler: u8,
    /// Encoder counts per revolution after 4x quadrature decoding
    pub encoder_ppr: i32,
    /// Period of the encoder velocity estimate, microseconds
    pub encoder_update_period_us: u32,
    /// Moving-average filtering of the angular velocity sample
    pub velocity_filter: bool,
    /// Native full steps per revolution of the attached motor
    pub steps_per_rev: u16,
    pub fault_poll_period_us: u32,
    pub status_period_us: u32,
    pub feedback_period_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            motor_id: 0x00,
            min_pulse_interval: 1_000,
            max_pulse_interval: 1_000_000,
            default_pulse_interval: 2_000,
            default_pulse_on_period: 500,
            default_ramp_steps: 50,
            default_ramp_scaler: 4,
            encoder_ppr: 2_400,
            encoder_update_period_us: 25_000,
            velocity_filter: true,
            steps_per_rev: 200,
            fault_poll_period_us: 100_000,
            status_period_us: 250_000,
            feedback_period_us: 10_000,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for [Config]
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the motor id echoed in every outbound message
    pub fn with_motor_id(mut self, motor_id: u8) -> Self {
        self.config.motor_id = motor_id;
        self
    }

    /// Set the accepted pulse-interval band, microseconds.
    ///
    /// Commanded intervals outside the open interval `(min, max)` are
    /// replaced by the default at job-arm time.
    pub fn with_pulse_interval_limits(mut self, min: u32, max: u32) -> Self {
        self.config.min_pulse_interval = min;
        self.config.max_pulse_interval = max;
        self
    }

    pub fn with_default_pulse_interval(mut self, interval_us: u32) -> Self {
        self.config.default_pulse_interval = interval_us;
        self
    }

    pub fn with_default_pulse_on_period(mut self, period_us: u32) -> Self {
        self.config.default_pulse_on_period = period_us;
        self
    }

    /// Set the ramp geometry used when a ramped job leaves the fields 0
    pub fn with_ramp_defaults(mut self, steps: u32, scaler: u8) -> Self {
        self.config.default_ramp_steps = steps;
        self.config.default_ramp_scaler = scaler;
        self
    }

    /// Set encoder counts per revolution (after 4x quadrature decoding)
    pub fn with_encoder_ppr(mut self, ppr: i32) -> Self {
        self.config.encoder_ppr = ppr;
        self
    }

    pub fn with_encoder_update_period(mut self, period_us: u32) -> Self {
        self.config.encoder_update_period_us = period_us;
        self
    }

    /// Enable or disable the 10-slot moving-average velocity filter
    pub fn with_velocity_filter(mut self, filter: bool) -> Self {
        self.config.velocity_filter = filter;
        self
    }

    pub fn with_steps_per_rev(mut self, steps: u16) -> Self {
        self.config.steps_per_rev = steps;
        self
    }

    /// Set the fault poll, status emit and feedback emit periods
    pub fn with_task_periods(mut self, fault_us: u32, status_us: u32, feedback_us: u32) -> Self {
        self.config.fault_poll_period_us = fault_us;
        self.config.status_period_us = status_us;
        self.config.feedback_period_us = feedback_us;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
