use crate::protocol;

/// Error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error<PinError> {
    /// GPIO error from one of the driver control lines
    Pin(PinError),
    /// Command refused by the motor state machine
    Rejected(Rejection),
}

impl<E> From<Rejection> for Error<E> {
    fn from(value: Rejection) -> Self {
        Self::Rejected(value)
    }
}

/// Why a host command was refused.
///
/// Every variant maps to a distinct response code on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Rejection {
    /// Job parameters failed validation (e.g. job id 0)
    BadJobCommand,
    /// A job is already armed or running
    MotorBusy,
    /// Command byte not recognised
    UnknownCommand,
    /// The driver fault line is active
    MotorInFault,
    /// The driver is in sleep mode
    MotorInSleep,
    /// The active job is paused
    MotorPaused,
    /// The driver outputs are disabled
    MotorDisabled,
    /// Pause/resume/cancel with no job armed
    NoActiveJob,
    JobAlreadyPaused,
    JobAlreadyResumed,
    AlreadyEnabled,
    AlreadyDisabled,
    AlreadySleeping,
    AlreadyAwake,
    /// Sleep refused while a job is running
    SleepWithActiveJob,
    /// Wake refused while a job is running
    WakeWithActiveJob,
}

impl Rejection {
    /// The response code reported to the host for this rejection
    pub fn code(self) -> u8 {
        match self {
            Rejection::BadJobCommand => protocol::BAD_JOB_COMMAND_RESPONSE,
            Rejection::MotorBusy => protocol::MOTOR_BUSY_RESPONSE,
            Rejection::UnknownCommand => protocol::UNKNOWN_MOTOR_COMMAND_RESPONSE,
            Rejection::MotorInFault => protocol::MOTOR_IN_FAULT_RESPONSE,
            Rejection::MotorInSleep => protocol::MOTOR_IN_SLEEP_RESPONSE,
            Rejection::MotorPaused => protocol::MOTOR_PAUSED_RESPONSE,
            Rejection::MotorDisabled => protocol::MOTOR_DISABLED_RESPONSE,
            Rejection::NoActiveJob => protocol::NO_ACTIVE_JOB_RESPONSE,
            Rejection::JobAlreadyPaused => protocol::JOB_ALREADY_PAUSED_RESPONSE,
            Rejection::JobAlreadyResumed => protocol::JOB_ALREADY_RESUMED_RESPONSE,
            Rejection::AlreadyEnabled => protocol::MOTOR_ALREADY_ENABLED_RESPONSE,
            Rejection::AlreadyDisabled => protocol::MOTOR_ALREADY_DISABLED_RESPONSE,
            Rejection::AlreadySleeping => protocol::MOTOR_ALREADY_SLEEPING_RESPONSE,
            Rejection::AlreadyAwake => protocol::MOTOR_ALREADY_AWAKE_RESPONSE,
            Rejection::SleepWithActiveJob => protocol::SLEEP_WITH_ACTIVE_JOB_RESPONSE,
            Rejection::WakeWithActiveJob => protocol::WAKE_WITH_ACTIVE_JOB_RESPONSE,
        }
    }
}

/// Motor spin direction as seen on the DIR line and the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn from_bit(bit: u8) -> Self {
        if bit != 0 {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    pub fn bit(self) -> u8 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => 0,
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Reverse
    }
}

/// Step subdivision selected on the driver's three mode pins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Microstep {
    Full,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl Microstep {
    /// Decode a divisor byte from the wire.
    ///
    /// Any value outside {1, 2, 4, 8, 16, 32} resolves to full stepping.
    pub fn from_divisor(divisor: u8) -> Self {
        match divisor {
            2 => Microstep::Half,
            4 => Microstep::Quarter,
            8 => Microstep::Eighth,
            16 => Microstep::Sixteenth,
            32 => Microstep::ThirtySecond,
            _ => Microstep::Full,
        }
    }

    pub fn divisor(self) -> u8 {
        match self {
            Microstep::Full => 1,
            Microstep::Half => 2,
            Microstep::Quarter => 4,
            Microstep::Eighth => 8,
            Microstep::Sixteenth => 16,
            Microstep::ThirtySecond => 32,
        }
    }

    /// Levels for the M0, M1 and M2 mode pins (true = high)
    pub fn mode_levels(self) -> (bool, bool, bool) {
        match self {
            Microstep::Full => (false, false, false),
            Microstep::Half => (true, false, false),
            Microstep::Quarter => (false, true, false),
            Microstep::Eighth => (true, true, false),
            Microstep::Sixteenth => (false, false, true),
            Microstep::ThirtySecond => (true, false, true),
        }
    }
}

impl Default for Microstep {
    fn default() -> Self {
        Microstep::Full
    }
}

bitflags::bitflags! {
    /// Packed status byte reported in MOTOR_STATUS frames.
    ///
    /// Bit 4 is reserved and always zero.
    pub struct StatusFlags: u8 {
        const DIRECTION = 1 << 0;
        const FAULT = 1 << 1;
        const PAUSED = 1 << 2;
        const RAMPING = 1 << 3;
        const ENABLED = 1 << 5;
        const RUNNING = 1 << 6;
        const SLEEP = 1 << 7;
    }
}

/// A host job request, as parsed off the wire.
///
/// Populated by the dispatcher and consumed (then cleared) when the job
/// is armed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct JobCommand {
    pub direction: Direction,
    pub use_ramping: bool,
    pub microstep: Microstep,
    /// Non-zero identifies a job; 0 is reserved for "no active job"
    pub job_id: u8,
    /// Ramp length in pulses; 0 selects the configured default
    pub ramping_steps: u32,
    /// Starting-interval multiplier; 0 selects the configured default
    pub ramp_scaler: u8,
    /// Total step pulses to emit
    pub pulses: u32,
    /// Microseconds between rising edges at full speed
    pub pulse_interval: u32,
    /// Microseconds the STEP line is held high
    pub pulse_on_period: u32,
}

/// Live motor state, mirrored to the host in MOTOR_STATUS frames
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct MotorStatus {
    pub running: bool,
    pub fault: bool,
    pub direction: Direction,
    pub enabled: bool,
    pub sleep: bool,
    pub paused: bool,
    pub use_ramping: bool,
    pub microstep: Microstep,
    pub job_id: u8,
    pub pulses_remaining: u32,
    pub pulse_interval: u32,
    pub pulse_on_period: u32,
    pub ramp_up_stop: u32,
    pub ramp_down_start: u32,
    pub ramp_up_interval: u32,
    pub ramp_down_interval: u32,
    pub ramp_interval_step: u32,
    pub ramp_pulse_interval: u32,
}

impl MotorStatus {
    /// Pack the seven status bits into the wire byte
    pub fn flags(&self) -> StatusFlags {
        let mut flags = StatusFlags::empty();
        flags.set(StatusFlags::DIRECTION, self.direction == Direction::Forward);
        flags.set(StatusFlags::FAULT, self.fault);
        flags.set(StatusFlags::PAUSED, self.paused);
        flags.set(StatusFlags::RAMPING, self.use_ramping);
        flags.set(StatusFlags::ENABLED, self.enabled);
        flags.set(StatusFlags::RUNNING, self.running);
        flags.set(StatusFlags::SLEEP, self.sleep);
        flags
    }
}

/// Decoded encoder state, mirrored to the host in MOTOR_FEEDBACK frames
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct EncoderStatus {
    pub direction: Direction,
    /// Free-running signed count; wraps in two's complement
    pub count: i32,
    /// Intra-revolution count, always within `[0, ppr)`
    pub angle_count: i32,
    /// Counts accumulated since the last velocity update
    pub delta: i32,
    /// Velocity in counts per second
    pub velocity_counts: f32,
    /// Angular sample in radians, filtered when the moving-average
    /// filter is enabled
    pub velocity_radians: f32,
    /// Illegal quadrature transitions observed since boot
    pub errors: u32,
}
