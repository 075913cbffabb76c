//! Wire-level constants for the host serial protocol.
//!
//! All multi-byte integers on the wire are little-endian; floats are
//! IEEE-754 binary32 little-endian.

// Framing
pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;
/// Reserved single-byte positive acknowledge. Not emitted by the dispatcher.
pub const ACK: u8 = 0x06;
/// Reserved single-byte negative acknowledge. Not emitted by the dispatcher.
pub const NAK: u8 = 0x15;

/// Frame bytes that are not payload: STX, LEN and the trailing ETX.
pub const FRAME_OVERHEAD: usize = 3;
/// STX + LEN.
pub const HEADER_LEN: usize = 2;
/// Serial receive buffer capacity; LEN must be strictly below this.
pub const BUFFER_LEN: usize = 256;
/// Largest payload that fits a single frame: LEN is a byte and counts
/// the three framing bytes.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize - FRAME_OVERHEAD;
/// How many bytes are scanned for an STX in a single decoder poll.
pub const SYNC_RETRIES: usize = 10;

// Host -> motor command bytes
pub const SEND_JOB: u8 = 0xEF;
pub const SEND_JOB_WITH_RAMPING: u8 = 0xEE;
pub const SEND_JOB_ALL_VARIABLES: u8 = 0xED;
pub const SEND_JOB_ALL_VARIABLES_WITH_RAMPING: u8 = 0xEC;
pub const PAUSE_JOB: u8 = 0xEB;
pub const RESUME_JOB: u8 = 0xEA;
pub const CANCEL_JOB: u8 = 0xE9;
pub const ENABLE_MOTOR: u8 = 0xE8;
pub const DISABLE_MOTOR: u8 = 0xE7;
pub const SLEEP_MOTOR: u8 = 0xE6;
pub const WAKE_MOTOR: u8 = 0xE5;
pub const RESET_MOTOR: u8 = 0xE4;

// Command payload lengths, command byte included
pub const SEND_JOB_LEN: usize = 16;
pub const SEND_JOB_WITH_RAMPING_LEN: usize = 21;
pub const SEND_JOB_ALL_VARIABLES_LEN: usize = 21;

// Motor -> host message ids
pub const MOTOR_STATUS_MESSAGE_ID: u8 = 0xFF;
pub const MOTOR_FEEDBACK_MESSAGE_ID: u8 = 0xFE;
pub const MOTOR_FAULT_MESSAGE_ID: u8 = 0xFD;
pub const RESPONSE_MESSAGE_ID: u8 = 0xFC;
pub const JOB_COMPLETE_MESSAGE_ID: u8 = 0xFA;
pub const JOB_CANCELLED_MESSAGE_ID: u8 = 0xF9;

// Outbound payload lengths, message id included
pub const MOTOR_STATUS_MESSAGE_LEN: usize = 9;
pub const MOTOR_FEEDBACK_MESSAGE_LEN: usize = 12;
pub const MOTOR_FAULT_MESSAGE_LEN: usize = 2;
pub const RESPONSE_MESSAGE_LEN: usize = 5;
pub const JOB_COMPLETE_MESSAGE_LEN: usize = 3;
pub const JOB_CANCELLED_MESSAGE_LEN: usize = 3;

// Response codes
pub const BAD_JOB_COMMAND_RESPONSE: u8 = 0xDF;
pub const MOTOR_BUSY_RESPONSE: u8 = 0xDE;
pub const UNKNOWN_MOTOR_COMMAND_RESPONSE: u8 = 0xDD;
pub const MOTOR_IN_FAULT_RESPONSE: u8 = 0xDC;
pub const MOTOR_IN_SLEEP_RESPONSE: u8 = 0xDB;
pub const MOTOR_PAUSED_RESPONSE: u8 = 0xDA;
pub const MOTOR_DISABLED_RESPONSE: u8 = 0xD9;
pub const NO_ACTIVE_JOB_RESPONSE: u8 = 0xD8;
pub const JOB_ALREADY_PAUSED_RESPONSE: u8 = 0xD7;
pub const JOB_ALREADY_RESUMED_RESPONSE: u8 = 0xD6;
pub const MOTOR_ALREADY_ENABLED_RESPONSE: u8 = 0xD5;
pub const MOTOR_ALREADY_DISABLED_RESPONSE: u8 = 0xD4;
pub const MOTOR_ALREADY_SLEEPING_RESPONSE: u8 = 0xD3;
pub const MOTOR_ALREADY_AWAKE_RESPONSE: u8 = 0xD2;
pub const SLEEP_WITH_ACTIVE_JOB_RESPONSE: u8 = 0xD1;
pub const WAKE_WITH_ACTIVE_JOB_RESPONSE: u8 = 0xD0;
