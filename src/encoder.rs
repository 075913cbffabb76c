use core::f32::consts::TAU;

use crate::types::{Direction, EncoderStatus};

/// Depth of the moving-average velocity filter
pub const MAF_FILTER_LENGTH: usize = 10;

/// Decoder for an ABZ incremental quadrature encoder.
///
/// Edge events are fed in from whatever observes the pins (normally a
/// pin-change interrupt) via [`on_edge`](QuadratureEncoder::on_edge);
/// the velocity estimate is refreshed from the main loop via
/// [`update_velocity`](QuadratureEncoder::update_velocity).
///
/// Transition decoding keeps a 4-bit window over the previous and
/// current A/B levels:
///
/// ```text
///                     _______         _______
///         PinA ______|       |_______|       |______ PinA
/// negative <-     _______         _______         __    -> positive
///         PinB __|       |_______|       |_______|   PinB
/// ```
///
/// Single-line changes count +1/-1; anything else (including a
/// double transition from a missed edge) only increments the error
/// counter.
pub struct QuadratureEncoder {
    status: EncoderStatus,
    ppr: i32,
    ppr_f: f32,
    update_period_us: u32,
    update_dt: f32,
    use_filter: bool,
    filter_buffer: [f32; MAF_FILTER_LENGTH],
    previous_window: u8,
    previous_z: bool,
    previous_count: i32,
    previous_update_us: u32,
}

impl QuadratureEncoder {
    /// `ppr` is counts per revolution after 4x quadrature decoding;
    /// `update_period_us` paces the velocity estimate.
    pub fn new(ppr: i32, update_period_us: u32, use_filter: bool) -> Self {
        let ppr = ppr.max(1);
        QuadratureEncoder {
            status: EncoderStatus {
                direction: Direction::Forward,
                ..EncoderStatus::default()
            },
            ppr,
            ppr_f: ppr as f32,
            update_period_us,
            update_dt: update_period_us as f32 * 1e-6,
            use_filter,
            filter_buffer: [0.0; MAF_FILTER_LENGTH],
            previous_window: 0,
            previous_z: false,
            previous_count: 0,
            previous_update_us: 0,
        }
    }

    /// Feed one A/B/Z edge event.
    ///
    /// Safe to call from interrupt context: constant-time, no
    /// allocation, touches only the encoder record.
    pub fn on_edge(&mut self, a: bool, b: bool, z: bool) {
        let mut window = (self.previous_window >> 2) & 0x03;
        window |= (a as u8) << 3;
        window |= (b as u8) << 2;

        match window {
            0b0001 | 0b0111 | 0b1000 | 0b1110 => {
                self.status.count = self.status.count.wrapping_add(1);
                self.status.angle_count += 1;
                self.status.direction = Direction::Forward;
                self.previous_window = window;

                // A rising Z marks the index position
                if z && !self.previous_z {
                    self.status.angle_count = 0;
                }
            }
            0b0010 | 0b0100 | 0b1011 | 0b1101 => {
                self.status.count = self.status.count.wrapping_sub(1);
                self.status.angle_count -= 1;
                self.status.direction = Direction::Reverse;
                self.previous_window = window;

                // Approached from below, the index sits one quadrature
                // cycle before the wrap point
                if z && !self.previous_z {
                    self.status.angle_count = self.ppr - 4;
                }
            }
            _ => {
                self.status.errors = self.status.errors.wrapping_add(1);
            }
        }

        self.previous_z = z;

        // Constrain the angle count to one revolution
        self.status.angle_count %= self.ppr;
        if self.status.angle_count < 0 {
            self.status.angle_count += self.ppr;
        }
    }

    /// Refresh the velocity estimate once per update period.
    ///
    /// Returns true when a new estimate was produced; otherwise the
    /// record is untouched. Main-loop only.
    pub fn update_velocity(&mut self, now_us: u32) -> bool {
        if now_us.wrapping_sub(self.previous_update_us) < self.update_period_us {
            return false;
        }

        let delta = self.status.count.wrapping_sub(self.previous_count);
        self.status.delta = delta;
        self.status.velocity_counts = delta as f32 / self.update_dt;

        let sample = (delta as f32 / self.ppr_f) * TAU;
        if self.use_filter {
            let mut sum = 0.0;
            for i in 1..MAF_FILTER_LENGTH {
                self.filter_buffer[i - 1] = self.filter_buffer[i];
                sum += self.filter_buffer[i - 1];
            }
            self.filter_buffer[MAF_FILTER_LENGTH - 1] = sample;
            self.status.velocity_radians = (sum + sample) / MAF_FILTER_LENGTH as f32;
        } else {
            self.status.velocity_radians = sample;
        }

        self.previous_count = self.status.count;
        self.previous_update_us = now_us;

        true
    }

    pub fn status(&self) -> &EncoderStatus {
        &self.status
    }

    pub fn count(&self) -> i32 {
        self.status.count
    }

    pub fn direction(&self) -> Direction {
        self.status.direction
    }

    pub fn angle_count(&self) -> i32 {
        self.status.angle_count
    }

    /// Intra-revolution angle in radians
    pub fn angle_radians(&self) -> f32 {
        (self.status.angle_count as f32 / self.ppr_f) * TAU
    }

    pub fn delta(&self) -> i32 {
        self.status.delta
    }

    pub fn velocity_counts(&self) -> f32 {
        self.status.velocity_counts
    }

    pub fn velocity_radians(&self) -> f32 {
        self.status.velocity_radians
    }

    pub fn error_count(&self) -> u32 {
        self.status.errors
    }
}
