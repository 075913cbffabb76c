mod common;

use common::{arm_expectations, finish, new_motor, pulse_expectations, Expect};
use embedded_hal_mock::eh1::digital::{State as PinState, Transaction as PinTransaction};

use drv8825::{Direction, Error, JobCommand, Microstep, Rejection, StatusFlags};

fn job(job_id: u8, pulses: u32, interval: u32, on_period: u32) -> JobCommand {
    JobCommand {
        direction: Direction::Forward,
        job_id,
        pulses,
        pulse_interval: interval,
        pulse_on_period: on_period,
        ..JobCommand::default()
    }
}

#[test]
fn boot_drives_safe_levels() {
    let motor = new_motor(Expect::default());
    assert!(!motor.status().enabled);
    assert!(!motor.status().sleep);
    assert!(!motor.status().running);
    assert_eq!(motor.status().job_id, 0);
    finish(motor);
}

#[test]
fn enable_is_guarded() {
    let mut expect = Expect::default();
    expect.enable.push(PinTransaction::set(PinState::Low));
    let mut motor = new_motor(expect);

    motor.enable().unwrap();
    assert!(motor.status().enabled);
    assert!(matches!(
        motor.enable(),
        Err(Error::Rejected(Rejection::AlreadyEnabled))
    ));
    finish(motor);
}

#[test]
fn disable_is_guarded() {
    let mut expect = Expect::default();
    expect.enable.push(PinTransaction::set(PinState::Low));
    expect.enable.push(PinTransaction::set(PinState::High));
    let mut motor = new_motor(expect);

    assert!(matches!(
        motor.disable(),
        Err(Error::Rejected(Rejection::AlreadyDisabled))
    ));
    motor.enable().unwrap();
    motor.disable().unwrap();
    assert!(!motor.status().enabled);
    finish(motor);
}

#[test]
fn sleep_and_wake_are_guarded() {
    let mut expect = Expect::default();
    expect.sleep.push(PinTransaction::set(PinState::Low));
    expect.sleep.push(PinTransaction::set(PinState::High));
    let mut motor = new_motor(expect);

    assert!(matches!(
        motor.wake(),
        Err(Error::Rejected(Rejection::AlreadyAwake))
    ));
    motor.sleep().unwrap();
    assert!(motor.status().sleep);
    assert!(matches!(
        motor.sleep(),
        Err(Error::Rejected(Rejection::AlreadySleeping))
    ));
    motor.wake().unwrap();
    assert!(!motor.status().sleep);
    finish(motor);
}

#[test]
fn reset_pulses_the_reset_line() {
    let mut expect = Expect::default();
    expect.reset.push(PinTransaction::set(PinState::Low));
    expect.reset.push(PinTransaction::set(PinState::High));
    let mut motor = new_motor(expect);
    motor.reset().unwrap();
    finish(motor);
}

#[test]
fn start_job_arms_the_status_record() {
    let mut expect = Expect::default();
    expect.enable.push(PinTransaction::set(PinState::Low));
    arm_expectations(&mut expect, true, (false, false, false));
    let mut motor = new_motor(expect);

    motor.enable().unwrap();
    motor.set_command(job(7, 250, 1_500, 300));
    motor.start_job().unwrap();

    let status = motor.status();
    assert!(status.running);
    assert!(!status.paused);
    assert_eq!(status.job_id, 7);
    assert_eq!(status.pulses_remaining, 250);
    assert_eq!(status.pulse_interval, 1_500);
    assert_eq!(status.pulse_on_period, 300);
    assert_eq!(status.direction, Direction::Forward);

    // The command record was consumed
    assert_eq!(motor.command().job_id, 0);
    finish(motor);
}

#[test]
fn start_job_replaces_out_of_range_intervals() {
    // (commanded interval, commanded on-period, armed interval, armed on)
    let cases = [
        (100, 50, 2_000, 50),
        (1_000, 400, 2_000, 400),
        (1_001, 400, 1_001, 400),
        (999_999, 400, 999_999, 400),
        (1_000_000, 400, 2_000, 400),
        (1_500, 0, 1_500, 750),
        (1_500, 1_500, 1_500, 750),
        (1_500, 2_000, 1_500, 750),
    ];

    for (interval, on_period, armed_interval, armed_on) in cases {
        let mut expect = Expect::default();
        expect.enable.push(PinTransaction::set(PinState::Low));
        arm_expectations(&mut expect, true, (false, false, false));
        let mut motor = new_motor(expect);

        motor.enable().unwrap();
        motor.set_command(job(1, 10, interval, on_period));
        motor.start_job().unwrap();

        assert_eq!(motor.status().pulse_interval, armed_interval, "interval {interval}");
        assert_eq!(motor.status().pulse_on_period, armed_on, "interval {interval}");
        finish(motor);
    }
}

#[test]
fn microstep_selection_drives_the_mode_pins() {
    let cases = [
        (1u8, (false, false, false), 1u8),
        (2, (true, false, false), 2),
        (4, (false, true, false), 4),
        (8, (true, true, false), 8),
        (16, (false, false, true), 16),
        (32, (true, false, true), 32),
        // Unknown divisors coerce to full stepping
        (7, (false, false, false), 1),
        (0, (false, false, false), 1),
    ];

    for (divisor, modes, stored) in cases {
        let mut expect = Expect::default();
        expect.enable.push(PinTransaction::set(PinState::Low));
        arm_expectations(&mut expect, true, modes);
        let mut motor = new_motor(expect);

        motor.enable().unwrap();
        let mut command = job(3, 10, 1_500, 300);
        command.microstep = Microstep::from_divisor(divisor);
        motor.set_command(command);
        motor.start_job().unwrap();

        assert_eq!(motor.status().microstep.divisor(), stored, "divisor {divisor}");
        finish(motor);
    }
}

#[test]
fn start_job_rejections_leave_state_alone() {
    // Sleeping
    let mut expect = Expect::default();
    expect.sleep.push(PinTransaction::set(PinState::Low));
    expect.fault.push(PinTransaction::get(PinState::High));
    let mut motor = new_motor(expect);
    motor.sleep().unwrap();
    motor.set_command(job(1, 10, 1_500, 300));
    assert!(matches!(
        motor.start_job(),
        Err(Error::Rejected(Rejection::MotorInSleep))
    ));
    assert!(!motor.status().running);
    finish(motor);

    // Disabled
    let mut expect = Expect::default();
    expect.fault.push(PinTransaction::get(PinState::High));
    let mut motor = new_motor(expect);
    motor.set_command(job(1, 10, 1_500, 300));
    assert!(matches!(
        motor.start_job(),
        Err(Error::Rejected(Rejection::MotorDisabled))
    ));
    finish(motor);

    // Busy: a second job while one is armed
    let mut expect = Expect::default();
    expect.enable.push(PinTransaction::set(PinState::Low));
    arm_expectations(&mut expect, true, (false, false, false));
    expect.fault.push(PinTransaction::get(PinState::High));
    let mut motor = new_motor(expect);
    motor.enable().unwrap();
    motor.set_command(job(1, 10, 1_500, 300));
    motor.start_job().unwrap();
    motor.set_command(job(2, 10, 1_500, 300));
    assert!(matches!(
        motor.start_job(),
        Err(Error::Rejected(Rejection::MotorBusy))
    ));
    assert_eq!(motor.status().job_id, 1);
    finish(motor);

    // Job id 0 is reserved
    let mut expect = Expect::default();
    expect.enable.push(PinTransaction::set(PinState::Low));
    expect.fault.push(PinTransaction::get(PinState::High));
    let mut motor = new_motor(expect);
    motor.enable().unwrap();
    motor.set_command(job(0, 10, 1_500, 300));
    assert!(matches!(
        motor.start_job(),
        Err(Error::Rejected(Rejection::BadJobCommand))
    ));
    finish(motor);
}

#[test]
fn fault_at_start_recovers_and_reports() {
    let mut expect = Expect::default();
    expect.enable.push(PinTransaction::set(PinState::Low));
    // Fault line reads active, then the recovery sequence runs:
    // sleep, disable, reset
    expect.fault.push(PinTransaction::get(PinState::Low));
    expect.sleep.push(PinTransaction::set(PinState::Low));
    expect.enable.push(PinTransaction::set(PinState::High));
    expect.reset.push(PinTransaction::set(PinState::Low));
    expect.reset.push(PinTransaction::set(PinState::High));
    let mut motor = new_motor(expect);

    motor.enable().unwrap();
    motor.set_command(job(4, 10, 1_500, 300));
    assert!(matches!(
        motor.start_job(),
        Err(Error::Rejected(Rejection::MotorInFault))
    ));

    let status = motor.status();
    assert!(status.fault);
    assert!(status.sleep);
    assert!(!status.enabled);
    assert!(!status.running);
    finish(motor);
}

#[test]
fn job_runs_to_completion_exactly_once() {
    let mut expect = Expect::default();
    expect.enable.push(PinTransaction::set(PinState::Low));
    arm_expectations(&mut expect, true, (false, false, false));
    pulse_expectations(&mut expect, 2);
    let mut motor = new_motor(expect);

    motor.enable().unwrap();
    motor.set_command(job(5, 2, 1_500, 300));
    motor.start_job().unwrap();

    assert!(!motor.update(1_500).unwrap());
    assert!(!motor.update(1_800).unwrap());
    assert!(!motor.update(3_000).unwrap());
    assert!(motor.update(3_300).unwrap());

    let status = motor.status();
    assert!(!status.running);
    assert_eq!(status.pulses_remaining, 0);
    // The id survives until the completion message has gone out
    assert_eq!(status.job_id, 5);
    motor.reset_job_id();
    assert_eq!(motor.status().job_id, 0);

    assert!(!motor.update(10_000).unwrap());
    finish(motor);
}

#[test]
fn pause_resume_and_cancel_flow() {
    let mut expect = Expect::default();
    expect.enable.push(PinTransaction::set(PinState::Low));
    arm_expectations(&mut expect, true, (false, false, false));
    pulse_expectations(&mut expect, 1);
    expect.step.push(PinTransaction::set(PinState::High));
    // Cancel forces the line low
    expect.step.push(PinTransaction::set(PinState::Low));
    let mut motor = new_motor(expect);

    assert!(matches!(
        motor.pause_job(),
        Err(Error::Rejected(Rejection::NoActiveJob))
    ));

    motor.enable().unwrap();
    motor.set_command(job(9, 10, 1_500, 300));
    motor.start_job().unwrap();

    assert!(matches!(
        motor.resume_job(),
        Err(Error::Rejected(Rejection::JobAlreadyResumed))
    ));

    motor.update(1_500).unwrap();
    motor.update(1_800).unwrap();
    assert_eq!(motor.status().pulses_remaining, 9);

    motor.pause_job().unwrap();
    assert!(motor.status().paused);
    assert!(matches!(
        motor.pause_job(),
        Err(Error::Rejected(Rejection::JobAlreadyPaused))
    ));

    // Sleep is refused while the (paused) job is active
    assert!(matches!(
        motor.sleep(),
        Err(Error::Rejected(Rejection::SleepWithActiveJob))
    ));

    // Frozen: no edges while paused
    assert!(!motor.update(100_000).unwrap());
    assert_eq!(motor.status().pulses_remaining, 9);

    motor.resume_job().unwrap();
    assert!(!motor.status().paused);
    motor.update(100_100).unwrap();

    let cancelled = motor.cancel_job().unwrap();
    assert_eq!(cancelled, 9);
    let status = motor.status();
    assert!(!status.running);
    assert_eq!(status.job_id, 0);
    assert_eq!(status.pulses_remaining, 0);

    assert!(matches!(
        motor.cancel_job(),
        Err(Error::Rejected(Rejection::NoActiveJob))
    ));
    finish(motor);
}

#[test]
fn poll_fault_reports_rising_edge_only() {
    let mut expect = Expect::default();
    expect.fault.push(PinTransaction::get(PinState::High));
    expect.fault.push(PinTransaction::get(PinState::Low));
    expect.fault.push(PinTransaction::get(PinState::Low));
    expect.fault.push(PinTransaction::get(PinState::High));
    let mut motor = new_motor(expect);

    assert!(!motor.poll_fault().unwrap());
    assert!(motor.poll_fault().unwrap());
    assert!(motor.status().fault);
    assert!(!motor.poll_fault().unwrap());
    assert!(!motor.poll_fault().unwrap());
    assert!(!motor.status().fault);
    finish(motor);
}

#[test]
fn status_byte_packs_the_documented_bits() {
    let mut expect = Expect::default();
    expect.enable.push(PinTransaction::set(PinState::Low));
    arm_expectations(&mut expect, true, (false, false, false));
    let mut motor = new_motor(expect);

    assert_eq!(motor.status_flags().bits(), 0);

    motor.enable().unwrap();
    assert_eq!(motor.status_flags(), StatusFlags::ENABLED);

    motor.set_command(JobCommand {
        use_ramping: true,
        ..job(2, 100, 1_500, 300)
    });
    motor.start_job().unwrap();
    motor.pause_job().unwrap();

    let expected = StatusFlags::ENABLED
        | StatusFlags::RUNNING
        | StatusFlags::DIRECTION
        | StatusFlags::RAMPING
        | StatusFlags::PAUSED;
    assert_eq!(motor.status_flags(), expected);
    assert_eq!(motor.status_flags().bits(), 0b0110_1101);
    finish(motor);
}

#[test]
fn encoder_edges_flow_through_the_motor() {
    let mut motor = new_motor(Expect::default());
    motor.on_encoder_edge(true, false, false);
    motor.on_encoder_edge(true, true, false);
    assert_eq!(motor.encoder_status().count, 2);
    assert_eq!(motor.encoder().direction(), Direction::Forward);
    finish(motor);
}
