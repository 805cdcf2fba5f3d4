// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shell sessions against a scripted console and a memory model.

use super::*;
use crate::console::tests::ScriptedConsole;
use core::fmt::Write;
use drv_stm32mp_ddr_test::mock::MockDdr;
use drv_stm32mp_ddr_test::DdrConfig;

const BASE: usize = 0xc000_0000;
const SIZE: usize = 0x1_0000;

#[derive(Default)]
struct FakePlatform {
    transitions: Vec<(BootStep, BootStep)>,
    fail_at: Option<BootStep>,
    params: Vec<(String, u64)>,
    khz: u32,
    resets: usize,
}

impl DdrPlatform for FakePlatform {
    fn enter_step(
        &mut self,
        from: BootStep,
        to: BootStep,
        out: &mut dyn Write,
    ) -> Result<(), PlatformError> {
        if self.fail_at == Some(to) {
            let _ = writeln!(out, "training failed");
            return Err(PlatformError::Failed);
        }
        self.transitions.push((from, to));
        Ok(())
    }

    fn frequency_khz(&mut self) -> Result<u32, PlatformError> {
        Ok(self.khz)
    }

    fn set_frequency_khz(&mut self, khz: u32) -> Result<(), PlatformError> {
        self.khz = khz;
        Ok(())
    }

    fn edit_param(
        &mut self,
        name: &str,
        value: u64,
    ) -> Result<(), PlatformError> {
        if !name.starts_with("reg") {
            return Err(PlatformError::BadParam);
        }
        self.params.push((name.into(), value));
        Ok(())
    }

    fn reset(&mut self) -> Result<(), PlatformError> {
        self.resets += 1;
        Ok(())
    }
}

type TestShell = Shell<MockDdr<u32>, ScriptedConsole, FakePlatform>;

fn shell(input: &[u8]) -> TestShell {
    let config = DdrConfig {
        base: BASE,
        size: SIZE,
    };
    Shell::new(
        ScriptedConsole::new(input),
        FakePlatform::default(),
        Tester::new(MockDdr::new(BASE, SIZE), config),
    )
}

fn ready() -> TestShell {
    let mut s = shell(b"");
    assert_eq!(s.execute("step 3"), Ok(Outcome::Done));
    assert_eq!(s.step(), BootStep::DdrReady);
    s
}

fn output(s: &TestShell) -> &str {
    &s.console().output
}

fn traced(s: &TestShell) -> Vec<Trace> {
    s.trace.iter().map(|e| e.payload).collect()
}

#[test]
fn databus_passes_at_explicit_address() {
    let mut s = ready();
    assert_eq!(
        s.execute("test 1 0xC0000000"),
        Ok(Outcome::Test { index: 1, code: 0 })
    );
    assert!(output(&s).contains("Result: Pass [Test Simple DataBus]"));
    assert_eq!(traced(&s).last(), Some(&Trace::Result(1, 0)));
}

#[test]
fn databus_reports_stuck_line() {
    let mut s = ready();
    s.tester_mut().bus_mut().stuck_low(1 << 5);
    assert_eq!(
        s.execute("test 1 0xC0000000"),
        Ok(Outcome::Test { index: 1, code: 2 })
    );
    let out = output(&s);
    assert!(out.contains("Result: Failed [Test Simple DataBus] = 2"), "{out}");
    assert!(out.contains("0xc0000000"), "{out}");
}

#[test]
fn unknown_sub_command() {
    let mut s = ready();
    assert_eq!(
        s.execute("test 99"),
        Err(CommandError::UnknownSubCommand(99))
    );
    assert_eq!(s.tester().bus().accesses(), 0);
    assert_eq!(s.step(), BootStep::DdrReady);
    assert!(!traced(&s).iter().any(|t| matches!(t, Trace::Dispatch(_))));
}

#[test]
fn test_needs_ddr_ready() {
    for step in ["0", "1", "2"] {
        let mut s = shell(b"");
        if step != "0" {
            s.execute(&format!("step {step}")).unwrap();
        }
        for line in ["test 1 0", "test", "test help", "test 0"] {
            assert_eq!(
                s.execute(line),
                Err(CommandError::InvalidStep {
                    current: s.step(),
                    expected: BootStep::DdrReady,
                })
            );
        }
        assert_eq!(s.tester().bus().accesses(), 0);
        assert!(!traced(&s).iter().any(|t| matches!(t, Trace::Dispatch(_))));
        assert_eq!(
            traced(&s).last(),
            Some(&Trace::Rejected(Some(CommandKind::Test)))
        );
    }
}

#[test]
fn steps_only_go_forward() {
    let mut s = shell(b"");
    s.execute("step 2").unwrap();
    for target in ["1", "2", "7", "x"] {
        assert!(s.execute(&format!("step {target}")).is_err());
        assert_eq!(s.step(), BootStep::PhyInit);
    }
    assert_eq!(
        s.execute("step 1"),
        Err(CommandError::InvalidTarget {
            target: 1,
            current: BootStep::PhyInit,
        })
    );

    s.execute("step 0").unwrap();
    assert_eq!(s.step(), BootStep::DdrReset);
    assert_eq!(
        s.platform().transitions,
        [
            (BootStep::DdrReset, BootStep::PhyInit),
            (BootStep::PhyInit, BootStep::DdrReset),
        ]
    );
    assert!(output(&s).contains("step to 2:PHY_INIT"));
}

#[test]
fn failed_bring_up_keeps_step() {
    let mut s = shell(b"");
    s.platform.fail_at = Some(BootStep::CtrlInit);
    assert_eq!(
        s.execute("next"),
        Err(CommandError::Platform(PlatformError::Failed))
    );
    assert_eq!(s.step(), BootStep::DdrReset);
    assert!(output(&s).contains("training failed"));
    assert!(!output(&s).contains("step to 1"), "{}", output(&s));
    assert!(s.platform().transitions.is_empty());
}

#[test]
fn next_to_run_ends_session() {
    let mut s = shell(b"step 3\rnext\rhelp\r");
    s.run();
    assert_eq!(s.step(), BootStep::Run);
    // The shell stopped reading after `next`.
    assert_eq!(s.console().input.len(), b"help\r".len());
    let out = output(&s);
    assert!(out.starts_with("step to 0:DDR_RESET\nDDR>step 3\r\n"), "{out}");
    assert!(out.contains("step to 4:RUN"));
    assert!(out.ends_with("reset the board to restart\n"));
}

#[test]
fn go_jumps_to_run() {
    let mut s = shell(b"go\r");
    s.run();
    assert_eq!(s.step(), BootStep::Run);
    assert_eq!(
        s.platform().transitions,
        [(BootStep::DdrReset, BootStep::Run)]
    );
}

#[test]
fn errors_do_not_stop_the_loop() {
    let mut s = shell(b"bogus\rtest 1\r\rstep 9\rgo\r");
    s.run();
    let out = output(&s);
    assert!(out.contains("bogus: unknown command"), "{out}");
    assert!(out.contains("invalid step 0:DDR_RESET expecting 3:DDR_READY"));
    assert!(out.contains("invalid target step 9"));
    assert_eq!(out.matches("DDR>").count(), 5);
    assert_eq!(s.step(), BootStep::Run);
}

#[test]
fn argument_checking() {
    let mut s = ready();
    assert_eq!(s.execute("bogus 1"), Err(CommandError::Unknown("bogus")));
    assert_eq!(
        s.execute("edit x"),
        Err(CommandError::NotEnoughParams("edit"))
    );
    assert_eq!(s.execute("next 1"), Err(CommandError::TooManyParams("next")));
    assert_eq!(
        s.execute("test 1 2 3 4 5"),
        Err(CommandError::TooManyParams("test"))
    );
    assert_eq!(
        s.execute("test 1"),
        Err(CommandError::SubCommandArgs {
            index: 1,
            given: 0,
            usage: "<addr>",
        })
    );
    assert_eq!(
        s.execute("test 1 zz"),
        Err(CommandError::InvalidArgument {
            position: 2,
            text: "zz",
        })
    );
    assert_eq!(
        s.execute("test one"),
        Err(CommandError::InvalidArgument {
            position: 1,
            text: "one",
        })
    );
    assert_eq!(
        s.execute("info x"),
        Err(CommandError::Usage("info", "[<param> <val>]"))
    );
    assert_eq!(s.execute("   "), Ok(Outcome::Empty));
    assert_eq!(s.tester().bus().accesses(), 0);
}

#[test]
fn bad_test_arguments_become_failures() {
    let mut s = ready();
    assert_eq!(
        s.execute("test 1 0xC0000002"),
        Ok(Outcome::Test { index: 1, code: 1 })
    );
    assert_eq!(
        s.execute("test 4 0x3000 0"),
        Ok(Outcome::Test { index: 4, code: 1 })
    );
    assert_eq!(s.tester().bus().accesses(), 0);
}

#[test]
fn run_all_with_defaults() {
    let mut s = ready();
    assert_eq!(
        s.execute("test 0 1 0x400"),
        Ok(Outcome::Test { index: 0, code: 0 })
    );
    let out = output(&s);
    assert_eq!(out.matches("Result: Pass").count(), 17);
    assert!(out.contains("Result: Pass [Test All]"));

    let mut s = ready();
    s.tester_mut().bus_mut().stuck_high(1 << 9);
    assert_eq!(
        s.execute("test 0"),
        Ok(Outcome::Test { index: 0, code: 2 })
    );
    assert!(output(&s)
        .contains("Result: Failed [Test All] 1:Test Simple DataBus = 2"));
}

#[test]
fn listings() {
    let mut s = ready();
    s.execute("test").unwrap();
    let count = format!("test:{}\n0:Test All:", SUBCOMMANDS.len());
    assert!(output(&s).contains(&count));
    assert!(!output(&s).contains("stopping at the first failure"));

    s.execute("test help").unwrap();
    assert!(output(&s).contains("stopping at the first failure"));

    s.execute("help").unwrap();
    for c in COMMANDS.iter() {
        assert!(output(&s).contains(c.help), "{}", c.name);
    }

    s.execute("step").unwrap();
    assert!(output(&s).contains("0:DDR_RESET\n1:CTRL_INIT\n"));
    assert!(output(&s).contains("current step is 3:DDR_READY"));
}

#[test]
fn params_only_before_init() {
    let mut s = shell(b"");
    assert_eq!(s.execute("param reg_a 0x10"), Ok(Outcome::Done));
    assert_eq!(
        s.execute("param nope 1"),
        Err(CommandError::Platform(PlatformError::BadParam))
    );
    assert_eq!(s.platform().params, [("reg_a".to_string(), 0x10)]);

    s.execute("next").unwrap();
    assert_eq!(
        s.execute("param reg_b 1"),
        Err(CommandError::InvalidStep {
            current: BootStep::CtrlInit,
            expected: BootStep::DdrReset,
        })
    );
    assert_eq!(s.platform().params.len(), 1);
}

#[test]
fn platform_commands() {
    let mut s = shell(b"");
    s.execute("freq 533000").unwrap();
    s.execute("freq").unwrap();
    assert!(output(&s).contains("DDR frequency: 533000 kHz"));
    assert_eq!(
        s.execute("freq 0x100000000"),
        Err(CommandError::InvalidArgument {
            position: 1,
            text: "0x100000000",
        })
    );
    assert_eq!(
        s.execute("save"),
        Err(CommandError::Platform(PlatformError::Unsupported))
    );

    s.execute("step 2").unwrap();
    s.execute("reset").unwrap();
    assert_eq!(s.platform().resets, 1);
    assert_eq!(s.step(), BootStep::DdrReset);
}

#[test]
fn rejected_lines_are_traced() {
    let mut s = shell(b"");
    let _ = s.execute("bogus");
    let _ = s.execute("next 1");
    assert_eq!(
        traced(&s),
        [
            Trace::Rejected(None),
            Trace::Rejected(Some(CommandKind::Next)),
        ]
    );
}
