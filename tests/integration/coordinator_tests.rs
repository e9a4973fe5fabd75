//! Boot sequence and command dispatch against mock hardware.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use collarctl::app::action::Action;
use collarctl::app::commands::{Command, CommandOutcome};
use collarctl::app::coordinator::{Coordinator, config_summary};
use collarctl::app::events::AppEvent;
use collarctl::codec::encode;
use collarctl::config::AppConfig;
use collarctl::error::{Error, ValidationError};

use super::mock_hw::{HwCall, MockHardware, RecordingSink, RecordingTransmitter};

const MIXED: &str = r##"{
    "global": { "sdr": "HackRF", "beepzap_delay_ms": 0 },
    "receivers": {
        "receiver1": { "type": "pac", "name": "Rex", "color": "#00c000",
                       "transmitter_code": "011100000", "channel": 0 },
        "receiver2": { "type": "arduino_optocoupler", "name": "Kit",
                       "color": "#c00000", "pins": [3, 4, 5] }
    },
    "applications": { "soundboard": { "enabled": true } }
}"##;

fn boot(json: &str, hw: &MockHardware) -> (Coordinator, Arc<RecordingSink>) {
    let config = AppConfig::from_json_str(json).unwrap();
    let sink = Arc::new(RecordingSink::default());
    let coordinator = Coordinator::boot_with_settle(&config, hw, sink.clone(), Duration::ZERO).unwrap();
    (coordinator, sink)
}

#[test]
fn boot_opens_each_transport_once_and_registers_wired_receivers() {
    let hw = MockHardware::new();
    let (c, sink) = boot(MIXED, &hw);

    assert_eq!(c.receiver_count(), 2);
    assert_eq!(hw.serial_opens.load(Ordering::SeqCst), 1);
    assert_eq!(hw.rf_opens.load(Ordering::SeqCst), 1);
    assert_eq!(hw.link.writes(), vec![vec![100, 0], vec![102, 4, 1, 3, 4, 5]]);
    assert!(sink.events().contains(&AppEvent::Booted { receivers: 2 }));
    assert!(c.keep_alive_tasks().is_empty());
}

#[test]
fn rf_only_config_never_opens_serial() {
    let hw = MockHardware::new();
    let json = r#"{ "global": { "sdr": "LimeSDR" },
        "receivers": { "receiver1": { "type": "pac", "name": "Rex",
            "transmitter_code": "010110110", "channel": 2 } } }"#;
    let (_c, _) = boot(json, &hw);
    assert_eq!(hw.serial_opens.load(Ordering::SeqCst), 0);
    assert_eq!(hw.rf_opens.load(Ordering::SeqCst), 1);
}

#[test]
fn invalid_commands_never_reach_hardware() {
    let hw = MockHardware::new();
    let (c, sink) = boot(MIXED, &hw);

    let outcomes = [
        c.command(Command::new(0, Action::Zap, 50, 500)),
        c.command(Command::new(3, Action::Zap, 50, 500)),
        c.command(Command::new(1, Action::Zap, -5, 500)),
        c.command(Command::new(2, Action::Vib, 101, 500)),
    ];
    assert!(outcomes.iter().all(|o| matches!(o, CommandOutcome::Rejected(Error::Validation(_)))));
    assert!(matches!(
        outcomes[1],
        CommandOutcome::Rejected(Error::Validation(ValidationError::ReceiverOutOfRange {
            receiver: 3,
            count: 2
        }))
    ));

    assert!(hw.rf.messages().is_empty());
    assert!(hw.link.command_frames().is_empty());
    let rejected = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, AppEvent::CommandRejected { .. }))
        .count();
    assert_eq!(rejected, 4);
}

#[test]
fn hub_control_actions_from_a_command_source_are_rejected() {
    let hw = MockHardware::new();
    let (c, sink) = boot(MIXED, &hw);

    for action in ["BOOT", "ADD", "CRASH", "PING"] {
        let command: Command = serde_json::from_value(serde_json::json!({
            "receiver": 2, "action": action, "power": 10, "duration_ms": 500
        }))
        .unwrap();
        assert!(matches!(
            c.command(command),
            CommandOutcome::Rejected(Error::Validation(ValidationError::NotUserAction { .. }))
        ));
    }
    assert!(hw.link.command_frames().is_empty());
    assert!(hw.rf.messages().is_empty());
    assert!(!sink.events().iter().any(|e| matches!(e, AppEvent::CommandSent { .. })));
}

#[test]
fn huge_duration_is_sent_capped() {
    let hw = MockHardware::new();
    let json = r#"{ "global": { "sdr": "HackRF" },
        "receivers": { "receiver1": { "type": "pac", "name": "Rex",
            "transmitter_code": "010110110", "channel": 2,
            "duration_increment_ms": 1, "duration_min_ms": 1 } } }"#;
    let (c, _) = boot(json, &hw);

    assert!(c.command(Command::new(1, Action::Zap, 10, u32::MAX)).is_sent());
    assert_eq!(hw.rf.messages()[0].split(' ').count(), 262);
}

#[test]
fn zero_duration_is_a_no_op() {
    let hw = MockHardware::new();
    let (c, _) = boot(MIXED, &hw);

    assert!(matches!(c.command(Command::new(1, Action::Zap, 50, 0)), CommandOutcome::Ignored));
    assert!(matches!(c.command(Command::new(2, Action::Zap, 50, 0)), CommandOutcome::Ignored));
    assert!(hw.rf.messages().is_empty());
    assert!(hw.link.command_frames().is_empty());
}

#[test]
fn durations_are_normalized_per_receiver() {
    let hw = MockHardware::new();
    let (c, _) = boot(MIXED, &hw);

    // PAC: 250 ms steps, 250 ms floor
    for (requested, expected, frames) in [(1, 250, 1), (376, 500, 2), (625, 500, 2), (1000, 1000, 4)] {
        let outcome = c.command(Command::new(1, Action::Beep, 32, requested));
        assert!(matches!(outcome, CommandOutcome::Sent { duration_ms } if duration_ms == expected));
        let last = hw.rf.messages().pop().unwrap();
        assert_eq!(last.split(' ').count(), frames, "{requested}ms");
        assert!(last.starts_with(&encode("010010100110000001101100")));
    }

    // wired: 1 ms steps
    let outcome = c.command(Command::new(2, Action::Vib, 40, 1234));
    assert!(matches!(outcome, CommandOutcome::Sent { duration_ms: 1234 }));
    assert_eq!(hw.link.command_frames().last().unwrap(), &vec![12, 4, 0, 40, 4, 210]);
}

#[test]
fn wired_beepzap_is_beep_then_zap() {
    let hw = MockHardware::new();
    let (c, _) = boot(MIXED, &hw);

    assert!(c.command(Command::new(2, Action::BeepZap, 70, 300)).is_sent());
    assert_eq!(
        hw.link.command_frames(),
        vec![vec![11, 4, 0, 0, 0, 0], vec![13, 4, 0, 70, 1, 44]]
    );
}

#[test]
fn rf_beepzap_is_one_transmission() {
    let hw = MockHardware::new();
    let (c, _) = boot(MIXED, &hw);

    assert!(c.command(Command::new(1, Action::BeepZap, 32, 250)).is_sent());
    let messages = hw.rf.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0],
        format!(
            "{}/0ms {}",
            encode("010000000110000001100100"),
            encode("010010100110000000101000")
        )
    );
}

#[test]
fn transport_failure_is_reported_not_raised() {
    let hw = MockHardware::with_transmitter(|tx| RecordingTransmitter { fail: true, ..tx });
    let (c, sink) = boot(MIXED, &hw);

    let outcome = c.command(Command::new(1, Action::Zap, 10, 250));
    assert!(matches!(outcome, CommandOutcome::Failed(ref e) if e.is_hardware()));
    assert!(sink.events().iter().any(|e| matches!(
        e,
        AppEvent::CommandFailed { command, duration_ms: 250, .. } if command.receiver == 1
    )));

    // the process keeps working for other receivers
    assert!(c.command(Command::new(2, Action::Beep, 0, 100)).is_sent());
}

const BEEP: u8 = 11;
const ZAP: u8 = 13;

#[test]
fn concurrent_commands_never_overlap_on_hardware() {
    let hw = MockHardware::with_transmitter(|tx| RecordingTransmitter {
        delay: Duration::from_millis(2),
        ..tx
    });
    let (c, _) = boot(MIXED, &hw);
    let c = Arc::new(c);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let c = c.clone();
            thread::spawn(move || {
                for i in 0..5 {
                    // unique power per command so every zap can be told apart
                    let power = 1 + t * 5 + i;
                    let command = if (t + i) % 2 == 0 {
                        Command::new(2, Action::BeepZap, power, 250)
                    } else {
                        Command::new(1, Action::Vib, power, 250)
                    };
                    assert!(c.command(command).is_sent());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(hw.activity.max_in_flight(), 1);
    assert_eq!(hw.link.state.lock().unwrap().pipelined, 0);

    let calls = hw.activity.command_calls();
    assert_eq!(calls.iter().filter(|c| **c == HwCall::Rf).count(), 20);
    // each wired BEEPZAP is a silent beep directly followed by its zap,
    // with no other invocation in between
    let mut zap_levels = Vec::new();
    let mut iter = calls.iter();
    while let Some(call) = iter.next() {
        if let HwCall::Serial { opcode, level } = *call {
            assert_eq!((opcode, level), (BEEP, 0), "{calls:?}");
            match iter.next() {
                Some(HwCall::Serial { opcode: ZAP, level }) => zap_levels.push(*level),
                other => panic!("beep followed by {other:?}"),
            }
        }
    }
    zap_levels.sort_unstable();
    zap_levels.dedup();
    assert_eq!(zap_levels.len(), 20);

    // every RF message is whole: one frame
    for m in hw.rf.messages() {
        assert_eq!(m.split(' ').count(), 1);
    }
}

#[test]
fn hardware_sees_commands_in_gate_order() {
    let (release, held) = mpsc::channel();
    let hw = MockHardware::with_transmitter(|tx| RecordingTransmitter {
        hold: Some(Mutex::new(held)),
        ..tx
    });
    let (c, _) = boot(MIXED, &hw);
    let c = Arc::new(c);

    let first = {
        let c = c.clone();
        thread::spawn(move || c.command(Command::new(1, Action::Zap, 10, 250)))
    };
    let deadline = Instant::now() + Duration::from_secs(5);
    while hw.rf.entered() == 0 {
        assert!(Instant::now() < deadline, "first command never reached the radio");
        thread::sleep(Duration::from_millis(5));
    }

    // the first command holds the gate inside the transmitter
    let second = {
        let c = c.clone();
        thread::spawn(move || c.command(Command::new(2, Action::BeepZap, 20, 300)))
    };
    thread::sleep(Duration::from_millis(50));
    assert!(hw.link.command_frames().is_empty());

    release.send(()).unwrap();
    assert!(first.join().unwrap().is_sent());
    assert!(second.join().unwrap().is_sent());
    assert_eq!(
        hw.activity.command_calls(),
        [
            HwCall::Rf,
            HwCall::Serial { opcode: BEEP, level: 0 },
            HwCall::Serial { opcode: ZAP, level: 20 },
        ]
    );
}

#[test]
fn broken_sections_are_skipped() {
    let hw = MockHardware::new();
    let json = r#"{ "global": { "sdr": "HackRF" },
        "receivers": {
            "receiver1": { "type": "pac", "name": "Short", "transmitter_code": "0101", "channel": 0 },
            "receiver2": { "type": "pac", "name": "Legacy", "transmitter_code": "010110110", "button": 1 },
            "receiver3": { "type": "dogtra", "name": "Unknown" },
            "receiver4": { "type": "pac", "name": "Good", "transmitter_code": "010110110", "channel": 1 }
        } }"#;
    let (c, sink) = boot(json, &hw);

    assert_eq!(c.receiver_count(), 1);
    assert_eq!(c.receiver_properties()[0].name, "Good");
    let skipped: Vec<_> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            AppEvent::ReceiverSkipped { section, .. } => Some(section),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, ["receiver1", "receiver2", "receiver3"]);
}

#[test]
fn no_usable_receivers_fails_boot() {
    let hw = MockHardware::new();
    let config = AppConfig::from_json_str(
        r#"{ "receivers": { "receiver1": { "type": "nope", "name": "X" } } }"#,
    )
    .unwrap();
    let sink = Arc::new(RecordingSink::default());
    let err = Coordinator::boot_with_settle(&config, &hw, sink, Duration::ZERO).err().unwrap();
    assert!(matches!(err, Error::NoReceivers));
}

#[test]
fn missing_sdr_is_fatal_and_lists_devices() {
    let hw = MockHardware::new();
    let config = AppConfig::from_json_str(
        r#"{ "receivers": { "receiver1": { "type": "pac", "name": "Rex",
            "transmitter_code": "010110110", "channel": 2 } } }"#,
    )
    .unwrap();
    let sink = Arc::new(RecordingSink::default());
    let err = Coordinator::boot_with_settle(&config, &hw, sink, Duration::ZERO).err().unwrap();
    assert!(err.to_string().contains("HackRF, LimeSDR"));
}

#[test]
fn keep_alive_pulses_fire_periodically() {
    let hw = MockHardware::new();
    let json = r#"{ "receivers": {
        "receiver1": { "type": "arduino_optocoupler", "name": "Kit",
                       "pins": [3, 4, 5], "awake_time_s": 4 } } }"#;
    let (mut c, _) = boot(json, &hw);
    assert_eq!(c.keep_alive_tasks().len(), 1);
    assert_eq!(c.scheduler().pending(), 1);

    let deadline = Instant::now() + Duration::from_secs(5);
    while hw.link.command_frames().len() < 2 {
        assert!(Instant::now() < deadline, "keep-alive did not fire twice");
        thread::sleep(Duration::from_millis(50));
    }
    c.shutdown();

    // KEEPAWAKE goes out as a zero-power 250 ms beep
    for frame in hw.link.command_frames() {
        assert_eq!(frame, vec![11, 4, 0, 0, 0, 250]);
    }
}

#[test]
fn summary_exposes_applications_and_receivers() {
    let hw = MockHardware::new();
    let (c, _) = boot(MIXED, &hw);
    let summary = c.config_summary();

    assert_eq!(summary["applications"]["soundboard"]["enabled"], true);
    assert_eq!(summary["receivers"][0]["name"], "Rex");
    assert_eq!(summary["receivers"][0]["type"], "pac");
    assert_eq!(summary["receivers"][0]["duration_increment_ms"], 250);
    assert_eq!(summary["receivers"][1]["color"], "#c00000");

    let config = AppConfig::from_json_str(MIXED).unwrap();
    let offline = config_summary(&config, &RecordingSink::default()).unwrap();
    assert_eq!(offline, summary);
}
