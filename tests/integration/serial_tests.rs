//! Serial hub session against a scripted link.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use collarctl::app::action::Action;
use collarctl::error::Error;
use collarctl::serial::protocol::{Opcode, request};
use collarctl::serial::SerialManager;

use super::mock_hw::{Activity, ScriptedLink};

fn hub(ack_timeout: Duration) -> (SerialManager, ScriptedLink) {
    let link = ScriptedLink::new(Arc::new(Activity::default()));
    let manager =
        SerialManager::new(Box::new(link.clone()), ack_timeout).with_boot_settle(Duration::ZERO);
    (manager, link)
}

#[test]
fn registration_indices_follow_call_order() {
    let (m, link) = hub(Duration::from_secs(1));
    m.boot().unwrap();

    let indices: Vec<u8> = (0..5).map(|i| m.register_receiver(1, i, i + 1, i + 2).unwrap()).collect();
    assert_eq!(indices, [0, 1, 2, 3, 4]);
    assert_eq!(link.writes()[3], vec![102, 4, 1, 2, 3, 4]);
}

#[test]
fn diagnostics_before_ack_are_consumed() {
    let (m, link) = hub(Duration::from_secs(1));
    m.boot().unwrap();

    {
        let mut s = link.state.lock().unwrap();
        s.diagnostics.push(request(Opcode::Debug, b"pin 3 high"));
        s.diagnostics.push(request(Opcode::Error, b"bad"));
        s.diagnostics.push(vec![42, 1, 7]);
    }
    m.command(Action::Zap, 0, 80, 1000).unwrap();
    assert_eq!(link.writes().last().unwrap(), &vec![13, 4, 0, 80, 3, 232]);

    // nothing left over for the next exchange
    m.ping().unwrap();
}

#[test]
fn frames_split_across_reads_are_reassembled() {
    let (m, link) = hub(Duration::from_secs(1));
    link.state.lock().unwrap().chunk = 1;
    m.boot().unwrap();

    link.state.lock().unwrap().diagnostics.push(request(Opcode::Debug, b"split me"));
    assert_eq!(m.register_receiver(0, 0x12, 0x34, 2).unwrap(), 0);
}

#[test]
fn missing_ack_times_out_and_session_recovers() {
    let (m, link) = hub(Duration::from_millis(100));
    m.boot().unwrap();

    link.set_silent(true);
    let started = Instant::now();
    let err = m.command(Action::Beep, 0, 0, 0).unwrap_err();
    assert!(matches!(err, Error::ProtocolTimeout { awaiting: Opcode::Acknowledge, .. }));
    assert!(started.elapsed() >= Duration::from_millis(100));

    link.set_silent(false);
    m.command(Action::Beep, 0, 0, 0).unwrap();
}

#[test]
fn failed_registration_does_not_consume_an_index() {
    let (m, link) = hub(Duration::from_millis(50));
    m.boot().unwrap();

    link.set_silent(true);
    assert!(m.register_receiver(1, 1, 2, 3).is_err());
    link.set_silent(false);
    assert_eq!(m.register_receiver(1, 1, 2, 3).unwrap(), 0);
    assert_eq!(m.registered(), 1);
}

#[test]
fn concurrent_requests_are_never_pipelined() {
    let (m, link) = hub(Duration::from_secs(1));
    m.boot().unwrap();
    let m = Arc::new(m);

    let handles: Vec<_> = (0..6u8)
        .map(|t| {
            let m = m.clone();
            thread::spawn(move || {
                for i in 0..10u8 {
                    m.command(Action::Vib, t, i, 100).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let s = link.state.lock().unwrap();
    assert_eq!(s.pipelined, 0);
    assert_eq!(s.writes.len(), 61);
}

#[test]
fn stray_ack_before_booted_is_skipped() {
    let (m, link) = hub(Duration::from_secs(1));
    // a stray acknowledge left over from a previous session
    link.state.lock().unwrap().diagnostics.push(request(Opcode::Acknowledge, &[]));
    m.boot().unwrap();
    m.register_receiver(2, 6, 0, 7).unwrap();
}
