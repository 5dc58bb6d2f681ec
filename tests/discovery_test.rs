mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{init_logging, SimDongle};
use turris_dongle::{DeviceKind, Dongle, DongleConfig, Error, MessageType};

const REPLY_WAIT: Duration = Duration::from_secs(5);

fn registered(slot: usize) -> Option<u32> {
    match slot {
        0 => Some(0x1C_0001),
        4 => Some(0x24_0010),
        17 => Some(0x80_0005),
        _ => None,
    }
}

/// Answers `GET SLOT` requests for slots `0..answered`, checking their order.
fn slot_responder(sim: SimDongle, answered: usize) -> thread::JoinHandle<Vec<String>> {
    thread::spawn(move || {
        let mut seen = Vec::new();
        for n in 0..answered {
            let cmd = sim.next_command(REPLY_WAIT).expect("no GET SLOT request");
            assert_eq!(cmd, format!("GET SLOT:{:02}", n));
            // the next slot must not be requested before this one is answered
            thread::sleep(Duration::from_millis(1));
            assert!(!sim.has_pending_command(), "slot {} requested early", n + 1);
            seen.push(cmd);

            match registered(n) {
                Some(id) => sim.send_line(&format!("SLOT:{:02} [{:08}]", n, id)),
                None => sim.send_line(&format!("SLOT:{:02} [--------]", n)),
            }
        }
        seen
    })
}

#[test]
fn discovery_enumerates_all_slots_in_order() {
    init_logging();
    let (sim, input, output) = SimDongle::new();
    let dongle = Dongle::new(DongleConfig::default());
    dongle.attach(input, output).unwrap();

    let responder = slot_responder(sim.clone(), 32);
    let devices = dongle.discover().expect("discovery failed");
    let requests = responder.join().expect("responder panicked");

    assert_eq!(requests.len(), 32);
    assert_eq!(sim.written_lines(), requests);

    assert_eq!(devices.len(), 3);
    assert_eq!(devices[0].slot(), 0);
    assert_eq!(devices[0].device_id(), 0x1C_0001);
    assert_eq!(devices[0].model(), "JA-83M");
    assert_eq!(devices[1].slot(), 4);
    assert_eq!(devices[1].model(), "TP-82N");
    assert_eq!(devices[1].kind(), DeviceKind::Thermostat);
    assert_eq!(devices[2].slot(), 17);
    assert_eq!(devices[2].model(), "RC-86K");
    assert_eq!(devices[2].kind(), DeviceKind::Sensor);

    assert_eq!(dongle.devices(), devices);
}

#[test]
fn silent_slot_is_a_timeout() {
    init_logging();
    let (sim, input, output) = SimDongle::new();
    let dongle = Dongle::new(DongleConfig {
        discovery_timeout: Duration::from_millis(200),
        ..DongleConfig::default()
    });
    dongle.attach(input, output).unwrap();

    let responder = slot_responder(sim.clone(), 3);
    let err = dongle.discover().unwrap_err();
    responder.join().expect("responder panicked");

    assert!(
        matches!(err, Error::DiscoveryTimeout { slot, .. } if slot == 3),
        "{:?}",
        err
    );
    // no request past the silent slot
    assert_eq!(sim.written_lines().len(), 4);
    assert!(dongle.devices().is_empty());
}

#[test]
fn rediscovery_replaces_snapshot() {
    init_logging();
    let (sim, input, output) = SimDongle::new();
    let dongle = Dongle::new(DongleConfig::default());
    dongle.attach(input, output).unwrap();

    let responder = slot_responder(sim.clone(), 32);
    assert_eq!(dongle.discover().unwrap().len(), 3);
    responder.join().unwrap();

    // second run: every slot empty
    let empty = thread::spawn(move || {
        for n in 0..32 {
            sim.next_command(REPLY_WAIT).expect("no GET SLOT request");
            sim.send_line(&format!("SLOT:{:02} [--------]", n));
        }
    });
    assert!(dongle.discover().unwrap().is_empty());
    empty.join().unwrap();
    assert!(dongle.devices().is_empty());
}

#[test]
fn hang_up_aborts_discovery() {
    init_logging();
    let (sim, input, output) = SimDongle::new();
    let dongle = Dongle::new(DongleConfig::default());
    dongle.attach(input, output).unwrap();

    let hangup = thread::spawn(move || {
        sim.next_command(REPLY_WAIT).expect("no GET SLOT request");
        sim.hang_up();
    });
    let err = dongle.discover().unwrap_err();
    hangup.join().unwrap();
    assert!(matches!(err, Error::DiscoveryAborted { slot } if slot == 0), "{:?}", err);
}

#[test]
fn slot_replies_bypass_subscribers() {
    init_logging();
    let (sim, input, output) = SimDongle::new();
    let dongle = Dongle::new(DongleConfig::default());
    dongle.attach(input, output).unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    dongle.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let responder = slot_responder(sim.clone(), 32);
    dongle.discover().unwrap();
    responder.join().unwrap();

    sim.send_line("OK");
    assert!(common::wait_until(REPLY_WAIT, || seen.load(Ordering::SeqCst) == 1));
}

#[test]
fn reconnect_after_subscriber_disconnect_can_discover() {
    init_logging();
    let (sim, input, output) = SimDongle::new();
    let dongle = Arc::new(Dongle::new(DongleConfig::default()));
    dongle.attach(input, output).unwrap();

    let handle = Arc::downgrade(&dongle);
    dongle.subscribe(move |msg| {
        if msg.kind() == MessageType::Err {
            if let Some(dongle) = handle.upgrade() {
                dongle.disconnect();
            }
            // keep the old read thread alive past the reconnect
            thread::sleep(Duration::from_millis(300));
        }
    });
    sim.send_line("ERROR");
    assert!(common::wait_until(REPLY_WAIT, || !dongle.is_connected()));

    let (sim, input, output) = SimDongle::new();
    dongle.attach(input, output).unwrap();
    for _ in 0..2 {
        let responder = slot_responder(sim.clone(), 32);
        assert_eq!(dongle.discover().expect("discovery failed").len(), 3);
        responder.join().expect("responder panicked");
        // the next round starts after the old read thread is gone
        thread::sleep(Duration::from_millis(400));
    }
}

#[test]
fn reply_for_another_slot_is_not_recorded() {
    init_logging();
    let (sim, input, output) = SimDongle::new();
    let dongle = Dongle::new(DongleConfig::default());
    dongle.attach(input, output).unwrap();

    let responder = thread::spawn(move || {
        for n in 0..32 {
            sim.next_command(REPLY_WAIT).expect("no GET SLOT request");
            if n == 2 {
                // a late answer belonging to slot 17 arrives first
                sim.send_line(&format!("SLOT:17 [{:08}]", 0x80_0005));
            }
            sim.send_line(&format!("SLOT:{:02} [--------]", n));
        }
    });
    let devices = dongle.discover().expect("discovery failed");
    responder.join().expect("responder panicked");
    assert!(devices.is_empty());
}
