// SPDX-License-Identifier: GPL-3.0-or-later

//! Command dispatcher behavior: byte routing, echo acknowledgments, the
//! fail-fast reset, and the terminal boot path. The diverging seams are
//! observed through panicking doubles.

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};

use bootloader::{Dispatcher, Metadata, NonVolatileStore, RollbackPolicy, State};
use common::{
    build_update_wire, panic_message, test_keys, test_layout, MemFlash, PanicJump, PanicReset,
    ScriptedSerial,
};

type TestDispatcher = Dispatcher<ScriptedSerial, ScriptedSerial, MemFlash, PanicReset, PanicJump>;

fn new_dispatcher(store: NonVolatileStore<MemFlash>, input: Vec<u8>) -> TestDispatcher {
    Dispatcher::new(
        ScriptedSerial::new(input),
        ScriptedSerial::new(Vec::new()),
        store,
        PanicReset,
        PanicJump,
        test_keys(),
        RollbackPolicy::default(),
    )
}

/// Runs the loop until a seam diverges, returning the panic message with
/// the dispatcher for post-mortem inspection.
fn run_dispatcher(store: NonVolatileStore<MemFlash>, input: Vec<u8>) -> (String, TestDispatcher) {
    let mut dispatcher = new_dispatcher(store, input);
    let err = catch_unwind(AssertUnwindSafe(|| dispatcher.run())).unwrap_err();
    (panic_message(err.as_ref()), dispatcher)
}

fn empty_store() -> NonVolatileStore<MemFlash> {
    NonVolatileStore::new(MemFlash::new(), test_layout())
}

fn provisioned_store(version: u16, firmware: &[u8], message: &[u8]) -> NonVolatileStore<MemFlash> {
    let mut store = empty_store();
    store
        .write_metadata(Metadata {
            version,
            size: firmware.len() as u16,
        })
        .unwrap();
    store.install_image(firmware, message).unwrap();
    store
}

#[test]
fn unknown_bytes_are_ignored_without_echo() {
    // Garbage bytes, then the script runs dry and the loop resets.
    let (panic, mut dispatcher) = run_dispatcher(empty_store(), vec![b'x', 0x00, 0xFF]);
    assert_eq!(panic, "device reset");
    assert!(dispatcher.serial_mut().output.is_empty());
}

#[test]
fn update_command_is_echoed_and_session_runs_to_completion() {
    let firmware = vec![0xD4; 128];
    let mut input = vec![b'U'];
    input.extend(build_update_wire(2, b"hi\0", &firmware, &test_keys()));

    let (panic, mut dispatcher) = run_dispatcher(empty_store(), input);
    // Session finished; the loop then starved on the empty script.
    assert_eq!(panic, "device reset");

    // Echo first, then the three OK acks.
    assert_eq!(dispatcher.serial_mut().output, vec![b'U', 0x00, 0x00, 0x00]);
    assert_eq!(
        dispatcher.store_mut().read_metadata().unwrap(),
        Some(Metadata {
            version: 2,
            size: 128
        })
    );
}

#[test]
fn failed_update_session_forces_a_reset() {
    let mut input = vec![b'U'];
    let mut wire = build_update_wire(2, b"hi\0", &[0xD4; 128], &test_keys());
    let tail = wire.len() - 1;
    wire[tail] ^= 0x08; // corrupt the terminator frame header
    input.extend(wire);

    let (panic, mut dispatcher) = run_dispatcher(empty_store(), input);
    assert_eq!(panic, "device reset");
    // The ERROR byte went out before the reset.
    assert_eq!(dispatcher.serial_mut().output.last(), Some(&0x01));
}

#[test]
fn boot_jumps_to_the_firmware_base_and_prints_the_message() {
    let store = provisioned_store(1, &[0x90; 64], b"boot me\0");

    let (panic, mut dispatcher) = run_dispatcher(store, vec![b'B']);
    // Jump target is the firmware base offset.
    assert_eq!(panic, format!("jump to {:#x}", test_layout().firmware_offset));
    assert_eq!(dispatcher.serial_mut().output, vec![b'B']);
    // The debug channel carries the banner first, then the message.
    assert!(dispatcher.debug_mut().output.ends_with(b"boot me\r\n"));
}

#[test]
fn boot_without_installed_firmware_resets_instead_of_jumping() {
    let (panic, mut dispatcher) = run_dispatcher(empty_store(), vec![b'B']);
    assert_eq!(panic, "device reset");
    assert_eq!(dispatcher.serial_mut().output, vec![b'B']);
}

#[test]
fn full_scenario_update_then_boot() {
    let firmware = vec![0xE7; 128];
    let mut input = vec![b'U'];
    input.extend(build_update_wire(4, b"release 4\0", &firmware, &test_keys()));
    input.push(b'B');

    let (panic, mut dispatcher) = run_dispatcher(empty_store(), input);
    assert_eq!(panic, format!("jump to {:#x}", test_layout().firmware_offset));
    assert_eq!(
        dispatcher.serial_mut().output,
        vec![b'U', 0x00, 0x00, 0x00, b'B']
    );
    assert!(dispatcher.debug_mut().output.ends_with(b"release 4\r\n"));
}

#[test]
fn dispatcher_starts_awaiting_commands() {
    let dispatcher = new_dispatcher(empty_store(), Vec::new());
    assert_eq!(dispatcher.state(), State::AwaitingCommand);
}
