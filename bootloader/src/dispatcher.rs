// SPDX-License-Identifier: GPL-3.0-or-later

//! Top-level command loop: one byte in, one command out.
//!
//! `'U'` runs an update session to completion (success or fail-reset) and
//! returns to waiting; `'B'` is terminal, either jumping into firmware or
//! resetting. Unknown bytes are ignored. The loop itself only ever ends
//! through a reset, which is also the uniform answer to any session
//! error: no partial-session retry, no resumption.

use embedded_io::{Read, Write};
use embedded_storage::nor_flash::NorFlash;
use host_protocol::Command;

use crate::boot::boot_firmware;
use crate::crypto::UpdateKeys;
use crate::error::Result;
use crate::flash::NonVolatileStore;
use crate::fmt::{error, info};
use crate::hardware::{BootJump, SystemReset};
use crate::metadata::RollbackPolicy;
use crate::update::load_firmware;
use crate::BlobBuffer;

/// Dispatcher states. Mutually exclusive in time: one task, one command
/// in flight, which is what makes flash access race-free without locks.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    AwaitingCommand,
    Updating,
    Booting,
}

/// Ties the whole core together over the four hardware seams.
pub struct Dispatcher<S, D, F, R, J> {
    serial: S,
    debug: D,
    store: NonVolatileStore<F>,
    reset: R,
    jump: J,
    keys: UpdateKeys,
    policy: RollbackPolicy,
    state: State,
    blob: BlobBuffer,
}

impl<S, D, F, R, J> Dispatcher<S, D, F, R, J>
where
    S: Read + Write,
    D: Write,
    F: NorFlash,
    R: SystemReset,
    J: BootJump,
{
    pub fn new(
        serial: S,
        debug: D,
        store: NonVolatileStore<F>,
        reset: R,
        jump: J,
        keys: UpdateKeys,
        policy: RollbackPolicy,
    ) -> Self {
        Dispatcher {
            serial,
            debug,
            store,
            reset,
            jump,
            keys,
            policy,
            state: State::AwaitingCommand,
            blob: BlobBuffer::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Access to the store, for provisioning shims and test inspection.
    pub fn store_mut(&mut self) -> &mut NonVolatileStore<F> {
        &mut self.store
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    pub fn debug_mut(&mut self) -> &mut D {
        &mut self.debug
    }

    /// Runs the command loop forever. Exits only through the reset line.
    pub fn run(&mut self) -> ! {
        let _ = self
            .debug
            .write_all(b"firmware update service ready: 'U' update, 'B' boot\r\n");

        loop {
            let mut byte = [0u8; 1];
            if self.serial.read_exact(&mut byte).is_err() {
                error!("host channel lost, resetting");
                self.reset.reset();
            }
            if let Err(err) = self.handle_byte(byte[0]) {
                error!("fatal session error: {}, resetting", err.as_str());
                self.reset.reset();
            }
        }
    }

    /// Handles one received command byte.
    ///
    /// Recognized commands are echoed back as acknowledgment before they
    /// run; unrecognized bytes are ignored without echo. A successful
    /// boot command never returns.
    pub fn handle_byte(&mut self, byte: u8) -> Result<()> {
        let Some(command) = Command::from_byte(byte) else {
            return Ok(());
        };
        self.serial
            .write_all(&[command.as_byte()])
            .map_err(|_| crate::error::Error::Serial)?;

        match command {
            Command::Update => {
                self.state = State::Updating;
                let outcome = load_firmware(
                    &mut self.serial,
                    &mut self.store,
                    &self.keys,
                    self.policy,
                    &mut self.blob,
                );
                self.state = State::AwaitingCommand;
                outcome?;
                info!("update complete, awaiting next command");
                Ok(())
            }
            Command::Boot => {
                self.state = State::Booting;
                let never =
                    boot_firmware(&mut self.store, &mut self.debug, &mut self.jump)?;
                match never {}
            }
        }
    }
}
