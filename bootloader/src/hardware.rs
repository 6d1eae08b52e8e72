// SPDX-License-Identifier: GPL-3.0-or-later

//! Hardware seams beyond flash and serial: system reset and the one-way
//! transfer of control into the installed firmware.

/// Full device reset. The only cancellation mechanism the bootloader has:
/// all RAM state is lost, persisted flash state is kept.
pub trait SystemReset {
    fn reset(&mut self) -> !;
}

/// Transfer of execution to the installed firmware image.
pub trait BootJump {
    /// Jumps to the firmware whose image starts at `offset` within the
    /// non-volatile memory. Never returns.
    ///
    /// # Safety
    ///
    /// The implementation rewrites the stack pointer and program counter
    /// and will execute whatever has been programmed at that location.
    /// Callers must only pass an offset holding a verified image.
    unsafe fn jump(&mut self, offset: u32) -> !;
}
