// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::warn;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use thiserror::Error;

/// Status returned by the BSEC driver on success
pub const BSEC_OK: u32 = 0;

/// Failure statuses of the BSEC driver.
///
/// The discriminants are the raw driver codes, so a status word coming
/// back from firmware can be turned into one of these directly.
#[derive(Debug, FromPrimitive, ToPrimitive, Copy, Clone, Eq, PartialEq, Error)]
#[repr(u32)]
pub enum BsecError {
    #[error("BSEC error")]
    Error = 0xffff_ffff,
    #[error("BSEC disturbed")]
    Disturbed = 0xffff_fffe,
    #[error("invalid parameter")]
    InvalidParam = 0xffff_fffc,
    #[error("programming failed")]
    ProgFail = 0xffff_fffb,
    #[error("lock failed")]
    LockFail = 0xffff_fffa,
    #[error("write failed")]
    WriteFail = 0xffff_fff9,
    #[error("shadow reload failed")]
    ShadowFail = 0xffff_fff8,
    #[error("timeout")]
    Timeout = 0xffff_fff7,
}

impl BsecError {
    /// Turn a raw driver status into a result. Codes we don't know are
    /// still failures; they're reported as the generic error.
    pub fn from_status(status: u32) -> Result<(), BsecError> {
        if status == BSEC_OK {
            return Ok(());
        }

        match BsecError::from_u32(status) {
            Some(e) => Err(e),
            None => {
                warn!("BSEC: unknown status {status:#x}");
                Err(BsecError::Error)
            }
        }
    }
}

/// The OTP shadow registers of the BSEC.
///
/// Reads can be retried. Shadow reloads and above all the sticky locks
/// cannot be assumed safe to repeat, so callers issue each of those at
/// most once per operation and report failures instead of retrying.
///
/// Everything takes `&self`: implementations sit on memory mapped
/// registers (or a simulation of them) and handle mutability themselves.
pub trait FuseStore {
    /// Reload the shadow register of `otp` from the fuse array
    fn shadow(&self, otp: u32) -> Result<(), BsecError>;

    /// Read the shadow register of `otp`
    fn read(&self, otp: u32) -> Result<u32, BsecError>;

    /// Write the shadow register of `otp`
    fn write(&self, otp: u32, value: u32) -> Result<(), BsecError>;

    /// Sticky shadow-read lock: the shadow of `otp` is never reloaded
    /// again until the next reset
    fn lock_read(&self, otp: u32) -> Result<(), BsecError>;

    /// Sticky shadow-write lock: the shadow of `otp` can no longer be
    /// written until the next reset
    fn lock_write(&self, otp: u32) -> Result<(), BsecError>;

    fn shadow_and_read(&self, otp: u32) -> Result<u32, BsecError> {
        self.shadow(otp)?;
        self.read(otp)
    }
}
