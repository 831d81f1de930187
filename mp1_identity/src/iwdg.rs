// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Independent watchdog configuration fused in HW2_OTP.
//!
//! All instances share the one OTP word. Provisioning may only ever add
//! freeze bits to it, and finishes by sticky-locking the word so nothing
//! else can change it until the next reset.

use crate::fuse::FuseStore;
use crate::Error;
use log::{error, info, trace};
use mp1_areas::{
    BootStage, IwdgFlags, HW2_OTP, IWDG1_BASE, IWDG1_INST, IWDG2_BASE, IWDG2_INST,
    IWDG_INSTANCES,
};

/// OTP instance of the watchdog at `base`
pub fn instance_for_base(base: u32) -> Result<u32, Error> {
    match base {
        IWDG1_BASE => Ok(IWDG1_INST),
        IWDG2_BASE => Ok(IWDG2_INST),
        _ => Err(Error::UnknownWatchdog(base)),
    }
}

pub struct WatchdogOtp<'a> {
    fuses: &'a dyn FuseStore,
    stage: BootStage,
}

impl<'a> WatchdogOtp<'a> {
    pub fn new(fuses: &'a dyn FuseStore, stage: BootStage) -> WatchdogOtp<'a> {
        WatchdogOtp { fuses, stage }
    }

    fn check_instance(instance: u32) -> Result<(), Error> {
        if instance >= IWDG_INSTANCES {
            return Err(Error::WatchdogInstance(instance));
        }

        Ok(())
    }

    /// Fused flags of one instance. Any failure to read the word is fatal.
    pub fn otp_config(&self, instance: u32) -> Result<IwdgFlags, Error> {
        Self::check_instance(instance)?;

        let otp = if self.stage.shadows_otp() {
            self.fuses.shadow_and_read(HW2_OTP)
        } else {
            self.fuses.read(HW2_OTP)
        }
        .map_err(Error::unavailable(HW2_OTP))?;
        trace!("HW2_OTP: {otp:#010x}");

        IwdgFlags::from_otp(otp, instance).ok_or(Error::WatchdogInstance(instance))
    }

    /// Add the freeze bits in `flags` to the shadow of HW2_OTP, then
    /// sticky-lock it.
    ///
    /// Each lock is attempted once. If locking fails after the write went
    /// through, [`Error::FuseLockFailed`] is returned and the write stands.
    pub fn shadow_update(&self, instance: u32, flags: IwdgFlags) -> Result<(), Error> {
        if !self.stage.can_provision() {
            return Err(Error::NotInStage {
                operation: "watchdog OTP update",
                stage: self.stage,
            });
        }
        Self::check_instance(instance)?;

        let otp = self
            .fuses
            .shadow_and_read(HW2_OTP)
            .map_err(Error::unavailable(HW2_OTP))?;

        let merged = flags
            .merge_into_otp(otp, instance)
            .ok_or(Error::WatchdogInstance(instance))?;
        trace!("HW2_OTP: {otp:#010x} -> {merged:#010x}");

        self.fuses
            .write(HW2_OTP, merged)
            .map_err(|source| Error::FuseWrite {
                otp: HW2_OTP,
                source,
            })?;

        if let Err(e) = self
            .fuses
            .lock_read(HW2_OTP)
            .and_then(|_| self.fuses.lock_write(HW2_OTP))
        {
            error!("BSEC: HW2_OTP written but not locked ({e})");
            return Err(Error::FuseLockFailed { otp: HW2_OTP });
        }

        info!("IWDG{} OTP updated: {:?}", instance + 1, flags);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuse::BsecError;
    use crate::sim::{BsecOp, SimDevice};

    #[test]
    fn instance_lookup() {
        assert_eq!(instance_for_base(0x5c00_3000).unwrap(), 0);
        assert_eq!(instance_for_base(0x5a00_2000).unwrap(), 1);
        assert!(matches!(
            instance_for_base(0x5a00_3000),
            Err(Error::UnknownWatchdog(0x5a00_3000))
        ));
    }

    #[test]
    fn config_decodes_instance() {
        let dev = SimDevice::default();
        // IWDG1 hw, IWDG2 frozen on stop and standby
        dev.set_otp(HW2_OTP, (1 << 3) | (1 << 6) | (1 << 8));
        let iwdg = WatchdogOtp::new(&dev, BootStage::Bl2);

        assert_eq!(iwdg.otp_config(0).unwrap(), IwdgFlags::HW_ENABLED);
        assert_eq!(
            iwdg.otp_config(1).unwrap(),
            IwdgFlags::DISABLE_ON_STOP | IwdgFlags::DISABLE_ON_STANDBY
        );
        assert!(matches!(
            iwdg.otp_config(2),
            Err(Error::WatchdogInstance(2))
        ));
    }

    #[test]
    fn bl32_uses_existing_shadow() {
        let dev = SimDevice::default();
        dev.set_otp(HW2_OTP, 0);
        dev.set_shadow(HW2_OTP, 1 << 5);
        let iwdg = WatchdogOtp::new(&dev, BootStage::Bl32);

        assert_eq!(iwdg.otp_config(0).unwrap(), IwdgFlags::DISABLE_ON_STOP);
        assert_eq!(dev.count(BsecOp::Shadow), 0);
    }

    #[test]
    fn config_read_failure_is_fatal() {
        let dev = SimDevice::default();
        dev.inject_fault(BsecOp::Shadow, HW2_OTP, BsecError::Timeout);
        let iwdg = WatchdogOtp::new(&dev, BootStage::Bl2);

        let e = iwdg.otp_config(0).unwrap_err();
        assert!(matches!(e, Error::FuseUnavailable { otp: HW2_OTP, .. }));
        assert!(e.is_fatal());
    }

    #[test]
    fn update_merges_writes_and_locks() {
        let dev = SimDevice::default();
        dev.set_otp(HW2_OTP, 1 << 3);
        let iwdg = WatchdogOtp::new(&dev, BootStage::Bl2);

        iwdg.shadow_update(0, IwdgFlags::DISABLE_ON_STANDBY).unwrap();

        let word = dev.otp(HW2_OTP).unwrap();
        assert_eq!(word.shadow, (1 << 3) | (1 << 7));
        assert!(word.read_locked);
        assert!(word.write_locked);
        assert_eq!(
            dev.journal(),
            vec![
                (BsecOp::Shadow, HW2_OTP),
                (BsecOp::Read, HW2_OTP),
                (BsecOp::Write, HW2_OTP),
                (BsecOp::LockRead, HW2_OTP),
                (BsecOp::LockWrite, HW2_OTP),
            ]
        );
    }

    #[test]
    fn lock_failure_is_distinct() {
        let dev = SimDevice::default();
        dev.inject_fault(BsecOp::LockWrite, HW2_OTP, BsecError::LockFail);
        let iwdg = WatchdogOtp::new(&dev, BootStage::Bl2);

        let e = iwdg
            .shadow_update(1, IwdgFlags::DISABLE_ON_STOP)
            .unwrap_err();
        assert!(matches!(e, Error::FuseLockFailed { otp: HW2_OTP }));
        assert!(!e.is_fatal());

        // the write went through, and the lock was not retried
        assert_eq!(dev.otp(HW2_OTP).unwrap().shadow, 1 << 6);
        assert_eq!(dev.count(BsecOp::LockWrite), 1);
    }

    #[test]
    fn read_lock_failure_skips_write_lock() {
        let dev = SimDevice::default();
        dev.inject_fault(BsecOp::LockRead, HW2_OTP, BsecError::Error);
        let iwdg = WatchdogOtp::new(&dev, BootStage::Bl2);

        assert!(matches!(
            iwdg.shadow_update(0, IwdgFlags::DISABLE_ON_STOP),
            Err(Error::FuseLockFailed { .. })
        ));
        assert_eq!(dev.count(BsecOp::LockWrite), 0);
    }

    #[test]
    fn write_failure_locks_nothing() {
        let dev = SimDevice::default();
        dev.inject_fault(BsecOp::Write, HW2_OTP, BsecError::WriteFail);
        let iwdg = WatchdogOtp::new(&dev, BootStage::Bl2);

        let e = iwdg
            .shadow_update(0, IwdgFlags::DISABLE_ON_STOP)
            .unwrap_err();
        assert!(matches!(
            e,
            Error::FuseWrite {
                source: BsecError::WriteFail,
                ..
            }
        ));
        assert_eq!(dev.count(BsecOp::LockRead), 0);
    }

    #[test]
    fn update_not_allowed_in_bl32() {
        let dev = SimDevice::default();
        let iwdg = WatchdogOtp::new(&dev, BootStage::Bl32);

        assert!(matches!(
            iwdg.shadow_update(0, IwdgFlags::DISABLE_ON_STOP),
            Err(Error::NotInStage { .. })
        ));
        assert!(dev.journal().is_empty());
    }
}
