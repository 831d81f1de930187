// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The boot interface is handed from one stage to the next through a
//! TAMP backup register, which survives warm resets but not power loss.

use crate::platform::{BackupRegisters, ClockControl, ClockGuard, ClockId};
use crate::Error;
use log::debug;
use mp1_areas::{BootInterface, TAMP_BOOT_MODE_BACKUP_REG_ID};
use std::cell::Cell;

pub struct BootInterfaceRecorder<'a> {
    bkpr: &'a dyn BackupRegisters,
    clocks: &'a dyn ClockControl,
    cached: Cell<Option<BootInterface>>,
}

impl<'a> BootInterfaceRecorder<'a> {
    pub fn new(
        bkpr: &'a dyn BackupRegisters,
        clocks: &'a dyn ClockControl,
    ) -> BootInterfaceRecorder<'a> {
        BootInterfaceRecorder {
            bkpr,
            clocks,
            cached: Cell::new(None),
        }
    }

    /// Record the interface this stage was booted from. The value cached
    /// by [`Self::get`] is left alone.
    pub fn save(&self, interface: u8, instance: u8) -> Result<(), Error> {
        let itf = BootInterface::new(interface, instance).ok_or(Error::FieldOverflow {
            interface,
            instance,
        })?;

        let _clk = ClockGuard::enable(self.clocks, ClockId::Rtcapb);

        let reg = self.bkpr.read_backup(TAMP_BOOT_MODE_BACKUP_REG_ID);
        self.bkpr
            .write_backup(TAMP_BOOT_MODE_BACKUP_REG_ID, itf.apply(reg));

        debug!("saved boot interface {itf}");

        Ok(())
    }

    /// The boot interface recorded by an earlier stage. The backup
    /// register is read on the first call only.
    pub fn get(&self) -> BootInterface {
        if let Some(itf) = self.cached.get() {
            return itf;
        }

        let reg = {
            let _clk = ClockGuard::enable(self.clocks, ClockId::Rtcapb);
            self.bkpr.read_backup(TAMP_BOOT_MODE_BACKUP_REG_ID)
        };

        let itf = BootInterface::from_register(reg);
        self.cached.set(Some(itf));

        itf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimDevice;

    #[test]
    fn save_then_get_on_fresh_recorder() {
        let dev = SimDevice::default();

        for interface in 0..=0xf {
            for instance in 0..=0xf {
                BootInterfaceRecorder::new(&dev, &dev)
                    .save(interface, instance)
                    .unwrap();

                let itf = BootInterfaceRecorder::new(&dev, &dev).get();
                assert_eq!((itf.interface, itf.instance), (interface, instance));
            }
        }

        assert_eq!(dev.gated_accesses(), 0);
        assert!(!dev.clock_enabled(ClockId::Rtcapb));
    }

    #[test]
    fn save_preserves_other_bits() {
        let dev = SimDevice::default();
        dev.enable(ClockId::Rtcapb);
        dev.write_backup(TAMP_BOOT_MODE_BACKUP_REG_ID, 0xdead_beef);
        dev.disable(ClockId::Rtcapb);

        BootInterfaceRecorder::new(&dev, &dev).save(0x2, 0x1).unwrap();

        assert_eq!(dev.backup(TAMP_BOOT_MODE_BACKUP_REG_ID), Some(0xdead_21ef));
    }

    #[test]
    fn get_is_cached() {
        let dev = SimDevice::default();
        let rec = BootInterfaceRecorder::new(&dev, &dev);

        // an unset register resolves to zero, and stays resolved
        assert_eq!(rec.get(), BootInterface::default());
        rec.save(0x1, 0x2).unwrap();
        assert_eq!(rec.get(), BootInterface::default());

        // one read for the get, one read-modify-write for the save
        assert_eq!(dev.clock_enables(ClockId::Rtcapb), 2);
        assert_eq!(dev.clock_disables(ClockId::Rtcapb), 2);
    }

    #[test]
    fn wide_values_rejected_untouched() {
        let dev = SimDevice::default();
        let rec = BootInterfaceRecorder::new(&dev, &dev);

        assert!(matches!(
            rec.save(0x10, 0),
            Err(Error::FieldOverflow {
                interface: 0x10,
                instance: 0
            })
        ));
        assert_eq!(dev.clock_enables(ClockId::Rtcapb), 0);
        assert_eq!(dev.backup(TAMP_BOOT_MODE_BACKUP_REG_ID), Some(0));
    }
}
