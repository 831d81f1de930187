// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Which SoC we are running on: part number, package and revision.

use crate::fuse::FuseStore;
use crate::platform::DebugUnit;
use crate::Error;
use log::{info, trace};
use mp1_areas::{
    package_field, part_number, ChipVersion, Cpu, Package, SocName, CHIP_DEV_ID,
    PACKAGE_OTP, PART_NUMBER_OTP,
};
use std::cell::Cell;

pub struct Identity<'a> {
    fuses: &'a dyn FuseStore,
    dbgmcu: &'a dyn DebugUnit,
    part_number: Cell<Option<u32>>,
}

impl<'a> Identity<'a> {
    pub fn new(fuses: &'a dyn FuseStore, dbgmcu: &'a dyn DebugUnit) -> Identity<'a> {
        Identity {
            fuses,
            dbgmcu,
            part_number: Cell::new(None),
        }
    }

    /// Revision from DBGMCU, or [`ChipVersion::UNAVAILABLE`] when debug is
    /// disabled. Not knowing the revision is not fatal.
    pub fn chip_version(&self) -> ChipVersion {
        match self.dbgmcu.chip_version() {
            Ok(v) => ChipVersion(v),
            Err(_) => {
                info!("Cannot get CPU version, debug disabled");
                ChipVersion::UNAVAILABLE
            }
        }
    }

    pub fn chip_dev_id(&self) -> u32 {
        match self.dbgmcu.chip_dev_id() {
            Ok(id) => id,
            Err(_) => {
                info!("Use default chip ID, debug disabled");
                CHIP_DEV_ID
            }
        }
    }

    /// The part number is read from OTP once; later calls never touch the
    /// fuse store again.
    pub fn part_number(&self) -> Result<u32, Error> {
        if let Some(p) = self.part_number.get() {
            return Ok(p);
        }

        let otp = self
            .fuses
            .shadow_and_read(PART_NUMBER_OTP)
            .map_err(Error::unavailable(PART_NUMBER_OTP))?;
        trace!("PART_NUMBER_OTP: {otp:#010x}");

        let p = part_number(otp, self.chip_dev_id());
        self.part_number.set(Some(p));

        Ok(p)
    }

    pub fn cpu(&self) -> Result<Option<Cpu>, Error> {
        Ok(Cpu::from_part_number(self.part_number()?))
    }

    /// Raw package field. Shadowed and read on every call.
    pub fn package_field(&self) -> Result<u8, Error> {
        let otp = self
            .fuses
            .shadow_and_read(PACKAGE_OTP)
            .map_err(Error::unavailable(PACKAGE_OTP))?;
        trace!("PACKAGE_OTP: {otp:#010x}");

        Ok(package_field(otp))
    }

    /// Package the die is bonded in; `None` for a field value no known
    /// package uses.
    pub fn package(&self) -> Result<Option<Package>, Error> {
        Ok(Package::from_field(self.package_field()?))
    }

    pub fn soc_name(&self) -> Result<SocName, Error> {
        Ok(SocName::new(
            self.part_number()?,
            self.package_field()?,
            self.chip_version(),
        ))
    }

    pub fn print_cpu_info(&self) -> Result<(), Error> {
        let name = self.soc_name()?;
        info!("CPU: {name}");

        Ok(())
    }

    pub fn is_single_core(&self) -> Result<bool, Error> {
        Ok(self.cpu()?.map_or(false, Cpu::is_single_core))
    }
}
