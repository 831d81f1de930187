// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hardware identity and fused configuration of an STM32MP15 boot stage.
//!
//! Every fallible entry point returns [`Error`]; nothing in here aborts. The
//! boot stage driving these components decides what to do with a fatal
//! error (see [`Error::is_fatal`]), which keeps the decoding and caching
//! logic testable against the [`sim`] platform.

pub mod board;
pub mod boot_itf;
pub mod ddr;
pub mod fuse;
pub mod identity;
pub mod iwdg;
pub mod platform;
pub mod security;
pub mod sim;

use fuse::{BsecError, FuseStore};
use mp1_areas::{BootInterface, BootStage, ChipVersion, IwdgFlags, Package, SocName};
use platform::{BackupRegisters, ClockControl, DebugUnit, DeviceTree};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An OTP word we cannot run without could not be shadowed or read.
    #[error("BSEC: cannot read OTP {otp}")]
    FuseUnavailable {
        otp: u32,
        #[source]
        source: BsecError,
    },

    /// Writing back an OTP shadow register failed; nothing was locked.
    #[error("BSEC: cannot write OTP {otp}")]
    FuseWrite {
        otp: u32,
        #[source]
        source: BsecError,
    },

    /// The OTP shadow was written, but applying the sticky locks failed.
    /// The write itself stands; whether that is acceptable is the
    /// caller's call.
    #[error("BSEC: OTP {otp} written but sticky lock failed")]
    FuseLockFailed { otp: u32 },

    /// A device tree node we rely on exists but is malformed
    #[error("device tree node {node} has no usable {property} property")]
    MissingProperty {
        node: &'static str,
        property: &'static str,
    },

    #[error("no independent watchdog at {0:#x}")]
    UnknownWatchdog(u32),

    #[error("watchdog instance {0} out of range")]
    WatchdogInstance(u32),

    #[error(
        "boot interface {interface:#x} instance {instance:#x} does not fit \
         in the boot mode backup register"
    )]
    FieldOverflow { interface: u8, instance: u8 },

    #[error("DDR size {0:#x} out of range")]
    DdrSize(u32),

    #[error("{operation} is not allowed in {stage}")]
    NotInStage {
        operation: &'static str,
        stage: BootStage,
    },

    #[error("OTP image is {0} bytes, not a whole number of words")]
    OtpImage(usize),

    #[error("OTP {0} does not exist")]
    OtpIndex(u32),

    #[error("backup register {0} does not exist")]
    BackupRegister(u32),

    #[error("invalid device tree path {0:?}")]
    NodePath(String),

    #[error("struct packing error: {0}")]
    PackingError(#[from] packed_struct::PackingError),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("device description: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("device description: {0}")]
    TomlSerError(#[from] toml::ser::Error),
}

impl Error {
    pub(crate) fn unavailable(otp: u32) -> impl FnOnce(BsecError) -> Error {
        move |source| Error::FuseUnavailable { otp, source }
    }

    /// Whether the boot stage has to stop. A failed sticky lock after a
    /// successful write is left to upstream policy.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::FuseLockFailed { .. })
    }
}

/// All the identity and configuration components of one boot stage,
/// wired to the same platform.
pub struct Stm32mp1<'a> {
    pub identity: identity::Identity<'a>,
    pub board: board::Board<'a>,
    pub boot_itf: boot_itf::BootInterfaceRecorder<'a>,
    pub iwdg: iwdg::WatchdogOtp<'a>,
    pub ddr: ddr::DdrLayout<'a>,
    fuses: &'a dyn FuseStore,
}

impl<'a> Stm32mp1<'a> {
    pub fn new<P>(platform: &'a P, stage: BootStage) -> Stm32mp1<'a>
    where
        P: FuseStore + DebugUnit + DeviceTree + ClockControl + BackupRegisters,
    {
        Stm32mp1 {
            identity: identity::Identity::new(platform, platform),
            board: board::Board::new(platform, platform),
            boot_itf: boot_itf::BootInterfaceRecorder::new(platform, platform),
            iwdg: iwdg::WatchdogOtp::new(platform, stage),
            ddr: ddr::DdrLayout::new(platform),
            fuses: platform,
        }
    }

    pub fn part_number(&self) -> Result<u32, Error> {
        self.identity.part_number()
    }

    pub fn package(&self) -> Result<Option<Package>, Error> {
        self.identity.package()
    }

    pub fn package_field(&self) -> Result<u8, Error> {
        self.identity.package_field()
    }

    pub fn chip_version(&self) -> ChipVersion {
        self.identity.chip_version()
    }

    pub fn soc_name(&self) -> Result<SocName, Error> {
        self.identity.soc_name()
    }

    pub fn print_cpu_info(&self) -> Result<(), Error> {
        self.identity.print_cpu_info()
    }

    pub fn print_board_info(&self) -> Result<(), Error> {
        self.board.print_board_info()
    }

    pub fn is_single_core(&self) -> Result<bool, Error> {
        self.identity.is_single_core()
    }

    pub fn is_closed_device(&self) -> bool {
        security::is_closed_device(self.fuses)
    }

    pub fn save_boot_interface(&self, interface: u8, instance: u8) -> Result<(), Error> {
        self.boot_itf.save(interface, instance)
    }

    pub fn boot_interface(&self) -> BootInterface {
        self.boot_itf.get()
    }

    pub fn watchdog_otp_config(&self, instance: u32) -> Result<IwdgFlags, Error> {
        self.iwdg.otp_config(instance)
    }

    pub fn shadow_update_watchdog_otp(&self, instance: u32, flags: IwdgFlags) -> Result<(), Error> {
        self.iwdg.shadow_update(instance, flags)
    }

    pub fn ddr_ns_size(&self) -> Result<u32, Error> {
        self.ddr.ns_size()
    }
}
