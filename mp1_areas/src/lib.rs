// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bit-exact layouts of the STM32MP15 identity and configuration words.
//!
//! Nothing in here touches hardware: every item either names a fixed OTP
//! word / register, or decodes a raw word that somebody else has already
//! read. The resolver in `mp1_identity` does the reading.

extern crate packed_struct;

use bitfield::bitfield;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use packed_struct::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString, IntoStaticStr};

// BSEC OTP word indices, RM0436 table "OTP mapping"

/// Security configuration; carries the closed-device marker
pub const DATA0_OTP: u32 = 0;
/// Reference part number
pub const PART_NUMBER_OTP: u32 = 1;
/// Package and reserved configuration
pub const PACKAGE_OTP: u32 = 16;
/// Hardware configuration, including the independent watchdogs
pub const HW2_OTP: u32 = 18;
/// Last valid OTP word on the STM32MP15
pub const OTP_MAX_ID: u32 = 95;

pub const DATA0_OTP_SECURED: u32 = 1 << 6;

pub const PART_NUMBER_OTP_PART_MASK: u32 = 0x0000_00ff;
pub const PART_NUMBER_OTP_PART_SHIFT: u32 = 0;

pub const PACKAGE_OTP_PKG_MASK: u32 = 0x3800_0000;
pub const PACKAGE_OTP_PKG_SHIFT: u32 = 27;

pub const HW2_OTP_IWDG_HW_POS: u32 = 3;
pub const HW2_OTP_IWDG_FZ_STOP_POS: u32 = 5;
pub const HW2_OTP_IWDG_FZ_STANDBY_POS: u32 = 7;

/// Device id reported by DBGMCU_IDC. Used as-is when the debug unit is
/// disabled and cannot be asked.
pub const CHIP_DEV_ID: u32 = 0x500;
pub const PART_NUMBER_DEV_ID_SHIFT: u32 = 16;

// Device tree names used to locate configuration

pub const DT_BSEC_COMPAT: &str = "st,stm32mp15-bsec";
pub const DT_BOARD_ID_NODE: &str = "board_id";
pub const DT_DDR_COMPAT: &str = "st,stm32mp1-ddr";
pub const DT_DDR_MEM_SIZE: &str = "st,mem-size";

/// Returns `true` when the closed-device marker is set in a DATA0 word
pub fn is_secured(data0: u32) -> bool {
    (data0 & DATA0_OTP_SECURED) == DATA0_OTP_SECURED
}

/// Combine the PART_NUMBER OTP word with the chip device id.
pub fn part_number(otp: u32, dev_id: u32) -> u32 {
    let part = (otp & PART_NUMBER_OTP_PART_MASK) >> PART_NUMBER_OTP_PART_SHIFT;

    part | (dev_id << PART_NUMBER_DEV_ID_SHIFT)
}

/// Extract the 3-bit package field from the PACKAGE OTP word
pub fn package_field(otp: u32) -> u8 {
    ((otp & PACKAGE_OTP_PKG_MASK) >> PACKAGE_OTP_PKG_SHIFT) as u8
}

/// MPU part numbers, already combined with the `0x500` device id
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, Display, IntoStaticStr)]
#[repr(u32)]
pub enum Cpu {
    #[strum(serialize = "157C")]
    Stm32mp157c = 0x0500_0000,
    #[strum(serialize = "157A")]
    Stm32mp157a = 0x0500_0001,
    #[strum(serialize = "153C")]
    Stm32mp153c = 0x0500_0024,
    #[strum(serialize = "153A")]
    Stm32mp153a = 0x0500_0025,
    #[strum(serialize = "151C")]
    Stm32mp151c = 0x0500_002E,
    #[strum(serialize = "151A")]
    Stm32mp151a = 0x0500_002F,
    #[strum(serialize = "157F")]
    Stm32mp157f = 0x0500_0080,
    #[strum(serialize = "157D")]
    Stm32mp157d = 0x0500_0081,
    #[strum(serialize = "153F")]
    Stm32mp153f = 0x0500_00A4,
    #[strum(serialize = "153D")]
    Stm32mp153d = 0x0500_00A5,
    #[strum(serialize = "151F")]
    Stm32mp151f = 0x0500_00AE,
    #[strum(serialize = "151D")]
    Stm32mp151d = 0x0500_00AF,
}

impl Cpu {
    pub fn from_part_number(part_number: u32) -> Option<Cpu> {
        Cpu::from_u32(part_number)
    }

    /// The STM32MP151 parts only provide a single Cortex-A7
    pub fn is_single_core(self) -> bool {
        matches!(
            self,
            Cpu::Stm32mp151a | Cpu::Stm32mp151c | Cpu::Stm32mp151d | Cpu::Stm32mp151f
        )
    }
}

#[derive(PrimitiveEnum_u8, Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum Package {
    #[strum(serialize = "AD")]
    TfBga257 = 1,
    #[strum(serialize = "AC")]
    TfBga361 = 2,
    #[strum(serialize = "AB")]
    LfBga354 = 3,
    #[strum(serialize = "AA")]
    LfBga448 = 4,
}

impl Package {
    pub fn from_field(field: u8) -> Option<Package> {
        Package::from_primitive(field)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, Display)]
#[repr(u32)]
pub enum ChipRevision {
    #[strum(serialize = "B")]
    RevB = 0x2000,
    #[strum(serialize = "Z")]
    RevZ = 0x2001,
}

/// Revision id as read from DBGMCU_IDC.
///
/// Zero is not a revision: it means the debug unit was disabled and the
/// revision could not be obtained at all.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct ChipVersion(pub u32);

impl ChipVersion {
    pub const UNAVAILABLE: ChipVersion = ChipVersion(0);

    pub fn is_available(self) -> bool {
        self != Self::UNAVAILABLE
    }

    pub fn revision(self) -> Option<ChipRevision> {
        ChipRevision::from_u32(self.0)
    }
}

/// Human readable SoC name, e.g. `STM32MP157CAA Rev.B`
///
/// Anything that doesn't decode is rendered as `?` placeholders rather
/// than rejected; this only feeds log output.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SocName {
    pub cpu: Option<Cpu>,
    pub package: Option<Package>,
    pub revision: Option<ChipRevision>,
}

impl SocName {
    pub fn new(part_number: u32, package: u8, version: ChipVersion) -> SocName {
        SocName {
            cpu: Cpu::from_part_number(part_number),
            package: Package::from_field(package),
            revision: version.revision(),
        }
    }
}

impl fmt::Display for SocName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cpu: &'static str = match self.cpu {
            Some(c) => c.into(),
            None => "????",
        };
        let pkg = match self.package {
            Some(p) => p.to_string(),
            None => "??".to_string(),
        };
        let rev = match self.revision {
            Some(r) => r.to_string(),
            None => "?".to_string(),
        };

        write!(f, "STM32MP{cpu}{pkg} Rev.{rev}")
    }
}

/// Board identification word, programmed by the board manufacturer into
/// the OTP word named by the `board_id` device tree node.
#[derive(PackedStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[packed_struct(size_bytes = "4", endian = "msb", bit_numbering = "lsb0")]
pub struct BoardId {
    /// Board number, printed as MBxxxx
    #[packed_field(bits = "31..=16")]
    pub board_nb: u16,

    /// Variant: customer part number
    #[packed_field(bits = "15..=12")]
    pub var_cpn: Integer<u8, packed_bits::Bits<4>>,

    /// Revision, 1 = 'A'
    #[packed_field(bits = "11..=8")]
    pub revision: Integer<u8, packed_bits::Bits<4>>,

    /// Variant: finished good
    #[packed_field(bits = "7..=4")]
    pub var_fg: Integer<u8, packed_bits::Bits<4>>,

    /// Bill of materials
    #[packed_field(bits = "3..=0")]
    pub bom: Integer<u8, packed_bits::Bits<4>>,
}

impl BoardId {
    /// Decode a board id word. An all-zero word has never been programmed
    /// and yields `None`; it must not be reported as board MB0000.
    pub fn from_otp(word: u32) -> Result<Option<BoardId>, PackingError> {
        if word == 0 {
            return Ok(None);
        }

        Ok(Some(BoardId::unpack(&word.to_be_bytes())?))
    }

    /// Revision letter; `None` for a zero revision field, which has no
    /// letter.
    pub fn revision_letter(&self) -> Option<char> {
        match *self.revision {
            0 => None,
            r => Some(char::from(b'A' + (r - 1))),
        }
    }
}

/// The one-line board description, e.g. `MB1272 Var2.0 Rev.C-01`.
///
/// `BoardId`'s own `Display` comes from `PackedStruct` and dumps the raw
/// bit layout; this is the form printed at boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardInfo(pub BoardId);

impl BoardId {
    pub fn info(self) -> BoardInfo {
        BoardInfo(self)
    }
}

impl fmt::Display for BoardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = &self.0;

        write!(
            f,
            "MB{:04x} Var{}.{} Rev.{}-{:02}",
            id.board_nb,
            *id.var_cpn,
            *id.var_fg,
            id.revision_letter().unwrap_or('?'),
            *id.bom
        )
    }
}

/// TAMP backup register that carries the boot mode between stages
pub const TAMP_BOOT_MODE_BACKUP_REG_ID: u32 = 20;
pub const TAMP_BOOT_MODE_ITF_MASK: u32 = 0x0000_ff00;
pub const TAMP_BOOT_MODE_ITF_SHIFT: u32 = 8;

bitfield! {
    /// TAMP_BKP20R. Only the boot interface byte (15:8) belongs to us; the
    /// rest of the register is owned by other boot mode users and must be
    /// preserved on update.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct TampBootMode(u32);
    impl Debug;
    pub u8, interface, set_interface: 15, 12;
    pub u8, instance, set_instance: 11, 8;
}

/// Boot devices reported by the ROM code in the boot context
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    FromPrimitive,
    Display,
    EnumString,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BootDevice {
    Sd = 0x1,
    Emmc = 0x2,
    NandFmc = 0x3,
    NorQspi = 0x4,
    Uart = 0x5,
    Usb = 0x6,
    NandQspi = 0x7,
}

/// Boot interface and instance, one nibble each
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct BootInterface {
    pub interface: u8,
    pub instance: u8,
}

impl BootInterface {
    /// Both halves must fit in a nibble; anything wider would spill into
    /// the neighbouring fields of the backup register.
    pub fn new(interface: u8, instance: u8) -> Option<BootInterface> {
        if interface > 0xf || instance > 0xf {
            return None;
        }

        Some(BootInterface {
            interface,
            instance,
        })
    }

    pub fn from_register(reg: u32) -> BootInterface {
        let bkpr = TampBootMode(reg);

        BootInterface {
            interface: bkpr.interface(),
            instance: bkpr.instance(),
        }
    }

    /// Merge into an existing backup register value, leaving every bit
    /// outside the boot interface byte untouched.
    pub fn apply(self, reg: u32) -> u32 {
        let mut bkpr = TampBootMode(reg);
        bkpr.set_interface(self.interface);
        bkpr.set_instance(self.instance);
        bkpr.0
    }

    pub fn device(self) -> Option<BootDevice> {
        BootDevice::from_u8(self.interface)
    }
}

impl fmt::Display for BootInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.device() {
            Some(d) => write!(f, "{d} instance {}", self.instance),
            None if self.interface == 0 => write!(f, "none"),
            None => write!(f, "unknown ({:#x}) instance {}", self.interface, self.instance),
        }
    }
}

pub const IWDG1_BASE: u32 = 0x5c00_3000;
pub const IWDG2_BASE: u32 = 0x5a00_2000;
pub const IWDG1_INST: u32 = 0;
pub const IWDG2_INST: u32 = 1;
pub const IWDG_INSTANCES: u32 = 2;

bitflags::bitflags! {
    /// Watchdog behaviour fused in HW2_OTP
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct IwdgFlags: u32 {
        const HW_ENABLED = 1 << 1;
        const DISABLE_ON_STOP = 1 << 2;
        const DISABLE_ON_STANDBY = 1 << 3;
    }
}

impl IwdgFlags {
    /// Decode the flags of one watchdog instance from a HW2 OTP word.
    /// `None` for an instance the SoC doesn't have.
    pub fn from_otp(otp: u32, instance: u32) -> Option<IwdgFlags> {
        if instance >= IWDG_INSTANCES {
            return None;
        }

        let mut flags = IwdgFlags::empty();

        if otp & (1 << (instance + HW2_OTP_IWDG_HW_POS)) != 0 {
            flags |= IwdgFlags::HW_ENABLED;
        }
        if otp & (1 << (instance + HW2_OTP_IWDG_FZ_STOP_POS)) != 0 {
            flags |= IwdgFlags::DISABLE_ON_STOP;
        }
        if otp & (1 << (instance + HW2_OTP_IWDG_FZ_STANDBY_POS)) != 0 {
            flags |= IwdgFlags::DISABLE_ON_STANDBY;
        }

        Some(flags)
    }

    /// OR the freeze requests of `self` into a HW2 OTP word.
    ///
    /// Only the two freeze bits are ever set, and bits are never cleared.
    /// `HW_ENABLED` is fused at manufacturing and ignored here.
    pub fn merge_into_otp(self, otp: u32, instance: u32) -> Option<u32> {
        if instance >= IWDG_INSTANCES {
            return None;
        }

        let mut otp = otp;

        if self.contains(IwdgFlags::DISABLE_ON_STOP) {
            otp |= 1 << (instance + HW2_OTP_IWDG_FZ_STOP_POS);
        }
        if self.contains(IwdgFlags::DISABLE_ON_STANDBY) {
            otp |= 1 << (instance + HW2_OTP_IWDG_FZ_STANDBY_POS);
        }

        Some(otp)
    }
}

// Secure DDR carve-outs at the top of DDR
pub const DDR_S_SIZE: u32 = 0x01e0_0000;
pub const DDR_SHMEM_SIZE: u32 = 0x0020_0000;
pub const DDR_MAX_SIZE: u32 = 0x4000_0000;

/// Non-secure DDR left over once the secure and shared carve-outs are
/// removed, or `None` when `ddr_size` can't hold them or exceeds the
/// addressable DDR window.
pub fn ddr_ns_size(ddr_size: u32) -> Option<u32> {
    let reserved = DDR_S_SIZE + DDR_SHMEM_SIZE;

    if ddr_size <= reserved || ddr_size > DDR_MAX_SIZE {
        return None;
    }

    Some(ddr_size - reserved)
}

/// Which boot stage is running the resolver. BL2 is the provisioning
/// capable stage; BL32 only consumes what BL2 left behind.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Display,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BootStage {
    #[default]
    Bl2,
    Bl32,
}

impl BootStage {
    /// BL2 must refresh shadow registers itself; later stages rely on
    /// the shadows BL2 already loaded.
    pub fn shadows_otp(self) -> bool {
        self == BootStage::Bl2
    }

    pub fn can_provision(self) -> bool {
        self == BootStage::Bl2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_id_fields() {
        let id = BoardId::from_otp(0x0001_0234).unwrap().unwrap();

        assert_eq!(id.board_nb, 1);
        assert_eq!(*id.var_cpn, 0);
        assert_eq!(*id.revision, 2);
        assert_eq!(id.revision_letter(), Some('B'));
        assert_eq!(*id.var_fg, 3);
        assert_eq!(*id.bom, 4);
        assert_eq!(id.info().to_string(), "MB0001 Var0.3 Rev.B-04");
    }

    #[test]
    fn board_id_dk2() {
        // MB1272 Var2.0 Rev.C-01
        let id = BoardId::from_otp(0x1272_2301).unwrap().unwrap();

        assert_eq!(id.board_nb, 0x1272);
        assert_eq!(id.info().to_string(), "MB1272 Var2.0 Rev.C-01");
    }

    #[test]
    fn unprogrammed_board_id() {
        assert_eq!(BoardId::from_otp(0).unwrap(), None);
    }

    #[test]
    fn board_id_without_revision() {
        let id = BoardId::from_otp(0x1272_0000).unwrap().unwrap();

        assert_eq!(id.revision_letter(), None);
        assert_eq!(id.info().to_string(), "MB1272 Var0.0 Rev.?-00");
    }

    #[test]
    fn soc_name_known() {
        let name = SocName::new(0x0500_0000, 4, ChipVersion(0x2000));
        assert_eq!(name.to_string(), "STM32MP157CAA Rev.B");

        let name = SocName::new(0x0500_00af, 1, ChipVersion(0x2001));
        assert_eq!(name.to_string(), "STM32MP151DAD Rev.Z");
    }

    #[test]
    fn soc_name_unknown() {
        let name = SocName::new(0x0600_0000, 0, ChipVersion::UNAVAILABLE);
        assert_eq!(name.to_string(), "STM32MP?????? Rev.?");

        let name = SocName::new(0x0500_0024, 7, ChipVersion(0x1000));
        assert_eq!(name.to_string(), "STM32MP153C?? Rev.?");
    }

    #[test]
    fn part_number_uses_low_byte_and_dev_id() {
        assert_eq!(part_number(0xdead_be24, CHIP_DEV_ID), 0x0500_0024);
        assert_eq!(
            Cpu::from_part_number(part_number(0x2f, CHIP_DEV_ID)),
            Some(Cpu::Stm32mp151a)
        );
        assert_eq!(Cpu::from_part_number(part_number(0x2f, 0x501)), None);
    }

    #[test]
    fn single_core_parts() {
        assert!(Cpu::Stm32mp151a.is_single_core());
        assert!(Cpu::Stm32mp151f.is_single_core());
        assert!(!Cpu::Stm32mp153c.is_single_core());
        assert!(!Cpu::Stm32mp157d.is_single_core());
    }

    #[test]
    fn package_field_bits() {
        assert_eq!(package_field(4 << 27), 4);
        assert_eq!(package_field(!PACKAGE_OTP_PKG_MASK), 0);
        assert_eq!(Package::from_field(package_field(3 << 27)), Some(Package::LfBga354));
        assert_eq!(Package::from_field(5), None);
    }

    #[test]
    fn secured_marker() {
        assert!(is_secured(0x40));
        assert!(is_secured(0xffff_ffff));
        assert!(!is_secured(0xbf));
    }

    #[test]
    fn boot_interface_nibbles() {
        for interface in 0..=0xf {
            for instance in 0..=0xf {
                let itf = BootInterface::new(interface, instance).unwrap();
                let reg = itf.apply(0xa5a5_00a5);

                assert_eq!(reg & !TAMP_BOOT_MODE_ITF_MASK, 0xa5a5_00a5);
                assert_eq!(
                    (reg & TAMP_BOOT_MODE_ITF_MASK) >> TAMP_BOOT_MODE_ITF_SHIFT,
                    u32::from((interface << 4) | instance)
                );
                assert_eq!(BootInterface::from_register(reg), itf);
            }
        }
    }

    #[test]
    fn boot_interface_rejects_wide_values() {
        assert_eq!(BootInterface::new(0x11, 1), None);
        assert_eq!(BootInterface::new(1, 0x10), None);
    }

    #[test]
    fn boot_interface_display() {
        let itf = BootInterface::new(BootDevice::Emmc as u8, 2).unwrap();
        assert_eq!(itf.to_string(), "emmc instance 2");
        assert_eq!(BootInterface::default().to_string(), "none");
    }

    #[test]
    fn iwdg_flags_per_instance() {
        // IWDG2 hw enabled, IWDG1 frozen on standby
        let otp = (1 << (IWDG2_INST + HW2_OTP_IWDG_HW_POS))
            | (1 << (IWDG1_INST + HW2_OTP_IWDG_FZ_STANDBY_POS));

        assert_eq!(
            IwdgFlags::from_otp(otp, IWDG1_INST),
            Some(IwdgFlags::DISABLE_ON_STANDBY)
        );
        assert_eq!(
            IwdgFlags::from_otp(otp, IWDG2_INST),
            Some(IwdgFlags::HW_ENABLED)
        );
    }

    #[test]
    fn iwdg_merge_only_sets_freeze_bits() {
        let otp = IwdgFlags::all().merge_into_otp(0, IWDG1_INST);
        assert_eq!(otp, Some((1 << 5) | (1 << 7)));

        let otp = IwdgFlags::DISABLE_ON_STOP.merge_into_otp(0xffff_ffff, IWDG2_INST);
        assert_eq!(otp, Some(0xffff_ffff));
    }

    #[test]
    fn iwdg_instance_out_of_range() {
        for instance in [IWDG_INSTANCES, 27, 29, 31, u32::MAX] {
            assert_eq!(IwdgFlags::from_otp(0xffff_ffff, instance), None);
            assert_eq!(IwdgFlags::all().merge_into_otp(0, instance), None);
        }
    }

    #[test]
    fn ddr_carve_outs() {
        assert_eq!(ddr_ns_size(0x2000_0000), Some(0x1e00_0000));
        assert_eq!(ddr_ns_size(DDR_S_SIZE + DDR_SHMEM_SIZE), None);
        assert_eq!(ddr_ns_size(0x8000_0000), None);
    }
}
