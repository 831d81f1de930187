// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Collaborators other than the fuse store: the debug unit, the device
//! tree, the RCC clock gates and the TAMP backup registers.

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

/// DBGMCU cannot be read once debug has been disabled by the security
/// configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("debug unit disabled")]
pub struct DebugDisabled;

pub trait DebugUnit {
    /// REV_ID field of DBGMCU_IDC
    fn chip_version(&self) -> Result<u32, DebugDisabled>;

    /// DEV_ID field of DBGMCU_IDC
    fn chip_dev_id(&self) -> Result<u32, DebugDisabled>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeOffset(pub usize);

/// Read-only view of the flattened device tree handed to the boot stage.
///
/// Lookups that find nothing return `None`; whether that matters is up to
/// the caller.
pub trait DeviceTree {
    /// First node whose `compatible` list contains `compatible`
    fn node_by_compatible(&self, compatible: &str) -> Option<NodeOffset>;

    /// Direct child of `parent` called `name`. A unit address in the node
    /// name (`name@addr`) is ignored when `name` has none.
    fn subnode(&self, parent: NodeOffset, name: &str) -> Option<NodeOffset>;

    fn path_offset(&self, path: &str) -> Option<NodeOffset>;

    /// Raw property bytes, as stored in the blob
    fn property(&self, node: NodeOffset, name: &str) -> Option<&[u8]>;

    /// First cell of a property. Cells are big-endian in the blob.
    fn property_u32(&self, node: NodeOffset, name: &str) -> Option<u32> {
        let prop = self.property(node, name)?;

        if prop.len() < 4 {
            return None;
        }

        Some(BigEndian::read_u32(&prop[..4]))
    }

    /// A string property, up to its terminating NUL
    fn property_str(&self, node: NodeOffset, name: &str) -> Option<&str> {
        let prop = self.property(node, name)?;
        let end = prop.iter().position(|&b| b == 0).unwrap_or(prop.len());

        std::str::from_utf8(&prop[..end]).ok()
    }
}

/// RCC gates we need to touch
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClockId {
    /// APB clock of RTC and TAMP, which gates the backup registers
    Rtcapb,
}

/// Reference counted clock gating. Other users share these gates and
/// expect them off unless somebody holds a reference.
pub trait ClockControl {
    fn enable(&self, clock: ClockId);
    fn disable(&self, clock: ClockId);
}

/// Holds `clock` enabled for as long as it lives.
pub struct ClockGuard<'a> {
    clocks: &'a dyn ClockControl,
    clock: ClockId,
}

impl<'a> ClockGuard<'a> {
    pub fn enable(clocks: &'a dyn ClockControl, clock: ClockId) -> ClockGuard<'a> {
        clocks.enable(clock);

        ClockGuard { clocks, clock }
    }
}

impl Drop for ClockGuard<'_> {
    fn drop(&mut self) {
        self.clocks.disable(self.clock);
    }
}

/// TAMP backup registers. Their clock must be enabled around every access.
pub trait BackupRegisters {
    fn read_backup(&self, id: u32) -> u32;
    fn write_backup(&self, id: u32, value: u32);
}
