// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A simulated STM32MP15 platform.
//!
//! [`SimDevice`] implements every collaborator trait on top of plain
//! memory: the BSEC shadow registers with their sticky locks, DBGMCU, a
//! small device tree, the TAMP backup registers and the RCC gates. It
//! journals every fuse store operation and can be told to fail any of
//! them, which is what the tests and the `mp1-otp` tool run against.
//!
//! A device is described in TOML:
//!
//! ```toml
//! stage = "bl2"
//!
//! [[otp]]
//! index = 1
//! value = 0x24
//!
//! [debug]
//! chip-version = 0x2000
//! dev-id = 0x500
//!
//! [[device-tree]]
//! path = "/soc/efuse@5c005000"
//! compatible = ["st,stm32mp15-bsec"]
//!
//! [[device-tree]]
//! path = "/soc/efuse@5c005000/board_id@ec"
//! properties = { reg = [0xec, 0x4] }
//! ```

use crate::fuse::{BsecError, FuseStore};
use crate::platform::{
    BackupRegisters, ClockControl, ClockId, DebugDisabled, DebugUnit, DeviceTree, NodeOffset,
};
use crate::Error;
use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, trace, warn};
use mp1_areas::{BootStage, OTP_MAX_ID};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// Number of TAMP backup registers
pub const TAMP_BACKUP_REGS: u32 = 32;

/// Fuse store operations, as recorded in the journal
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BsecOp {
    Shadow,
    Read,
    Write,
    LockRead,
    LockWrite,
}

/// State of one OTP word
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct OtpWord {
    /// Value burnt in the fuse array
    pub fuse: u32,
    /// Value currently in the shadow register
    pub shadow: u32,
    /// Sticky shadow-read lock: reloads keep the current shadow
    pub read_locked: bool,
    /// Sticky shadow-write lock: writes are refused
    pub write_locked: bool,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
struct ClockState {
    refcount: u32,
    enables: u32,
    disables: u32,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<usize>,
    compatible: Vec<String>,
    properties: BTreeMap<String, PropValue>,
    raw: BTreeMap<String, Vec<u8>>,
}

impl Node {
    fn new(name: &str, parent: Option<usize>) -> Node {
        Node {
            name: name.to_string(),
            parent,
            compatible: Vec::new(),
            properties: BTreeMap::new(),
            raw: BTreeMap::new(),
        }
    }
}

pub struct SimDevice {
    stage: BootStage,
    otp: RefCell<Vec<OtpWord>>,
    faults: RefCell<BTreeMap<(BsecOp, u32), BsecError>>,
    journal: RefCell<Vec<(BsecOp, u32)>>,
    debug: Option<DebugConfig>,
    nodes: Vec<Node>,
    backup: RefCell<Vec<u32>>,
    clocks: RefCell<BTreeMap<ClockId, ClockState>>,
    gated_accesses: Cell<u32>,
}

impl Default for SimDevice {
    fn default() -> SimDevice {
        SimDevice::new(BootStage::default())
    }
}

impl SimDevice {
    /// A blank device: nothing fused, debug disabled, an empty device tree.
    pub fn new(stage: BootStage) -> SimDevice {
        SimDevice {
            stage,
            otp: RefCell::new(vec![OtpWord::default(); OTP_MAX_ID as usize + 1]),
            faults: RefCell::new(BTreeMap::new()),
            journal: RefCell::new(Vec::new()),
            debug: None,
            nodes: vec![Node::new("", None)],
            backup: RefCell::new(vec![0; TAMP_BACKUP_REGS as usize]),
            clocks: RefCell::new(BTreeMap::new()),
            gated_accesses: Cell::new(0),
        }
    }

    pub fn from_config(config: &SimConfig) -> Result<SimDevice, Error> {
        let mut dev = SimDevice::new(config.stage);

        for entry in &config.otp {
            let mut otp = dev.otp.borrow_mut();
            let word = otp
                .get_mut(entry.index as usize)
                .ok_or(Error::OtpIndex(entry.index))?;

            *word = OtpWord {
                fuse: entry.value,
                shadow: entry.shadow.unwrap_or(entry.value),
                read_locked: entry.read_locked,
                write_locked: entry.write_locked,
            };
        }

        dev.debug = config.debug;

        for node in &config.device_tree {
            let offset = dev.add_node(&node.path)?;
            dev.set_compatible(offset, &node.compatible);
            for (name, value) in &node.properties {
                dev.set_property(offset, name, value.clone());
            }
        }

        for entry in &config.backup {
            let mut backup = dev.backup.borrow_mut();
            let reg = backup
                .get_mut(entry.id as usize)
                .ok_or(Error::BackupRegister(entry.id))?;
            *reg = entry.value;
        }

        for fault in &config.faults {
            match BsecError::from_status(fault.status) {
                Err(e) => dev.inject_fault(fault.op, fault.otp, e),
                Ok(()) => warn!(
                    "ignoring fault on {:?} OTP {} with OK status",
                    fault.op, fault.otp
                ),
            }
        }

        Ok(dev)
    }

    pub fn from_toml(s: &str) -> Result<SimDevice, Error> {
        let config: SimConfig = toml::from_str(s)?;

        SimDevice::from_config(&config)
    }

    /// Describe the current state of the device, including everything
    /// written to it since it was created.
    pub fn snapshot(&self) -> SimConfig {
        let otp = self
            .otp
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, w)| **w != OtpWord::default())
            .map(|(index, w)| OtpEntry {
                index: index as u32,
                value: w.fuse,
                shadow: (w.shadow != w.fuse).then_some(w.shadow),
                read_locked: w.read_locked,
                write_locked: w.write_locked,
            })
            .collect();

        let device_tree = (0..self.nodes.len())
            .filter(|&i| {
                let n = &self.nodes[i];
                i != 0 || !n.compatible.is_empty() || !n.properties.is_empty()
            })
            .map(|i| NodeConfig {
                path: self.node_path(i),
                compatible: self.nodes[i].compatible.clone(),
                properties: self.nodes[i].properties.clone(),
            })
            .collect();

        let backup = self
            .backup
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .map(|(id, v)| BackupEntry {
                id: id as u32,
                value: *v,
            })
            .collect();

        let faults = self
            .faults
            .borrow()
            .iter()
            .map(|(&(op, otp), &e)| FaultConfig {
                op,
                otp,
                status: e as u32,
            })
            .collect();

        SimConfig {
            stage: self.stage,
            otp,
            debug: self.debug,
            device_tree,
            backup,
            faults,
        }
    }

    pub fn to_toml(&self) -> Result<String, Error> {
        Ok(toml::to_string(&self.snapshot())?)
    }

    /// Load a raw OTP dump: consecutive little-endian words starting at
    /// OTP 0. Loaded words are both fused and shadowed.
    pub fn load_otp_image(&self, image: &[u8]) -> Result<(), Error> {
        if image.len() % 4 != 0 {
            return Err(Error::OtpImage(image.len()));
        }

        let words = image.len() / 4;
        if words > OTP_MAX_ID as usize + 1 {
            return Err(Error::OtpIndex(words as u32 - 1));
        }

        let mut rdr = image;
        let mut otp = self.otp.borrow_mut();
        for word in otp.iter_mut().take(words) {
            let value = rdr.read_u32::<LittleEndian>()?;
            word.fuse = value;
            word.shadow = value;
        }

        debug!("loaded {words} OTP words from image");

        Ok(())
    }

    pub fn stage(&self) -> BootStage {
        self.stage
    }

    /// Fuse and shadow `otp` with `value`
    pub fn set_otp(&self, otp: u32, value: u32) {
        if let Some(w) = self.otp.borrow_mut().get_mut(otp as usize) {
            w.fuse = value;
            w.shadow = value;
        }
    }

    /// Change only the shadow register, as an earlier stage could have
    pub fn set_shadow(&self, otp: u32, value: u32) {
        if let Some(w) = self.otp.borrow_mut().get_mut(otp as usize) {
            w.shadow = value;
        }
    }

    pub fn otp(&self, otp: u32) -> Option<OtpWord> {
        self.otp.borrow().get(otp as usize).copied()
    }

    pub fn set_debug(&mut self, debug: Option<DebugConfig>) {
        self.debug = debug;
    }

    /// Make every later `op` on `otp` fail with `error`
    pub fn inject_fault(&self, op: BsecOp, otp: u32, error: BsecError) {
        self.faults.borrow_mut().insert((op, otp), error);
    }

    pub fn clear_fault(&self, op: BsecOp, otp: u32) {
        self.faults.borrow_mut().remove(&(op, otp));
    }

    /// Every fuse store operation attempted so far, failed ones included
    pub fn journal(&self) -> Vec<(BsecOp, u32)> {
        self.journal.borrow().clone()
    }

    pub fn clear_journal(&self) {
        self.journal.borrow_mut().clear();
    }

    pub fn count(&self, op: BsecOp) -> usize {
        self.journal.borrow().iter().filter(|(o, _)| *o == op).count()
    }

    pub fn count_for(&self, op: BsecOp, otp: u32) -> usize {
        self.journal
            .borrow()
            .iter()
            .filter(|&&entry| entry == (op, otp))
            .count()
    }

    /// Create the node at `path` along with any missing parents
    pub fn add_node(&mut self, path: &str) -> Result<NodeOffset, Error> {
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| Error::NodePath(path.to_string()))?;

        let mut current = 0;
        for name in rest.split('/').filter(|n| !n.is_empty()) {
            current = match self.child(current, |n| n == name) {
                Some(i) => i,
                None => {
                    self.nodes.push(Node::new(name, Some(current)));
                    self.nodes.len() - 1
                }
            };
        }

        Ok(NodeOffset(current))
    }

    pub fn set_compatible(&mut self, node: NodeOffset, compatible: &[String]) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.compatible = compatible.to_vec();
        }
    }

    pub fn set_property(&mut self, node: NodeOffset, name: &str, value: PropValue) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.raw.insert(name.to_string(), value.encode());
            n.properties.insert(name.to_string(), value);
        }
    }

    pub fn clock_enabled(&self, clock: ClockId) -> bool {
        self.clock_state(clock).refcount > 0
    }

    pub fn clock_enables(&self, clock: ClockId) -> u32 {
        self.clock_state(clock).enables
    }

    pub fn clock_disables(&self, clock: ClockId) -> u32 {
        self.clock_state(clock).disables
    }

    /// Backup register accesses made while the RTCAPB clock was off
    pub fn gated_accesses(&self) -> u32 {
        self.gated_accesses.get()
    }

    pub fn backup(&self, id: u32) -> Option<u32> {
        self.backup.borrow().get(id as usize).copied()
    }

    fn clock_state(&self, clock: ClockId) -> ClockState {
        self.clocks
            .borrow()
            .get(&clock)
            .copied()
            .unwrap_or_default()
    }

    fn child(&self, parent: usize, matches: impl Fn(&str) -> bool) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.parent == Some(parent) && matches(&n.name))
    }

    fn node_path(&self, mut i: usize) -> String {
        let mut names = Vec::new();
        while let Some(parent) = self.nodes[i].parent {
            names.push(self.nodes[i].name.as_str());
            i = parent;
        }
        names.reverse();

        format!("/{}", names.join("/"))
    }

    /// Journal `op`, then apply the usual BSEC checks
    fn begin(&self, op: BsecOp, otp: u32) -> Result<usize, BsecError> {
        self.journal.borrow_mut().push((op, otp));

        if otp > OTP_MAX_ID {
            return Err(BsecError::InvalidParam);
        }

        if let Some(&e) = self.faults.borrow().get(&(op, otp)) {
            debug!("injected {e:?} on {op:?} OTP {otp}");
            return Err(e);
        }

        Ok(otp as usize)
    }

    fn check_gate(&self, what: &str, id: u32) {
        if !self.clock_enabled(ClockId::Rtcapb) {
            warn!("backup register {id} {what} with RTCAPB gated");
            self.gated_accesses.set(self.gated_accesses.get() + 1);
        }
    }
}

impl FuseStore for SimDevice {
    fn shadow(&self, otp: u32) -> Result<(), BsecError> {
        let i = self.begin(BsecOp::Shadow, otp)?;
        let mut words = self.otp.borrow_mut();
        let w = &mut words[i];

        if !w.read_locked {
            w.shadow = w.fuse;
        }

        Ok(())
    }

    fn read(&self, otp: u32) -> Result<u32, BsecError> {
        let i = self.begin(BsecOp::Read, otp)?;
        let value = self.otp.borrow()[i].shadow;

        trace!("OTP {otp}: {value:#010x}");

        Ok(value)
    }

    fn write(&self, otp: u32, value: u32) -> Result<(), BsecError> {
        let i = self.begin(BsecOp::Write, otp)?;
        let mut words = self.otp.borrow_mut();
        let w = &mut words[i];

        if w.write_locked {
            return Err(BsecError::LockFail);
        }

        w.shadow = value;

        Ok(())
    }

    fn lock_read(&self, otp: u32) -> Result<(), BsecError> {
        let i = self.begin(BsecOp::LockRead, otp)?;
        self.otp.borrow_mut()[i].read_locked = true;

        Ok(())
    }

    fn lock_write(&self, otp: u32) -> Result<(), BsecError> {
        let i = self.begin(BsecOp::LockWrite, otp)?;
        self.otp.borrow_mut()[i].write_locked = true;

        Ok(())
    }
}

impl DebugUnit for SimDevice {
    fn chip_version(&self) -> Result<u32, DebugDisabled> {
        self.debug.map(|d| d.chip_version).ok_or(DebugDisabled)
    }

    fn chip_dev_id(&self) -> Result<u32, DebugDisabled> {
        self.debug.map(|d| d.dev_id).ok_or(DebugDisabled)
    }
}

impl DeviceTree for SimDevice {
    fn node_by_compatible(&self, compatible: &str) -> Option<NodeOffset> {
        self.nodes
            .iter()
            .position(|n| n.compatible.iter().any(|c| c == compatible))
            .map(NodeOffset)
    }

    fn subnode(&self, parent: NodeOffset, name: &str) -> Option<NodeOffset> {
        self.child(parent.0, |n| {
            n == name || (!name.contains('@') && n.split('@').next() == Some(name))
        })
        .map(NodeOffset)
    }

    fn path_offset(&self, path: &str) -> Option<NodeOffset> {
        let rest = path.strip_prefix('/')?;

        let mut current = 0;
        for name in rest.split('/').filter(|n| !n.is_empty()) {
            current = self.child(current, |n| n == name)?;
        }

        Some(NodeOffset(current))
    }

    fn property(&self, node: NodeOffset, name: &str) -> Option<&[u8]> {
        self.nodes.get(node.0)?.raw.get(name).map(Vec::as_slice)
    }
}

impl ClockControl for SimDevice {
    fn enable(&self, clock: ClockId) {
        let mut clocks = self.clocks.borrow_mut();
        let state = clocks.entry(clock).or_default();

        state.refcount += 1;
        state.enables += 1;
    }

    fn disable(&self, clock: ClockId) {
        let mut clocks = self.clocks.borrow_mut();
        let state = clocks.entry(clock).or_default();

        if state.refcount == 0 {
            warn!("{clock:?} disabled more often than enabled");
        }
        state.refcount = state.refcount.saturating_sub(1);
        state.disables += 1;
    }
}

impl BackupRegisters for SimDevice {
    fn read_backup(&self, id: u32) -> u32 {
        self.check_gate("read", id);

        self.backup(id).unwrap_or_else(|| {
            warn!("no backup register {id}");
            0
        })
    }

    fn write_backup(&self, id: u32, value: u32) {
        self.check_gate("written", id);

        match self.backup.borrow_mut().get_mut(id as usize) {
            Some(reg) => *reg = value,
            None => warn!("no backup register {id}"),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SimConfig {
    #[serde(default)]
    pub stage: BootStage,
    #[serde(default)]
    pub otp: Vec<OtpEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugConfig>,
    #[serde(default)]
    pub device_tree: Vec<NodeConfig>,
    #[serde(default)]
    pub backup: Vec<BackupEntry>,
    #[serde(default)]
    pub faults: Vec<FaultConfig>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OtpEntry {
    pub index: u32,
    pub value: u32,
    /// Shadow register, when it differs from the fuse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<u32>,
    #[serde(default)]
    pub read_locked: bool,
    #[serde(default)]
    pub write_locked: bool,
}

/// DBGMCU_IDC contents. Without it, debug is disabled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DebugConfig {
    pub chip_version: u32,
    pub dev_id: u32,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct NodeConfig {
    pub path: String,
    #[serde(default)]
    pub compatible: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PropValue {
    Cells(Vec<u32>),
    Str(String),
}

impl PropValue {
    /// Property bytes as they'd appear in a flattened device tree
    pub fn encode(&self) -> Vec<u8> {
        match self {
            PropValue::Cells(cells) => cells.iter().flat_map(|c| c.to_be_bytes()).collect(),
            PropValue::Str(s) => {
                let mut v = s.as_bytes().to_vec();
                v.push(0);
                v
            }
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BackupEntry {
    pub id: u32,
    pub value: u32,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FaultConfig {
    pub op: BsecOp,
    pub otp: u32,
    /// Raw BSEC status code
    pub status: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DK2: &str = r#"
        stage = "bl32"

        [[otp]]
        index = 1
        value = 0x24

        [[otp]]
        index = 18
        value = 0x8
        shadow = 0x28
        read-locked = true

        [debug]
        chip-version = 0x2000
        dev-id = 0x500

        [[device-tree]]
        path = "/"
        properties = { model = "STM32MP157C-DK2 Discovery Board" }

        [[device-tree]]
        path = "/soc/efuse@5c005000"
        compatible = ["st,stm32mp15-bsec"]

        [[device-tree]]
        path = "/soc/efuse@5c005000/board_id@ec"
        properties = { reg = [0xec, 0x4] }

        [[backup]]
        id = 20
        value = 0x2100

        [[faults]]
        op = "lock-write"
        otp = 18
        status = 0xfffffffa
    "#;

    #[test]
    fn parse_device() {
        let dev = SimDevice::from_toml(DK2).unwrap();

        assert_eq!(dev.stage(), BootStage::Bl32);
        assert_eq!(dev.read(1), Ok(0x24));
        assert_eq!(dev.read(18), Ok(0x28));
        assert_eq!(dev.chip_version(), Ok(0x2000));
        assert_eq!(dev.backup(20), Some(0x2100));
        assert_eq!(dev.lock_write(18), Err(BsecError::LockFail));

        let bsec = dev.node_by_compatible("st,stm32mp15-bsec").unwrap();
        let board = dev.subnode(bsec, "board_id").unwrap();
        assert_eq!(dev.property_u32(board, "reg"), Some(0xec));

        let root = dev.path_offset("/").unwrap();
        assert_eq!(
            dev.property_str(root, "model"),
            Some("STM32MP157C-DK2 Discovery Board")
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let r = SimDevice::from_toml("[[otp]]\nindex = 1\nvalue = 2\nlocked = true\n");
        assert!(matches!(r, Err(Error::TomlError(_))));
    }

    #[test]
    fn otp_index_checked() {
        let r = SimDevice::from_toml("[[otp]]\nindex = 96\nvalue = 2\n");
        assert!(matches!(r, Err(Error::OtpIndex(96))));

        let dev = SimDevice::default();
        assert_eq!(dev.read(96), Err(BsecError::InvalidParam));
    }

    #[test]
    fn snapshot_round_trips_state() {
        let dev = SimDevice::from_toml(DK2).unwrap();
        dev.write(18, 0xa8).unwrap();
        dev.lock_read(1).unwrap();

        let again = SimDevice::from_toml(&dev.to_toml().unwrap()).unwrap();

        assert_eq!(again.otp(18), dev.otp(18));
        assert_eq!(again.otp(1), dev.otp(1));
        assert_eq!(again.backup(20), Some(0x2100));
        assert_eq!(again.lock_write(18), Err(BsecError::LockFail));
        assert!(again.path_offset("/soc/efuse@5c005000/board_id@ec").is_some());
    }

    #[test]
    fn shadow_respects_read_lock() {
        let dev = SimDevice::default();
        dev.set_otp(5, 0x1);
        dev.write(5, 0x3).unwrap();

        dev.lock_read(5).unwrap();
        dev.shadow(5).unwrap();
        assert_eq!(dev.read(5), Ok(0x3));

        dev.lock_write(5).unwrap();
        assert_eq!(dev.write(5, 0x7), Err(BsecError::LockFail));
    }

    #[test]
    fn journal_records_failed_operations() {
        let dev = SimDevice::default();
        dev.inject_fault(BsecOp::Shadow, 0, BsecError::Timeout);

        assert_eq!(dev.shadow_and_read(0), Err(BsecError::Timeout));
        assert_eq!(dev.journal(), vec![(BsecOp::Shadow, 0)]);

        dev.clear_fault(BsecOp::Shadow, 0);
        assert_eq!(dev.shadow_and_read(0), Ok(0));
        assert_eq!(dev.count_for(BsecOp::Shadow, 0), 2);
        assert_eq!(dev.count(BsecOp::Read), 1);
    }

    #[test]
    fn otp_image_is_little_endian() {
        let dev = SimDevice::default();
        dev.load_otp_image(&[0x40, 0, 0, 0, 0x24, 0x00, 0x00, 0x00])
            .unwrap();

        assert_eq!(dev.read(0), Ok(0x40));
        assert_eq!(dev.read(1), Ok(0x24));

        assert!(matches!(
            dev.load_otp_image(&[0; 6]),
            Err(Error::OtpImage(6))
        ));
        assert!(matches!(
            dev.load_otp_image(&[0; 4 * 97]),
            Err(Error::OtpIndex(96))
        ));
    }

    #[test]
    fn gated_backup_access_is_counted() {
        let dev = SimDevice::default();

        dev.write_backup(20, 1);
        assert_eq!(dev.gated_accesses(), 1);

        dev.enable(ClockId::Rtcapb);
        assert_eq!(dev.read_backup(20), 1);
        dev.disable(ClockId::Rtcapb);

        assert_eq!(dev.gated_accesses(), 1);
        assert!(!dev.clock_enabled(ClockId::Rtcapb));
    }

    #[test]
    fn subnode_ignores_unit_address() {
        let mut dev = SimDevice::default();
        let parent = dev.add_node("/soc/efuse@5c005000").unwrap();
        dev.add_node("/soc/efuse@5c005000/board_id@ec").unwrap();

        assert!(dev.subnode(parent, "board_id").is_some());
        assert!(dev.subnode(parent, "board_id@ec").is_some());
        assert!(dev.subnode(parent, "board_id@f0").is_none());
        assert!(matches!(dev.add_node("soc"), Err(Error::NodePath(_))));
    }
}
