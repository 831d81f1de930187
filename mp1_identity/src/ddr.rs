// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::platform::DeviceTree;
use crate::Error;
use log::{debug, info};
use mp1_areas::{ddr_ns_size, DT_DDR_COMPAT, DT_DDR_MEM_SIZE};
use std::cell::Cell;

/// DDR size from the device tree, and what is left of it for the
/// non-secure world.
pub struct DdrLayout<'a> {
    dt: &'a dyn DeviceTree,
    ns_size: Cell<Option<u32>>,
}

impl<'a> DdrLayout<'a> {
    pub fn new(dt: &'a dyn DeviceTree) -> DdrLayout<'a> {
        DdrLayout {
            dt,
            ns_size: Cell::new(None),
        }
    }

    pub fn size(&self) -> Result<u32, Error> {
        let Some(node) = self.dt.node_by_compatible(DT_DDR_COMPAT) else {
            info!("Cannot read DDR node in DT");
            return Err(Error::MissingProperty {
                node: DT_DDR_COMPAT,
                property: DT_DDR_MEM_SIZE,
            });
        };

        self.dt
            .property_u32(node, DT_DDR_MEM_SIZE)
            .ok_or(Error::MissingProperty {
                node: DT_DDR_COMPAT,
                property: DT_DDR_MEM_SIZE,
            })
    }

    /// DDR size minus the secure and shared memory carve-outs. Computed
    /// once.
    pub fn ns_size(&self) -> Result<u32, Error> {
        if let Some(size) = self.ns_size.get() {
            return Ok(size);
        }

        let size = self.size()?;
        let ns = ddr_ns_size(size).ok_or(Error::DdrSize(size))?;
        debug!("DDR {size:#x}, non-secure {ns:#x}");

        self.ns_size.set(Some(ns));

        Ok(ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{PropValue, SimDevice};

    fn with_ddr(size: Option<u32>) -> SimDevice {
        let mut dev = SimDevice::default();
        let node = dev.add_node("/soc/ddr@5a003000").unwrap();
        dev.set_compatible(node, &[DT_DDR_COMPAT.to_string()]);
        if let Some(size) = size {
            dev.set_property(node, DT_DDR_MEM_SIZE, PropValue::Cells(vec![size]));
        }
        dev
    }

    #[test]
    fn non_secure_size() {
        let dev = with_ddr(Some(0x2000_0000));
        let ddr = DdrLayout::new(&dev);

        assert_eq!(ddr.size().unwrap(), 0x2000_0000);
        assert_eq!(ddr.ns_size().unwrap(), 0x1e00_0000);
        assert_eq!(ddr.ns_size().unwrap(), 0x1e00_0000);
    }

    #[test]
    fn size_out_of_range() {
        let dev = with_ddr(Some(0x0200_0000));
        assert!(matches!(
            DdrLayout::new(&dev).ns_size(),
            Err(Error::DdrSize(0x0200_0000))
        ));

        let dev = with_ddr(Some(0x8000_0000));
        assert!(matches!(
            DdrLayout::new(&dev).ns_size(),
            Err(Error::DdrSize(0x8000_0000))
        ));
    }

    #[test]
    fn missing_ddr_node() {
        let dev = SimDevice::default();
        assert!(matches!(
            DdrLayout::new(&dev).ns_size(),
            Err(Error::MissingProperty { .. })
        ));

        let dev = with_ddr(None);
        assert!(DdrLayout::new(&dev).size().is_err());
    }
}
