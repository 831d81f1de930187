// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Board identification. The OTP word holding the board id is not fixed:
//! the device tree names it through the `reg` property of the BSEC's
//! `board_id` subnode.

use crate::fuse::FuseStore;
use crate::platform::DeviceTree;
use crate::Error;
use log::{debug, error, info, trace};
use mp1_areas::{BoardId, DT_BOARD_ID_NODE, DT_BSEC_COMPAT};

pub struct Board<'a> {
    fuses: &'a dyn FuseStore,
    dt: &'a dyn DeviceTree,
}

impl<'a> Board<'a> {
    pub fn new(fuses: &'a dyn FuseStore, dt: &'a dyn DeviceTree) -> Board<'a> {
        Board { fuses, dt }
    }

    /// OTP word holding the board id, or `None` if this board doesn't
    /// describe one. A `board_id` node without `reg` is an error.
    pub fn board_id_otp(&self) -> Result<Option<u32>, Error> {
        let Some(bsec) = self.dt.node_by_compatible(DT_BSEC_COMPAT) else {
            debug!("no {DT_BSEC_COMPAT} node");
            return Ok(None);
        };

        let Some(node) = self.dt.subnode(bsec, DT_BOARD_ID_NODE) else {
            debug!("no {DT_BOARD_ID_NODE} node");
            return Ok(None);
        };

        // reg is a byte offset into the OTP area
        let reg = self
            .dt
            .property_u32(node, "reg")
            .ok_or(Error::MissingProperty {
                node: DT_BOARD_ID_NODE,
                property: "reg",
            })?;

        Ok(Some(reg / 4))
    }

    /// `Ok(None)` covers both a board without a board id node and an
    /// unprogrammed (zero) board id word.
    pub fn board_id(&self) -> Result<Option<BoardId>, Error> {
        let Some(otp) = self.board_id_otp()? else {
            return Ok(None);
        };

        let word = self
            .fuses
            .shadow_and_read(otp)
            .map_err(Error::unavailable(otp))?;
        trace!("board id OTP {otp}: {word:#010x}");

        Ok(BoardId::from_otp(word)?)
    }

    /// `model` of the device tree root node
    pub fn model(&self) -> Option<&'a str> {
        let dt = self.dt;
        let root = dt.path_offset("/")?;

        dt.property_str(root, "model")
    }

    /// Log the board id. A board id that cannot be read is logged and
    /// otherwise ignored; only a malformed device tree is an error.
    pub fn print_board_info(&self) -> Result<(), Error> {
        match self.board_id() {
            Ok(Some(id)) => info!("Board: {}", id.info()),
            Ok(None) => {}
            Err(Error::FuseUnavailable { otp, source }) => {
                error!("BSEC: board id OTP {otp} error ({source})");
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }
}
