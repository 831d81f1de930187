// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::fuse::FuseStore;
use log::{trace, warn};
use mp1_areas::{is_secured, DATA0_OTP};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SecurityState {
    Open,
    Closed,
}

impl fmt::Display for SecurityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityState::Open => write!(f, "OPEN"),
            SecurityState::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Security state from DATA0. A device we cannot prove to be open is
/// closed: any failure to shadow or read the word yields `Closed`.
pub fn security_state(fuses: &dyn FuseStore) -> SecurityState {
    let data0 = match fuses.shadow(DATA0_OTP).and_then(|_| fuses.read(DATA0_OTP)) {
        Ok(v) => v,
        Err(e) => {
            warn!("BSEC: cannot read DATA0 ({e}), assuming closed device");
            return SecurityState::Closed;
        }
    };
    trace!("DATA0_OTP: {data0:#010x}");

    if is_secured(data0) {
        SecurityState::Closed
    } else {
        SecurityState::Open
    }
}

pub fn is_closed_device(fuses: &dyn FuseStore) -> bool {
    security_state(fuses) == SecurityState::Closed
}
