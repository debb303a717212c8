// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Block proposals.

use serde::{Deserialize, Serialize};

use crate::vote::BlockId;
use crate::Timestamp;

/// A proposal for a block at a given height and round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub height: i64,
    pub round: i32,
    /// Proof-of-lock round; -1 when the proposer holds no lock.
    pub pol_round: i32,
    pub block_id: Option<BlockId>,
    pub timestamp: Timestamp,
    pub signature: Vec<u8>,
}
