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

//! Consensus message types for riptide validators.
//!
//! A vote or proposal carries more fields than participate in its signing
//! identity; the [`canonical`] module defines the deterministic byte
//! encodings that signatures cover. Vote extensions and their signatures
//! are never part of the base canonical bytes.

pub mod canonical;
pub mod proposal;
pub mod vote;

pub use proposal::Proposal;
pub use vote::{BlockId, PartSetHeader, SignedMsgType, Vote};

/// UNIX timestamp in nanoseconds.
pub type Timestamp = u64;
