// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Storage collaborators and their in-memory implementations.

mod group;
mod token;

pub use group::{Group, GroupId, GroupPatch, GroupStore, MemoryGroupStore, NewGroup};
pub use token::{MemoryTokenStore, TokenStore};
