//
// SPDX-License-Identifier: MIT
//

#![cfg_attr(
    feature = "testing",
    allow(dead_code, unused_variables, unused_imports)
)]

pub mod config;
pub mod debug;
pub mod error;
pub mod events;
pub mod facade;
pub mod iface;
pub mod master;
pub mod model;
pub mod monitor;
pub mod nms;
pub mod provisioning;
pub mod registry;
pub mod tasks;
