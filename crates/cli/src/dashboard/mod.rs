// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Controller/View pair that makes up the interactive dashboard.

pub mod controller;
pub mod view;

pub use controller::{poll_crossterm_event, Controller, ControllerEvent};
pub use view::{HeadlessView, RenderState, TerminalView, View};
