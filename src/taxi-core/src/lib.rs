// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod frame;
pub mod trace;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use frame::{Frame, TimeOfDay};
pub use trace::Trace;
