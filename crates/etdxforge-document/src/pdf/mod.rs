// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF assembly (images to pages) and rasterization (pages to images).

pub mod assembler;
pub mod rasterizer;

pub use assembler::assemble;
pub use rasterizer::{rasterize, RasterizedPage};
