// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Etdxforge — ETDX container codec, paper-size inference, and PDF
// assembly/rasterization.

pub mod container;
pub mod paper;
pub mod pdf;

pub use container::{reader, writer, DecodedArchive};
pub use paper::{points_to_mm, resolve, resolve_mm};
