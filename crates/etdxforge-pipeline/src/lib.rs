// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Etdxforge — parallel page pipeline and the two conversion entry points.

pub mod context;
pub mod convert;
pub mod executor;

pub use context::RunContext;
pub use convert::{etdx_to_pdf, pdf_to_etdx, ConversionReport};
pub use executor::CancelFlag;
