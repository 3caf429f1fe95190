// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ETDX container codec.
//
// An ETDX archive is a ZIP with three top-level JSON manifests and one
// folder per page:
//
//   <name>.etdx
//   ├── project.json
//   ├── master_template.json
//   ├── page_list.json
//   ├── page_1/
//   │   ├── page_1.json
//   │   └── page_1.jpg
//   └── page_2/ ...
//
// page_list.json order is authoritative for document order even when
// folder numbering is sparse.

pub mod manifest;
pub mod reader;
pub mod writer;

pub use manifest::{MasterTemplate, PageManifest, ProjectManifest};
pub use reader::{decode, DecodedArchive};
pub use writer::encode;
