// Copyright 2026 The cildelta Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]

//! # cildelta
//!
//! An incremental CLI (ECMA-335) metadata delta writer for Edit-and-Continue:
//! given a frozen baseline describing everything emitted up to the previous
//! generation, a change oracle classifying every symbol, and a definition map
//! resolving symbols that have existed since the original PE, `cildelta`
//! produces the metadata delta a runtime applies to an already-loaded
//! assembly - new and updated table rows continuing the baseline's numbering,
//! the `EncLog`/`EncMap` auxiliary tables, per-method local-variable
//! signatures with EnC slot annotations, delta-only heap streams, and the
//! next [`baseline::EmitBaseline`] to carry into the following edit.
//!
//! # Architecture
//!
//! The crate follows the delta pipeline leaves-first:
//!
//! - [`crate::metadata`] - tokens, table identities, signature primitives and
//!   delta heap accumulation
//! - [`crate::model`] - the arena-backed module surface, change
//!   classification, debug-info records and synthesized-local naming
//! - [`crate::index`] - row-ID indices: definition indices with
//!   cross-generation look-through, fresh indices, member-map and
//!   `MethodImpl` indices, content-addressed reference indices
//! - [`crate::baseline`] - the immutable [`baseline::EmitBaseline`] and its
//!   generation merge
//! - [`crate::writer`] - the orchestrator: change driver, reference visitor,
//!   local-signature serializer, `EncLog`/`EncMap` builders, baseline merger
//!
//! # Correctness Model
//!
//! Delta emission is bit-exact and cross-generational: every reference to an
//! existing entity must resolve to its pre-assigned row ID, every added
//! entity receives the next free ID in its table, frozen indices reject
//! mutation, and `EncMap` is strictly ascending. Violations abort the
//! emission with [`Error::Invariant`]; nothing is retried and no partial
//! baseline escapes.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use cildelta::prelude::*;
//!
//! let writer = DeltaMetadataWriter::new(
//!     &module, &baseline, &changes, &definition_map,
//!     EmitOptions::default(), CancellationToken::new(),
//! );
//! let delta = writer.emit(fresh_enc_id, &mut NullSink)?;
//! for diagnostic in &delta.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! let next_baseline = delta.next_baseline;
//! # Ok::<(), cildelta::Error>(())
//! ```

#[macro_use]
mod error;

pub mod baseline;
pub mod cancellation;
pub mod diagnostics;
pub mod index;
pub mod metadata;
pub mod model;
pub mod options;
pub mod prelude;
pub mod writer;

pub use cancellation::CancellationToken;
pub use error::Error;
pub use options::{DebugInformationFormat, EmitOptions};
pub use writer::{DeltaMetadataWriter, DeltaSink, DeltaView, EncDelta, NullSink};

/// Crate-wide result type, wrapping [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;
