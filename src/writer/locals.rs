//! Local-variable signature serialization and the pooled blob builder.
//!
//! For every method body this delta emits, the writer produces the method's
//! stand-alone local signature - the `0x07` header, the compressed local
//! count, then each slot's serialized type - interns it in the `#Blob` heap
//! and the `StandAloneSig` index, and records one
//! [`crate::model::debug_info::EncLocalInfo`] per slot so the debugger can map
//! IL offsets across generations. Slots that carry a signature blob cached
//! from a previous generation are appended verbatim; the serializer does not
//! recurse into their type graphs.
//!
//! Scratch buffers come from a [`BlobPool`]. The pool hands out a guard that
//! returns the buffer on drop, so every exit path - including cancellation
//! between methods - releases the buffer without per-return bookkeeping.

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::index::definition::IndexRow;
use crate::index::reference::StandAloneSigValue;
use crate::metadata::signatures::{write_compressed_uint, ELEMENT_TYPE, SIGNATURE_HEADER};
use crate::metadata::tables::TableId;
use crate::model::debug_info::{EncLocalInfo, MethodDebugId, MethodDebugInfo};
use crate::model::locals::LocalSlotConstraints;
use crate::model::{LocalType, MethodId};
use crate::writer::DeltaMetadataWriter;
use crate::Result;

/// A pool of reusable byte buffers for signature serialization.
///
/// Cloning shares the pool; buffers flow back on guard drop. The pool is
/// single-threaded, like the writer that owns it.
#[derive(Clone, Debug, Default)]
pub struct BlobPool {
    free: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl BlobPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a cleared buffer, reusing a pooled allocation when available.
    #[must_use]
    pub fn acquire(&self) -> PooledBlob {
        let buffer = self.free.borrow_mut().pop().unwrap_or_default();
        PooledBlob { pool: self.clone(), buffer }
    }

    #[cfg(test)]
    fn pooled_count(&self) -> usize {
        self.free.borrow().len()
    }
}

/// A pooled byte buffer; dereferences to `Vec<u8>` and returns itself to the
/// pool when dropped, on every exit path.
#[derive(Debug)]
pub struct PooledBlob {
    pool: BlobPool,
    buffer: Vec<u8>,
}

impl Deref for PooledBlob {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buffer
    }
}

impl DerefMut for PooledBlob {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }
}

impl Drop for PooledBlob {
    fn drop(&mut self) {
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.clear();
        self.pool.free.borrow_mut().push(buffer);
    }
}

impl<'a> DeltaMetadataWriter<'a> {
    /// Phase 3: serialize local signatures for every emitted method body and
    /// record the per-method debug information.
    pub(super) fn serialize_method_bodies(&mut self) -> Result<()> {
        // Reading the rows freezes the method index; every method of this
        // delta is known by now.
        let rows: Vec<IndexRow<MethodId>> = self.method_defs.rows().to_vec();
        let generation = self.generation();

        for row in rows {
            self.cancel.check()?;
            let method = self.module.method(row.item);
            let Some(body) = &method.body else { continue };

            let local_infos = self.serialize_local_variables_signature(row.row_id, &body.locals)?;

            if !method.implicitly_declared {
                self.added_or_changed_methods.insert(
                    row.row_id,
                    MethodDebugInfo {
                        id: MethodDebugId { ordinal: method.method_ordinal, generation },
                        locals: local_infos,
                        lambdas: body.lambdas.clone(),
                        closures: body.closures.clone(),
                        state_machine: body.state_machine.clone(),
                    },
                );
            }

            if body.has_sequence_points {
                self.updated_methods.push(TableId::MethodDef.token(row.row_id));
            }
        }
        Ok(())
    }

    /// Serializes one method's local signature, interning the blob and the
    /// `StandAloneSig` row, and returns the per-slot EnC records. Bodies with
    /// no locals produce no signature and no records.
    fn serialize_local_variables_signature(
        &mut self,
        method_row: u32,
        locals: &[crate::model::LocalDefinition],
    ) -> Result<Vec<EncLocalInfo>> {
        if locals.is_empty() {
            return Ok(Vec::new());
        }

        let pool = self.blob_pool.clone();
        let mut blob = pool.acquire();
        blob.push(SIGNATURE_HEADER::LOCAL_SIG);
        write_compressed_uint(locals.len() as u32, &mut blob);

        let mut infos = Vec::with_capacity(locals.len());
        for local in locals {
            // Naming is part of the debugger contract: a slot whose kind must
            // be named under the current debug level arrives named.
            debug_assert!(
                local.name.is_some() || !local.kind.is_named(self.options.debug_information),
                "unnamed local of kind {:?} requires a name",
                local.kind
            );
            let start = blob.len();
            match &local.ty {
                LocalType::Serialized(cached) => blob.extend_from_slice(cached),
                LocalType::Signature(signature) => {
                    if local.constraints.contains(LocalSlotConstraints::PINNED) {
                        blob.push(ELEMENT_TYPE::PINNED);
                    }
                    if local.constraints.contains(LocalSlotConstraints::BYREF) {
                        blob.push(ELEMENT_TYPE::BYREF);
                    }
                    self.serialize_type_signature(signature, &mut blob)?;
                }
            }
            let signature = blob[start..].to_vec();
            infos.push(match local.id {
                None => EncLocalInfo::Temporary { signature },
                Some(id) => EncLocalInfo::Slot {
                    id,
                    kind: local.kind,
                    constraints: local.constraints,
                    signature,
                },
            });
        }

        self.heaps.get_or_add_blob(&blob);
        let sig_row = self
            .standalone_sigs
            .get_or_add(StandAloneSigValue { signature: blob.to_vec() });
        let token = TableId::StandAloneSig.token(sig_row);
        self.local_signatures.insert(method_row, token);
        tracing::trace!(method_row, %token, locals = locals.len(), "serialized local signature");

        Ok(infos)
    }
}
