//! Metadata primitives shared across the delta pipeline.
//!
//! This module hosts the wire-level vocabulary of ECMA-335 metadata as the
//! delta writer needs it: [`token::Token`] and [`guid::Guid`] identities,
//! [`tables::TableId`]/[`tables::TableSizes`] table bookkeeping, the signature
//! encoding primitives in [`signatures`], and the delta-only heap accumulation
//! in [`heaps`].

pub mod guid;
pub mod heaps;
pub mod signatures;
pub mod tables;
pub mod token;
