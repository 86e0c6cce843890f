//! Row-ID indices for the delta's metadata tables.
//!
//! Three index families cover every table the writer numbers itself:
//!
//! - [`definition::DefinitionIndex`] - tables whose rows have stable identity
//!   across generations (types, methods, fields, events, properties), with
//!   look-through to previous deltas and the definition map;
//! - [`definition::FreshIndex`] - parameter and generic-parameter rows, which
//!   are always emitted fresh for an added or edited method;
//! - [`member_map::MemberMapIndex`] / [`member_map::MethodImplIndex`] -
//!   `EventMap`/`PropertyMap` rows keyed by owning type and `MethodImpl` rows
//!   keyed by occurrence;
//! - [`reference::ReferenceIndex`] - content-addressed reference tables.
//!
//! All indices continue the baseline's numbering (`first = previous + 1`) and
//! freeze once read; the invariants are asserted, not hoped for.

pub mod definition;
pub mod member_map;
pub mod reference;
