//! Page codec module
//!
//! Turns listing response bodies into `Page<Value>`.
//!
//! # Overview
//!
//! The codec is a collaborator of the pagination core: it reports which
//! items a response holds and whether a continuation marker is present,
//! and nothing else. Marker locations vary by provider:
//! - a scalar field (`MarkerSource::Field`)
//! - a `next` link whose href carries `?marker=` (`MarkerSource::Links`)

pub mod href;
mod json;
mod types;

pub use json::{lookup_path, JsonPageCodec};
pub use types::{MarkerSource, PageCodec};
