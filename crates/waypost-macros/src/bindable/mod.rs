//! Implementation of the `#[derive(Bindable)]` macro.
//!
//! This module turns struct and enum declarations into the model metadata
//! the waypost binder walks.

mod attrs;
mod derive;

pub use derive::bindable_derive_impl;
