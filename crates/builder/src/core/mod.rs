//! Core module containing the emission context

pub mod context;
