#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Shared value types for the cmeval CMake evaluator
//!
//! CMake values are byte strings with language-level conventions layered on
//! top: semicolon-separated lists, a fixed set of false-like spellings, and
//! loose 2-to-4 component version numbers. This crate owns those
//! conventions so the parser, evaluator and event consumers agree on them.

pub mod value;
pub mod version;

pub use value::{
    eq_ignore_ascii_case, is_cmake_false, is_cmake_true, join_list, split_list_genex_aware,
};
pub use version::CmakeVersion;
