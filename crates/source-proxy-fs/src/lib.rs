//! A source proxy serving objects from the file system
//!
//! [`FileSystem`] implements [`Source`](source_proxy::source::Source) on top
//! of a local directory: every prefix is a subdirectory of the root and every
//! object a regular file inside it.
//!
//! With the `binary` feature this crate also builds the `source-proxy-fs`
//! server.

#![allow(clippy::module_name_repetitions)]

mod fs;

pub use self::fs::FileSystem;
