//! Directory-domain support types
//!
//! The directory and global event variants carry only plain fields; this
//! module exists to keep the domain split symmetric and to host future
//! directory-scoped payload types.
