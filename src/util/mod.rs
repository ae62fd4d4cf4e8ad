//! Utility modules for domoxide.
//!
//! Contains `QName` handling and XML Name validation.

pub mod qname;
