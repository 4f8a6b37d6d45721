//! Ancillary helpers, not tied to the core machinery.

pub mod logger;
