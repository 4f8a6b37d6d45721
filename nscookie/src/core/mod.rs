//! Core machinery: kernel type inspection and relocatable chained reads.

pub mod inspect;
pub mod reloc;
