//! QingCloud resource schema definitions

pub mod eip;
