//! Device control: the chili pad controller and its value types.

pub mod device;
