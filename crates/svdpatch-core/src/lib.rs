//! Tree mutation primitives for the CMSIS-SVD patch engine: field-level,
//! register-level, peripheral-level, and device-level operations, plus the
//! `process_device` entry point that walks a whole patch document.

mod builders;
mod device;
mod error;
mod field;
mod helpers;
mod register;

pub use builders::{make_derived_enumerated_values, make_enumerated_values, make_write_constraint};
pub use device::{
    add_peripheral, clear_fields as clear_device_fields, copy_peripheral, delete_peripheral, derive_peripheral,
    iter_peripherals, modify_child, modify_cpu, modify_peripheral, process_device, process_peripheral,
    rebase_peripheral,
};
pub use error::{PatchError, Result};
pub use field::{
    add_field, clear_field, collect_fields_in_array, delete_field, iter_fields, iter_fields_with_matches, merge_fields,
    modify_field, process_field, process_field_enum, process_field_range, split_fields, strip as strip_fields,
};
pub use helpers::{check_bitmasks, check_offsets, field_offset_width, parse_int, register_bitmask, register_size};
pub use register::{
    add_interrupt, add_register, clear_fields as clear_register_fields, collect_in_array, collect_in_cluster,
    delete_interrupt, delete_register, derive_register, get_bitmask, iter_clusters, iter_interrupts, iter_registers,
    iter_registers_with_matches, modify_cluster, modify_interrupt, modify_register, process_register,
    strip as strip_registers,
};
