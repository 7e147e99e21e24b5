//! Business identifier numbering
//!
//! Two leaf components with no dependency on the rest of the engine:
//! - [`allocator`]: monotonically increasing, gap-tolerant sequence numbers
//!   scoped by `(entity kind, zone, year)`
//! - [`format`]: the fixed human-readable identifier formats consumed by
//!   external systems (bit-exact contracts, never changed silently)

pub mod allocator;
pub mod format;

pub use allocator::SequenceAllocator;
pub use format::{
    format_contract_number, format_meter_number, is_valid_contract_number,
    is_valid_meter_number, parse_contract_number, zone_code, NumberFormatError,
    ParsedContractNumber,
};
