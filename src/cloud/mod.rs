//! Record store abstraction.
//!
//! - `record` - zone/record identifiers and typed field values
//! - `zone` - the `ZoneStore` and `ZoneDelegate` traits and `ZoneError`
//! - `memory` - an in-process `ZoneStore`

mod memory;
mod record;
mod zone;

pub use memory::{MemoryZoneStore, StoreCall, StoreOp};
pub use record::{
    FieldValue, Record, RecordId, RecordQuery, RecordReference, ReferenceAction, ZoneId,
    CURRENT_USER_OWNER,
};
pub use zone::{ZoneDelegate, ZoneError, ZoneStore};
