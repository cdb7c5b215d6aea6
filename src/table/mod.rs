//! Generation-checked slot tables.
//!
//! Two storage policies share one [`Handle`] type:
//!
//! - [`SlotTable`] grows on demand and backs the job store of the schedulers.
//! - [`StaticSlotTable`] lives in fixed arrays for bounded, pre-sized use.

mod handle;
mod slot_table;
mod static_table;

pub use handle::Handle;
pub use slot_table::SlotTable;
pub use static_table::StaticSlotTable;
