pub mod allocator;
pub mod buffer;
pub mod processor;

pub use allocator::{Allocation, BandwidthAllocator};
pub use buffer::{Admission, Buffer};
pub use processor::{Delivery, Processor};
