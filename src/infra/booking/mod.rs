// Implementations of the BookingStore port.

#[cfg(test)]
pub mod in_memory;
pub mod sheets_store;

#[cfg(test)]
pub use in_memory::InMemoryBookingStore;
pub use sheets_store::SheetsBookingStore;
