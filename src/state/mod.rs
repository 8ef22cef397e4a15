/// Client-side state
///
/// This module holds:
/// - The gallery data model (data.rs)
/// - The durable local like set (library.rs)

pub mod data;
pub mod library;
