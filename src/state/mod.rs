/// State management module
///
/// This module holds the data the media cache keeps for the process:
/// - Shared data structures (data.rs)
/// - Collections with their two-phase load flags (snapshot.rs)
/// - The cached media permission answer (permission.rs)

pub mod data;
pub mod permission;
pub mod snapshot;
