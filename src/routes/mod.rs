/// Router Module Index
///
/// Splits routing by the access each group expects. Access is decided for every
/// request by the edge gate (`crate::gate::edge_gate`) wrapped around the merged router;
/// the split documents which side of that decision each route sits on.

/// Routes reachable without a session (covered by the public route rules).
pub mod public;

/// Routes that need a valid session.
pub mod authenticated;

/// Client-rendered page shells. Public or protected per the route rules.
pub mod pages;
