//! Database model modules - extends Database with domain-specific methods
//!
//! Each module adds `impl Database` blocks with methods for a specific table.

pub mod like_requests; // like_requests (verification + fulfillment queue)
mod profiles;          // user_profiles (VIP flag, cooldown anchor)
mod worker_leases;     // worker_leases (single active reconciler)
