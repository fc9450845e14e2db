mod runner;


pub use runner::{Reconciler, ReconcilerConfig, RECONCILER_LEASE};
