//! Infrastructure layer: persistence adapters and demo data.

pub mod seed;
pub mod store;

pub use seed::{SeedReport, clear_task_data, seed_demo_data};
pub use store::{
    DynStore, InMemoryStore, PostgresStore, SessionStore, Store, StoreError, StoreResult,
    TaskStore, UserStore,
};
