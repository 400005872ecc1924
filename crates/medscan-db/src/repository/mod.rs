//! # Repository Module
//!
//! Database repository implementations for the sync engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OperationQueue                                                         │
//! │       │                                                                 │
//! │       │  db.store().put_json(keys::QUEUE, &items)                      │
//! │       ▼                                                                 │
//! │  LocalStore                                                            │
//! │  ├── get_json(&self, key)                                              │
//! │  └── put_json(&self, key, value)                                       │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database (local_store table)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`LocalStore`](local_store::LocalStore) - One JSON document per key

pub mod local_store;
