//! # Classdraft Store
//!
//! In-memory reference backend for the editor, with an axum HTTP surface.
//!
//! ```rust,ignore
//! let store = Arc::new(MemoryStore::new(HistoryStrategy::Delta { keyframe_every: 20 }));
//! store.create_document("essay".into(), DocumentKind::AssignmentResponse).await?;
//!
//! // In-process, as a PersistenceClient
//! let session = EditSession::open(store.clone(), "essay".into(), None).await?;
//!
//! // Or over HTTP
//! classdraft_store::serve(store, "127.0.0.1:3030").await?;
//! ```

mod routes;
mod store;

pub use routes::{router, serve, ApiError, CreateDocument, RestoreBody};
pub use store::{HistoryStrategy, MemoryStore};
