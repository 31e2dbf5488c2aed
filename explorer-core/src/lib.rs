//! Explorer Core
//!
//! This crate is the state-synchronization core of an interactive
//! graph-database explorer. It keeps three things consistent while the user
//! pans, drags, filters and expands the graph:
//!
//! - the canonical node/relation model (`entities`)
//! - the attributes handed to an external renderer (`render`)
//! - a replayable, multi-step exploration session (`parallax`)
//!
//! The crate never paints anything and never talks HTTP itself. Rendering
//! and transport are collaborators: the renderer reads scene attributes and
//! feeds raw input back, the backend implements [`backend::GraphBackend`].
//!
//! # Architecture
//!
//! - `reactive`: stores with selector subscriptions, update batches, debounce
//! - `model`: serde data types shared by every component
//! - `entities`: the canonical entity store and its backend service
//! - `dispatcher`: raw input to semantic events, with the interaction state machine
//! - `render`: scene, camera, highlights, zoom/scale, label fitting, dragging
//! - `parallax`: the exploration engine
//! - `reconcile`: search results into the entity store
//! - `perspectives`: saved layouts
//! - `session`: everything wired together
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use explorer_core::backend::MemoryBackend;
//! use explorer_core::model::{Node, SearchResult, SearchResultKind};
//! use explorer_core::{ExplorerConfig, ExplorerSession};
//!
//! # async fn run() {
//! let backend = MemoryBackend::new().with_nodes([Node::new("n1")]);
//! let session = ExplorerSession::new(ExplorerConfig::default(), Arc::new(backend));
//! session.mount();
//!
//! session.publish_result(SearchResult::from_entities(
//!     SearchResultKind::FullText,
//!     vec![Node::new("n1")],
//!     Vec::new(),
//! ));
//! session.settle().await;
//! assert!(session.entities().contains_node(&"n1".into()));
//!
//! session.unmount();
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod entities;
pub mod error;
pub mod model;
pub mod notify;
pub mod parallax;
pub mod perspectives;
pub mod reactive;
pub mod reconcile;
pub mod render;
pub mod session;

pub use config::ExplorerConfig;
pub use error::{Error, Result};
pub use session::ExplorerSession;
