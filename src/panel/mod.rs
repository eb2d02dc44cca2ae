//! Display surfaces over the knowledge store
//!
//! Surfaces never share state directly. A surface that mutates the store
//! tells the others through their `RefreshHandle`s; each panel otherwise
//! keeps its own independent view.

pub mod confirm;
pub mod ingest_surface;
pub mod knowledge_panel;
pub mod source;

pub use confirm::{
    AlwaysConfirm, ChannelConfirmation, ConfirmPrompt, ConfirmRequest, Confirmation, NeverConfirm,
};
pub use ingest_surface::{IngestStatus, IngestSurface};
pub use knowledge_panel::{KnowledgePanel, PanelHandle, PanelStatus, PanelView, RefreshHandle};
pub use source::{IngestClient, KnowledgeSource, LocalKnowledgeSource, SourceError};
