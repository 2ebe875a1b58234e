pub mod ai;
pub mod config;
pub mod controller;
pub mod error;
pub mod extractor;
pub mod html;
pub mod links;
pub mod session;
pub mod state;
pub mod storage;

// Re-export main types for convenience
pub use ai::{Completer, InferenceClient};
pub use config::Config;
pub use controller::{
    ChatController, Display, DisplayEntry, EntryBody, ExtractOutcome, QuickAction, SubmitOutcome,
};
pub use error::ChatError;
pub use extractor::{
    ActivePageExtractor, ExtractionRequest, ExtractionResult, PageContent, PageExtractor, PageSource,
};
pub use session::SessionStore;
pub use state::{ChatRole, ChatTurn, Transcript};
pub use storage::{FileStorage, MemoryStorage, Storage};
