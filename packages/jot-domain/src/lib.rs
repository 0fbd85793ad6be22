pub mod id;
pub mod note;
pub mod notebook;
pub mod search;

mod error;

pub use error::{Error, Result};
pub use id::ItemId;
pub use note::{MarkupLanguage, Note, NoteDraft, NoteSummary, parse_tags};
pub use notebook::{Notebook, NotebookDraft};
pub use search::{SearchResult, SearchResultItem};
