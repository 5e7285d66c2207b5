//! Search and evaluation for kingbob.

pub mod book;
pub mod eval;
pub mod search;
pub mod time;

pub use book::OpeningBook;
pub use eval::evaluate;
pub use search::control::SearchManager;
pub use search::{SearchLimits, SearchResult, Searcher};
pub use time::{GoLimits, manager_from_go, search_budget};
