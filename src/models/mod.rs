//! Domain models.

mod book;

pub use book::{BookChanges, BookFilter, BookPage, BookPatch, BookRecord, NewBook, PatchError};
