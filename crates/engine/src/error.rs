use thiserror::Error;

/// Errors returned for invalid view-state input.
///
/// Query and persistence failures never surface here; they are handled
/// inside the adapter and store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("{0} is not an allowed page size; choose one of {options:?}", options = agtable_types::ITEMS_PER_PAGE_OPTIONS)]
    InvalidItemsPerPage(usize),

    #[error("page numbers start at 1; got {0}")]
    InvalidPage(usize),

    #[error("table {table_id} has been destroyed")]
    Destroyed { table_id: String },
}
