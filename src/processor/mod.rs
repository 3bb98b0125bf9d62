pub mod column_renamer;
pub mod record_flattener;
pub mod row_cleaner;

pub use column_renamer::*;
pub use record_flattener::*;
pub use row_cleaner::*;
