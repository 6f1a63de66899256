pub mod audit;
pub mod query;
pub mod supabase;
pub mod tables;

pub use query::Query;
pub use supabase::{is_conflict, PostgrestError, SupabaseClient};
pub use tables::Table;
