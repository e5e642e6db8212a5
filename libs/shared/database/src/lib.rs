pub mod supabase;

pub use supabase::{api_error, SupabaseApiError, SupabaseClient};
