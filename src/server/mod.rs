mod router;
mod state;

pub use router::build_review_router;
pub use state::ServeState;
