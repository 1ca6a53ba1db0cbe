use std::sync::Arc;

use crate::review::ReviewService;

#[derive(Clone)]
pub struct ServeState {
    pub(crate) review: Arc<ReviewService>,
}

impl ServeState {
    pub fn new(review: ReviewService) -> Self {
        Self {
            review: Arc::new(review),
        }
    }

    pub fn review(&self) -> &ReviewService {
        self.review.as_ref()
    }
}
