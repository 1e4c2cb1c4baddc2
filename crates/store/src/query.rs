use crate::UserId;

/// Builder for order listings.
///
/// Results are always ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Filter by the user who placed the order.
    pub user_id: Option<UserId>,

    /// Filter by status name (e.g. "pending").
    pub status: Option<String>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates a new empty query matching every order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for the orders of a specific user.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    /// Filters by status name.
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builder() {
        let user_id = UserId::new();
        let query = OrderQuery::for_user(user_id)
            .status("pending")
            .limit(10)
            .offset(20);

        assert_eq!(query.user_id, Some(user_id));
        assert_eq!(query.status.as_deref(), Some("pending"));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(20));
    }

    #[test]
    fn empty_query_matches_everything() {
        let query = OrderQuery::new();
        assert!(query.user_id.is_none());
        assert!(query.status.is_none());
        assert!(query.limit.is_none());
    }
}
