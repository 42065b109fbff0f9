use async_graphql::InputObject;
use infra::pagination::LimitOffset;

#[derive(InputObject, Clone, Copy, Debug, Default)]
pub struct PaginationInput {
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl PaginationInput {
    pub fn to_limit_offset(self) -> LimitOffset {
        LimitOffset::new(self.limit.map(i64::from), self.offset.map(i64::from))
    }
}
