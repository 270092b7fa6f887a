pub mod user_repo;
pub use user_repo::UserRepository;
pub mod member_repo;
pub use member_repo::{MemberRepository, PgMemberRepository};
pub mod small_group_repo;
pub use small_group_repo::{PgSmallGroupRepository, SmallGroupRepository};
