pub mod activity_repository;
pub mod queue_repository;
pub mod sponsorship_repository;
pub mod users_repository;

pub use activity_repository::ActivityRepository;
pub use queue_repository::{QueueItem, QueueRepository, QueueStatus};
pub use sponsorship_repository::{EdgeDirection, SponsorshipRepository};
pub use users_repository::{UserIdentity, UsersRepository};

/// Collection of all repositories
pub struct Repositories {
    /// Repository for queue operations
    pub queue: QueueRepository,
    /// Repository for user operations
    pub users: UsersRepository,
    /// Repository for sponsorship edge operations
    pub sponsorships: SponsorshipRepository,
    /// Repository for activity snapshot operations
    pub activity: ActivityRepository,
}

impl Repositories {
    /// Create a new Repositories instance
    pub fn new(
        queue: QueueRepository,
        users: UsersRepository,
        sponsorships: SponsorshipRepository,
        activity: ActivityRepository,
    ) -> Self {
        Self {
            queue,
            users,
            sponsorships,
            activity,
        }
    }
}
