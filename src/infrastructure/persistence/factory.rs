use sea_orm::DatabaseConnection;

use crate::infrastructure::persistence::connection::DbPool;
use crate::infrastructure::persistence::repositories::{
    ActivityRepository, QueueRepository, Repositories, SponsorshipRepository, UsersRepository,
};

/// Factory for creating repositories
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create all repositories
    pub fn create_repositories(db_pool: &DbPool) -> Repositories {
        let conn = db_pool.get_connection().clone();

        Repositories::new(
            Self::create_queue_repository(conn.clone()),
            Self::create_users_repository(conn.clone()),
            Self::create_sponsorship_repository(conn.clone()),
            Self::create_activity_repository(conn),
        )
    }

    /// Create a queue repository
    pub fn create_queue_repository(conn: DatabaseConnection) -> QueueRepository {
        QueueRepository::new(conn)
    }

    /// Create a users repository
    pub fn create_users_repository(conn: DatabaseConnection) -> UsersRepository {
        UsersRepository::new(conn)
    }

    /// Create a sponsorship repository
    pub fn create_sponsorship_repository(conn: DatabaseConnection) -> SponsorshipRepository {
        SponsorshipRepository::new(conn)
    }

    /// Create an activity repository
    pub fn create_activity_repository(conn: DatabaseConnection) -> ActivityRepository {
        ActivityRepository::new(conn)
    }
}
