pub mod queue;
pub mod sponsorship;
pub mod users;
