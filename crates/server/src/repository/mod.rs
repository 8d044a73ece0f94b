pub mod assignment_repository;
pub mod ownership;

pub use assignment_repository::SeaOrmGradingStore;
pub use ownership::SeaOrmOwnershipCheck;
