//! SQLite persistence behind the domain repository ports.

pub mod automation_repo;
pub mod connection;
pub mod device_repo;
pub mod entity_repo;
pub mod event_repo;
pub mod integration_config_repo;
pub mod utils;

pub use automation_repo::AutomationRepositoryImpl;
pub use connection::DatabaseConnection;
pub use device_repo::DeviceRepositoryImpl;
pub use entity_repo::EntityRepositoryImpl;
pub use event_repo::EventRepositoryImpl;
pub use integration_config_repo::IntegrationConfigRepositoryImpl;
