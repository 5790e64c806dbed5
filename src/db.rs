pub mod user_repo;
pub use user_repo::UserRepository;
pub mod account_repo;
pub use account_repo::AccountRepository;
pub mod crops_repo;
pub use crops_repo::CropRepository;
pub mod tasks_repo;
pub use tasks_repo::TaskRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod employees_repo;
pub use employees_repo::EmployeeRepository;
pub mod pg_backend;
pub use pg_backend::PgDataBackend;
