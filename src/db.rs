pub mod audit_repo;
pub mod membership_repo;
pub mod restaurant_repo;
pub mod role_repo;
pub mod settings_repo;
pub mod subscription_repo;
pub mod transaction_repo;
pub mod user_repo;

pub use audit_repo::AuditRepository;
pub use membership_repo::MembershipRepository;
pub use restaurant_repo::RestaurantRepository;
pub use role_repo::RoleRepository;
pub use settings_repo::SettingsRepository;
pub use subscription_repo::SubscriptionRepository;
pub use transaction_repo::TransactionRepository;
pub use user_repo::UserRepository;
