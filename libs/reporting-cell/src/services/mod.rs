pub mod dashboard;
pub mod revenue;
pub mod statistics;

pub use dashboard::DashboardService;
pub use revenue::RevenueService;
pub use statistics::StatisticsService;
