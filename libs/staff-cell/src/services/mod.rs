pub mod employer;

pub use employer::EmployerService;
