pub mod cabinet;
pub mod catalog;
pub mod medicament;

pub use cabinet::CabinetService;
pub use catalog::ServiceCatalog;
pub use medicament::MedicamentService;
