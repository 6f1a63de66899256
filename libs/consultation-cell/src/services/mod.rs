pub mod consultation;
pub mod documents;
pub mod prescription;

pub use consultation::ConsultationService;
pub use documents::DocumentService;
pub use prescription::PrescriptionService;
