/// A PostgREST-exposed table and whether writes to it carry
/// `created_at` / `updated_at` audit columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub audited: bool,
}

pub const PATIENTS: Table = Table { name: "patients", audited: true };
pub const SERVICES: Table = Table { name: "services", audited: true };
pub const RENDEZVOUS: Table = Table { name: "rendezvous", audited: true };
pub const CONSULTATIONS: Table = Table { name: "consultations", audited: true };
pub const STOCK: Table = Table { name: "stock", audited: true };

pub const EMPLOYERS: Table = Table { name: "employers", audited: false };
pub const MEDICAMENTS: Table = Table { name: "medicaments", audited: false };
pub const ORDONNANCES: Table = Table { name: "ordonnances", audited: false };
pub const ORDONNANCE_MEDICAMENTS: Table = Table { name: "ordonnance_medicaments", audited: false };
pub const STOCK_CATEGORIES: Table = Table { name: "category_stock", audited: false };
pub const STOCK_MOVEMENTS: Table = Table { name: "stock_movements", audited: false };
pub const CABINET_INFO: Table = Table { name: "cabinet_info", audited: false };
