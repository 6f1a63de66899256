pub mod category;
pub mod ledger;
pub mod product;

pub use category::CategoryService;
pub use ledger::StockLedger;
pub use product::ProductService;
