pub mod history;
pub mod quote;
pub mod shipment;
pub mod user;
