//! sealwall-storage: append-only ledger of encrypted records over OpenDAL

pub mod ledger;
pub mod operator;

pub use ledger::{Ledger, RecordId};
pub use operator::{build_operator, memory_operator};
