pub mod noren;

pub use noren::{NorenClient, OrderParams, ScripMatch, TimePriceRow};
