pub mod check;
pub mod complete;
pub mod definition;
pub mod folding;
pub mod symbols;
