pub mod farms;
pub mod invest;
pub mod quote;
pub mod serve;
