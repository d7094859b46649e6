pub mod direct;
pub mod replicate;
