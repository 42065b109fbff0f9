pub mod games;
pub mod tournaments;
