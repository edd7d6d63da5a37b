pub mod analysis;

#[cfg(feature = "analysis")]
pub mod chat;
