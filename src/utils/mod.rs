pub mod collate;
pub mod test_helpers;

pub use collate::CollateKey;
