pub mod section;
pub mod vendor;
