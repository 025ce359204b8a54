//! Local filesystem provider / 本地存储提供者

mod driver;

pub use driver::LocalProvider;
