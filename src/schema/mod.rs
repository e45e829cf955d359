pub(crate) mod validate;

pub use validate::validate_timeline;
