pub(crate) mod adapter;
pub(crate) mod stage;
