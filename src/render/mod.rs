pub(crate) mod aov;
pub(crate) mod backend;
pub(crate) mod index;
pub(crate) mod reference;
pub(crate) mod registry;
