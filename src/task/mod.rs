pub(crate) mod controller;
pub(crate) mod fingerprint;
pub(crate) mod pass;
