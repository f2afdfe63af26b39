pub(crate) mod classify;
pub(crate) mod expected;
pub(crate) mod helpers;
pub(crate) mod replay;
pub(crate) mod synthesize;
