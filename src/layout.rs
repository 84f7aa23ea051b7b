pub(crate) mod placement;
pub(crate) mod template;
