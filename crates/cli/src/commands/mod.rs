pub(crate) mod check_store;
pub(crate) mod closure;
pub(crate) mod reconcile;
