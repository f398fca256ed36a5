/// Router Module Index
///
/// Routes are split by access level so the auth layer is applied to a whole
/// module at once rather than per handler.

/// Routes accessible without an identity.
pub mod public;

/// Routes behind the `AuthUser` route layer.
pub mod authenticated;
