/// Middleware modules for the API server
///
/// - `session`: bearer-session authentication and tenant resolution

pub mod session;
