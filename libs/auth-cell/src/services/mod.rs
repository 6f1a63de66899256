pub mod login;
pub mod password;
pub mod throttle;

pub use login::AuthService;
pub use throttle::LoginThrottle;
