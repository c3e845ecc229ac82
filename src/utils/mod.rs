pub mod duration;
pub mod fingerprint;
pub mod geo;
pub mod jwt;
pub mod sanitize;
pub mod text;

pub use duration::humanize_response_time;
pub use fingerprint::derive_fingerprint;
pub use geo::{haversine_meters, GeoPoint};
pub use jwt::{encode_admin_token, encode_token};
pub use sanitize::{optional_text, strip_markup};
