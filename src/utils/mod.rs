pub mod id_generator;
pub mod url_validator;

pub use id_generator::{IdGenerator, always_true, generate_token, unambiguous};
pub use url_validator::{UrlValidationError, validate_alias, validate_target_url};
