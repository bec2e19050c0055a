pub mod error;
pub mod params;
pub mod provider;

pub use error::{Error, Result};
pub use params::{merge_params, params_from_json, ParamValue, Params};
pub use provider::ProviderType;
