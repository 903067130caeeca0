//! Recipe model and parsing

pub mod model;
pub mod parser;

pub use parser::{expand_variables, parse_recipe, parse_recipe_from_str, validate_recipe};
