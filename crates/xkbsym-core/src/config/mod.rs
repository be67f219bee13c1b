// Xkbsym Config API
// Layout bundles and the textual expression forms they use

pub mod bundle;
pub mod expr_parser;

pub use bundle::{Bundle, BundleError, BundleToml};
pub use expr_parser::{parse_action, parse_expr, parse_lhs, ExprParseError};
