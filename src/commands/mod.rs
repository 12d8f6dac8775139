//! Commands built on the option, validation and resolution framework.
//!
//! Every command implements [`crate::executor::Command`]: a schema, an ordered
//! rule list, the resources it targets, and an `execute` step that receives
//! fully resolved references.

pub mod dataproc;
pub mod firebase;
pub mod instances;
pub mod routers;

use crate::options::{OptionSpec, ParsedOptions};

/// Name of the positional target option.
pub const NAME: &str = "NAME";

/// Positional target names, at least one.
#[must_use]
pub const fn names() -> OptionSpec {
    OptionSpec::text(NAME).repeated().required()
}

/// Positional target name, exactly one.
#[must_use]
pub const fn single_name() -> OptionSpec {
    OptionSpec::text(NAME).required()
}

/// Returns the positional target names in input order.
#[must_use]
pub fn target_names(options: &ParsedOptions) -> Vec<&str> {
    options.texts(NAME)
}
