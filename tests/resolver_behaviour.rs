//! Behavioural scenarios for resource name resolution.

mod resolver;
