//! `compute routers update`: BGP advertisement changes.
//!
//! The command fetches the router, applies an [`AdvertisementChange`] to its
//! current [`Advertisements`] and submits a [`RouterPatch`]. Lists that end up
//! empty are named in the patch's cleared fields so the API removes them
//! instead of ignoring the omission.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::api::{ApiRequest, RemoteError};
use crate::executor::{Command, CommandError, Context};
use crate::options::{
    ArgList, ArgumentError, Case, ChoiceSet, CommandSchema, DictScalar, DictSpec, OptionKind,
    OptionSpec, ParsedOptions,
};
use crate::resource::{Collection, ResourceArg, ResourceReference};
use crate::validate::{RuleContext, ValidationRule, require_member};

use super::{single_name, target_names};

/// Advertisement modes.
pub const ADVERTISE_MODES: ChoiceSet =
    ChoiceSet::new(&["DEFAULT", "CUSTOM"]).normalized(Case::Upper);
/// Groups a router may advertise.
pub const ADVERTISED_GROUPS: ChoiceSet = ChoiceSet::new(&["ALL_SUBNETS"]);

const REPLACE_FLAGS: [&str; 3] = [
    "advertisement-mode",
    "set-advertisement-groups",
    "set-advertisement-ranges",
];
const INCREMENTAL_FLAGS: [&str; 4] = [
    "add-advertisement-groups",
    "remove-advertisement-groups",
    "add-advertisement-ranges",
    "remove-advertisement-ranges",
];
const GROUP_FLAGS: [&str; 3] = [
    "set-advertisement-groups",
    "add-advertisement-groups",
    "remove-advertisement-groups",
];

const CUSTOM_WITH_DEFAULT: &str =
    "Cannot specify custom advertisements for a router with default mode.";
const SWITCH_TO_DEFAULT_WARNING: &str = "WARNING: switching from custom advertisement mode to \
     default will clear out any existing advertised groups/ranges from this router.";

/// Field path of advertised groups in a router patch.
pub const GROUPS_FIELD: &str = "bgp.advertisedGroups";
/// Field path of advertised IP ranges in a router patch.
pub const RANGES_FIELD: &str = "bgp.advertisedIpRanges";

/// How a router chooses what to advertise.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdvertiseMode {
    /// Advertise every subnet of the network.
    #[default]
    Default,
    /// Advertise the configured groups and ranges.
    Custom,
}

impl AdvertiseMode {
    fn parse(text: &str) -> Self {
        if text.eq_ignore_ascii_case("CUSTOM") {
            Self::Custom
        } else {
            Self::Default
        }
    }
}

/// One advertised CIDR range.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub struct AdvertisedRange {
    /// CIDR block.
    pub range: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// BGP advertisement settings of a router.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Advertisements {
    /// Advertisement mode.
    #[serde(default)]
    pub advertise_mode: AdvertiseMode,
    /// Advertised groups.
    #[serde(default)]
    pub advertised_groups: Vec<String>,
    /// Advertised ranges.
    #[serde(default)]
    pub advertised_ip_ranges: Vec<AdvertisedRange>,
}

impl Advertisements {
    /// Reads the `bgp` block of a router resource. A router without one uses
    /// default advertisement.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Decode`] when the block has an unexpected shape.
    pub fn from_router(router: &Value, resource: &str) -> Result<Self, RemoteError> {
        router
            .get("bgp")
            .cloned()
            .map_or_else(|| Ok(Self::default()), serde_json::from_value)
            .map_err(|err| RemoteError::Decode {
                resource: resource.to_owned(),
                message: err.to_string(),
            })
    }
}

/// Requested change to a router's advertisements.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AdvertisementChange {
    /// New mode, when `--advertisement-mode` was given.
    pub mode: Option<AdvertiseMode>,
    /// Replacement groups.
    pub set_groups: Option<Vec<String>>,
    /// Replacement ranges.
    pub set_ranges: Option<Vec<AdvertisedRange>>,
    /// Groups to append.
    pub add_groups: Vec<String>,
    /// Groups to drop.
    pub remove_groups: Vec<String>,
    /// Ranges to append.
    pub add_ranges: Vec<AdvertisedRange>,
    /// CIDR blocks to drop.
    pub remove_ranges: Vec<String>,
    incremental_flag: Option<&'static str>,
}

fn groups(options: &ParsedOptions, option: &str) -> Option<Vec<String>> {
    options
        .list(option)
        .map(|items| items.iter().map(|group| group.to_ascii_uppercase()).collect())
}

fn ranges(options: &ParsedOptions, option: &str) -> Option<Vec<AdvertisedRange>> {
    options.dicts(option).first().map(|dict| {
        dict.iter()
            .map(|(range, scalar)| AdvertisedRange {
                range: range.to_owned(),
                description: match scalar {
                    DictScalar::Text(text) => text.clone(),
                    _ => String::new(),
                },
            })
            .collect()
    })
}

impl AdvertisementChange {
    /// Collects the change described by validated options.
    #[must_use]
    pub fn from_options(options: &ParsedOptions) -> Self {
        Self {
            mode: options.text("advertisement-mode").map(AdvertiseMode::parse),
            set_groups: groups(options, "set-advertisement-groups"),
            set_ranges: ranges(options, "set-advertisement-ranges"),
            add_groups: groups(options, "add-advertisement-groups").unwrap_or_default(),
            remove_groups: groups(options, "remove-advertisement-groups").unwrap_or_default(),
            add_ranges: ranges(options, "add-advertisement-ranges").unwrap_or_default(),
            remove_ranges: options
                .list("remove-advertisement-ranges")
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
            incremental_flag: options.first_set(&INCREMENTAL_FLAGS),
        }
    }

    /// Returns `true` when the change moves a custom router to default mode.
    #[must_use]
    pub fn switches_to_default(&self, current: &Advertisements) -> bool {
        current.advertise_mode == AdvertiseMode::Custom
            && self.mode == Some(AdvertiseMode::Default)
    }

    /// Applies the change to `current`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::Invalid`] when incremental changes target a
    /// router outside custom mode, or a removal names an entry that is not
    /// advertised.
    pub fn apply(&self, current: &Advertisements) -> Result<Advertisements, ArgumentError> {
        let mut next = current.clone();
        if let Some(mode) = self.mode {
            next.advertise_mode = mode;
            if mode == AdvertiseMode::Default {
                next.advertised_groups.clear();
                next.advertised_ip_ranges.clear();
            }
        }
        if let Some(replacement) = &self.set_groups {
            next.advertised_groups.clone_from(replacement);
        }
        if let Some(replacement) = &self.set_ranges {
            next.advertised_ip_ranges.clone_from(replacement);
        }
        let Some(flag) = self.incremental_flag else {
            return Ok(next);
        };
        if next.advertise_mode != AdvertiseMode::Custom {
            return Err(ArgumentError::invalid(flag, CUSTOM_WITH_DEFAULT));
        }
        next.advertised_groups.extend(self.add_groups.iter().cloned());
        for group in &self.remove_groups {
            let position = next
                .advertised_groups
                .iter()
                .position(|existing| existing == group)
                .ok_or_else(|| {
                    ArgumentError::invalid(
                        "remove-advertisement-groups",
                        format!("Advertised group [{group}] not found on this router."),
                    )
                })?;
            next.advertised_groups.remove(position);
        }
        next.advertised_ip_ranges.extend(self.add_ranges.iter().cloned());
        for range in &self.remove_ranges {
            let position = next
                .advertised_ip_ranges
                .iter()
                .position(|existing| &existing.range == range)
                .ok_or_else(|| {
                    ArgumentError::invalid(
                        "remove-advertisement-ranges",
                        format!("Advertised IP range [{range}] not found on this router."),
                    )
                })?;
            next.advertised_ip_ranges.remove(position);
        }
        Ok(next)
    }
}

/// Declarative patch: the new advertisements plus the fields to clear.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouterPatch {
    /// Advertisements after the change.
    pub advertisements: Advertisements,
    /// Field paths whose lists became empty.
    pub cleared_fields: Vec<&'static str>,
}

impl RouterPatch {
    /// Derives cleared fields from `advertisements`.
    #[must_use]
    pub fn new(advertisements: Advertisements) -> Self {
        let mut cleared_fields = Vec::new();
        if advertisements.advertised_groups.is_empty() {
            cleared_fields.push(GROUPS_FIELD);
        }
        if advertisements.advertised_ip_ranges.is_empty() {
            cleared_fields.push(RANGES_FIELD);
        }
        Self {
            advertisements,
            cleared_fields,
        }
    }

    /// Request parameters: `router` is the fetched resource with its `bgp`
    /// block updated, `clearedFields` lists emptied fields.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Encode`] if the advertisements fail to encode.
    pub fn params(&self, router: &Value) -> Result<Value, CommandError> {
        let mut replacement = router.clone();
        if let (Some(resource), Value::Object(fields)) = (
            replacement.as_object_mut(),
            serde_json::to_value(&self.advertisements)?,
        ) {
            let block = resource
                .entry("bgp")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Some(bgp) = block.as_object_mut() {
                bgp.extend(fields);
            }
        }
        Ok(json!({
            "router": replacement,
            "clearedFields": self.cleared_fields,
        }))
    }
}

fn replace_or_incremental(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    match (
        options.first_set(&REPLACE_FLAGS),
        options.first_set(&INCREMENTAL_FLAGS),
    ) {
        (Some(replace), Some(incremental)) => {
            Err(ArgumentError::conflicting([replace, incremental]))
        }
        _ => Ok(()),
    }
}

fn custom_with_default(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    let default_mode = options.text("advertisement-mode") == Some("DEFAULT");
    let custom_given = options
        .list("set-advertisement-groups")
        .is_some_and(|items| !items.is_empty())
        || options
            .dicts("set-advertisement-ranges")
            .iter()
            .any(|dict| dict.iter().next().is_some());
    if default_mode && custom_given {
        return Err(ArgumentError::invalid("advertisement-mode", CUSTOM_WITH_DEFAULT));
    }
    Ok(())
}

fn known_groups(options: &ParsedOptions, _: &RuleContext) -> Result<(), ArgumentError> {
    for flag in GROUP_FLAGS {
        for group in options.list(flag).unwrap_or_default() {
            require_member(flag, None, &group.to_ascii_uppercase(), &ADVERTISED_GROUPS)?;
        }
    }
    Ok(())
}

/// `compute routers update`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Update;

impl Command for Update {
    fn schema(&self) -> CommandSchema {
        let open = OptionKind::Dict(DictSpec::open());
        CommandSchema::new()
            .option(single_name())
            .option(OptionSpec::text("region"))
            .option(OptionSpec::new(
                "advertisement-mode",
                OptionKind::Choice(ADVERTISE_MODES),
            ))
            .option(OptionSpec::new(
                "set-advertisement-groups",
                OptionKind::List(ArgList::new()),
            ))
            .option(OptionSpec::new("set-advertisement-ranges", open))
            .option(OptionSpec::new(
                "add-advertisement-groups",
                OptionKind::List(ArgList::new().min_length(1)),
            ))
            .option(OptionSpec::new(
                "remove-advertisement-groups",
                OptionKind::List(ArgList::new().min_length(1)),
            ))
            .option(OptionSpec::new("add-advertisement-ranges", open))
            .option(OptionSpec::new(
                "remove-advertisement-ranges",
                OptionKind::List(ArgList::new().min_length(1)),
            ))
    }

    fn rules(&self) -> Vec<ValidationRule> {
        vec![
            ValidationRule::new("replace-or-incremental", replace_or_incremental),
            ValidationRule::new("custom-with-default", custom_with_default),
            ValidationRule::new("advertised-groups", known_groups),
        ]
    }

    fn targets(&self, options: &ParsedOptions) -> Vec<ResourceArg> {
        target_names(options)
            .into_iter()
            .map(|name| {
                ResourceArg::new(Collection::ROUTERS, name).with_scope(options.text("region"))
            })
            .collect()
    }

    fn execute<'a>(
        &'a self,
        context: &'a Context<'a>,
        options: &'a ParsedOptions,
        targets: Vec<ResourceReference>,
    ) -> impl Future<Output = Result<Value, CommandError>> + 'a {
        async move {
            let Some(router) = targets.first() else {
                return Ok(Value::Null);
            };
            let path = router.to_path();
            let existing = context.api.call(ApiRequest::get(router)).await?;
            let current = Advertisements::from_router(&existing, &path)?;
            let change = AdvertisementChange::from_options(options);
            if change.switches_to_default(&current)
                && !context.console.confirm(SWITCH_TO_DEFAULT_WARNING, true)?
            {
                return Err(CommandError::Aborted(String::from("Aborted by user.")));
            }
            let patch = RouterPatch::new(change.apply(&current)?);
            debug!(router = %path, cleared = ?patch.cleared_fields, "patching router");
            let params = patch.params(&existing)?;
            let responses = context
                .call_all("Could not fetch resource:", vec![ApiRequest::patch(router, params)])
                .await?;
            Ok(responses.into_iter().next().unwrap_or(Value::Null))
        }
    }
}
